use async_graphql_parser::types as parser;
use graphql_transformer_core::document::ast;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PredictionsAction {
    IdentifyText,
    IdentifyLabels,
    ConvertTextToSpeech,
    TranslateText,
}

impl PredictionsAction {
    /// Actions that may consume the result of this one.
    fn followers(self) -> &'static [PredictionsAction] {
        use PredictionsAction::*;

        match self {
            IdentifyText | IdentifyLabels => &[TranslateText, ConvertTextToSpeech],
            TranslateText => &[ConvertTextToSpeech],
            ConvertTextToSpeech => &[],
        }
    }

    /// What a field ending with this action returns.
    pub fn return_type(self) -> parser::Type {
        match self {
            PredictionsAction::IdentifyLabels => ast::list_of(ast::named_type("String")),
            _ => ast::named_type("String"),
        }
    }

    /// Members of the action's input. `text` is optional when a previous action provides it.
    pub fn input_fields(self, chained: bool) -> Vec<(&'static str, parser::Type)> {
        let string = || ast::named_type("String");
        let required = || ast::non_null(ast::named_type("String"));
        let text = if chained { string() } else { required() };

        match self {
            PredictionsAction::IdentifyText | PredictionsAction::IdentifyLabels => vec![("key", required())],
            PredictionsAction::TranslateText => vec![
                ("sourceLanguage", required()),
                ("targetLanguage", required()),
                ("text", text),
            ],
            PredictionsAction::ConvertTextToSpeech => vec![("voiceID", required()), ("text", text)],
        }
    }
}

/// An action chain must not be empty, may not repeat an action, and every action must accept the
/// output of the one before it.
pub fn validate_chain(actions: &[PredictionsAction]) -> Result<(), String> {
    let Some(first) = actions.first() else {
        return Err("@predictions requires at least one action.".to_owned());
    };

    let mut previous = *first;
    for (index, action) in actions.iter().enumerate().skip(1) {
        if actions[..index].contains(action) {
            return Err(format!("{action} appears more than once in the @predictions actions."));
        }
        if !previous.followers().contains(action) {
            return Err(format!("{action} cannot follow {previous} in @predictions actions."));
        }
        previous = *action;
    }
    Ok(())
}
