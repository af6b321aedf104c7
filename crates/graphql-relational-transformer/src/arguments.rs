use graphql_transformer_core::directive::DirectiveArguments;
use serde::Deserialize;

/// Arguments shared by `@hasOne`, `@hasMany` and `@belongsTo`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RelationArguments {
    /// Gen 1: fields of the annotated model holding the related key.
    pub fields: Option<Vec<String>>,
    /// Fields of the related model pointing back at this one, or for `@belongsTo` fields of
    /// this model pointing at the related one.
    pub references: Option<Vec<String>>,
    pub index_name: Option<String>,
}

impl RelationArguments {
    fn check(&self, directive_name: &str) -> Result<(), String> {
        match (&self.fields, &self.references) {
            (Some(_), Some(_)) => Err(format!(
                "'fields' and 'references' cannot be used together on @{directive_name}."
            )),
            (_, Some(references)) if references.is_empty() => {
                Err(format!("'references' of @{directive_name} must not be empty."))
            }
            (Some(fields), _) if fields.is_empty() => Err(format!("'fields' of @{directive_name} must not be empty.")),
            _ => Ok(()),
        }
    }
}

macro_rules! relation_arguments {
    ($name:ident, $directive:literal) => {
        #[derive(Debug, Deserialize)]
        #[serde(transparent)]
        pub(crate) struct $name(pub RelationArguments);

        impl DirectiveArguments for $name {
            const NAME: &'static str = $directive;

            fn validate(&self) -> Result<(), String> {
                self.0.check(Self::NAME)
            }
        }
    };
}

relation_arguments!(HasOneArguments, "hasOne");
relation_arguments!(HasManyArguments, "hasMany");
relation_arguments!(BelongsToArguments, "belongsTo");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ManyToManyArguments {
    pub relation_name: String,
}

impl DirectiveArguments for ManyToManyArguments {
    const NAME: &'static str = "manyToMany";

    fn validate(&self) -> Result<(), String> {
        if self.relation_name.is_empty() {
            return Err("relationName of @manyToMany must not be empty.".to_owned());
        }
        Ok(())
    }
}
