use std::fmt;

use async_graphql_parser::Pos;

/// Where in the schema an error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLocation {
    Type { name: String },
    Field { type_name: String, field_name: String },
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaLocation::Type { name } => f.write_str(name),
            SchemaLocation::Field { type_name, field_name } => write!(f, "{type_name}.{field_name}"),
        }
    }
}

/// Every error a transform can fail with. Messages are stable and meant to be shown verbatim.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransformerError {
    /// Malformed or disallowed directive usage.
    #[error("{message}")]
    InvalidDirective { message: String, pos: Option<Pos> },
    /// The schema itself cannot be processed: syntax errors, unknown directives, missing types.
    #[error("{message}")]
    SchemaValidation { message: String, pos: Option<Pos> },
    /// The transform options contradict each other.
    #[error("{0}")]
    InvalidTransformerConfiguration(String),
    /// Two plugins tried to register the same artifact.
    #[error("{0}")]
    ResourceConflict(String),
    /// A directive that a SQL data source cannot back was used on a SQL model.
    #[error(
        "@{directive} directive on {location} is not supported on a SQL datasource. Following directives are not supported on a SQL datasource: {}",
        disallowed.iter().map(|name| format!("@{name}")).collect::<Vec<_>>().join(", ")
    )]
    UnsupportedDirectiveOnSql {
        directive: String,
        location: SchemaLocation,
        disallowed: Vec<&'static str>,
    },
    /// An `@auth` rule that cannot be turned into a role.
    #[error("{0}")]
    InvalidAuthRule(String),
}

impl TransformerError {
    pub fn invalid_directive(message: impl Into<String>) -> Self {
        TransformerError::InvalidDirective {
            message: message.into(),
            pos: None,
        }
    }

    pub fn invalid_directive_at(message: impl Into<String>, pos: Pos) -> Self {
        TransformerError::InvalidDirective {
            message: message.into(),
            pos: Some(pos),
        }
    }

    pub fn schema_validation(message: impl Into<String>) -> Self {
        TransformerError::SchemaValidation {
            message: message.into(),
            pos: None,
        }
    }

    pub fn schema_validation_at(message: impl Into<String>, pos: Pos) -> Self {
        TransformerError::SchemaValidation {
            message: message.into(),
            pos: Some(pos),
        }
    }

    pub fn resource_conflict(message: impl Into<String>) -> Self {
        TransformerError::ResourceConflict(message.into())
    }

    /// Position in the input schema, when the error can be traced back to one.
    pub fn pos(&self) -> Option<Pos> {
        match self {
            TransformerError::InvalidDirective { pos, .. } | TransformerError::SchemaValidation { pos, .. } => *pos,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_directive_message_lists_every_disallowed_directive() {
        let error = TransformerError::UnsupportedDirectiveOnSql {
            directive: "searchable".to_owned(),
            location: SchemaLocation::Type {
                name: "Post".to_owned(),
            },
            disallowed: vec!["searchable", "predictions"],
        };

        assert_eq!(
            error.to_string(),
            "@searchable directive on Post is not supported on a SQL datasource. Following directives are not supported on a SQL datasource: @searchable, @predictions"
        );
    }
}
