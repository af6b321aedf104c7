//! Typed argument extraction for directive applications.
//!
//! Each directive declares its argument struct by implementing [`DirectiveArguments`]. The raw
//! arguments are converted to JSON, merged over the declared defaults and deserialized with serde.

mod definitions;
mod merge;

use async_graphql_parser::{types as ast, Positioned};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::TransformerError;

pub use definitions::{DirectiveDefinitions, DirectiveLocation};
pub use merge::merge_with_defaults;

pub trait DirectiveArguments: DeserializeOwned {
    /// Directive name without the leading `@`.
    const NAME: &'static str;

    /// Values used for arguments the application leaves out.
    fn defaults() -> Map<String, Value> {
        Map::new()
    }

    /// Cross-argument checks serde cannot express, such as mutually exclusive arguments.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Read the arguments of `directive` as `T`.
///
/// With `deep_merge`, a nested object argument only overrides the keys it spells out. Without it,
/// any provided argument replaces its default wholesale.
pub fn get_arguments<T: DirectiveArguments>(
    directive: &Positioned<ast::ConstDirective>,
    deep_merge: bool,
) -> Result<T, TransformerError> {
    get_arguments_with_defaults(directive, T::defaults(), deep_merge)
}

/// Like [`get_arguments`], for directives whose defaults depend on where they are applied, such as
/// operation names derived from the type name.
pub fn get_arguments_with_defaults<T: DirectiveArguments>(
    directive: &Positioned<ast::ConstDirective>,
    defaults: Map<String, Value>,
    deep_merge: bool,
) -> Result<T, TransformerError> {
    let provided = directive
        .node
        .arguments
        .iter()
        .map(|(name, value)| {
            value
                .node
                .clone()
                .into_json()
                .map(|value| (name.node.to_string(), value))
                .map_err(|err| {
                    TransformerError::invalid_directive_at(
                        format!("Invalid argument \"{}\" on @{}: {err}", name.node, T::NAME),
                        value.pos,
                    )
                })
        })
        .collect::<Result<Map<_, _>, _>>()?;

    let merged = merge_with_defaults(defaults, provided, deep_merge);

    let arguments: T = serde_json::from_value(Value::Object(merged)).map_err(|err| {
        TransformerError::invalid_directive_at(format!("Invalid arguments on @{}: {err}", T::NAME), directive.pos)
    })?;

    arguments
        .validate()
        .map_err(|message| TransformerError::invalid_directive_at(message, directive.pos))?;

    Ok(arguments)
}
