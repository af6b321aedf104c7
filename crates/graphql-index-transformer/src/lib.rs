//! Key schemas for models: `@primaryKey` replaces the default `id` key, `@index` adds secondary
//! indexes with optional query fields.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod index;
mod primary_key;

use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer_core::{
    document::{ast, SchemaDocument},
    TransformerError,
};

pub use index::IndexTransformer;
pub use primary_key::PrimaryKeyTransformer;

/// Fields a key may be built from: scalars and enums, never lists.
fn is_valid_key_type(document: &SchemaDocument, ty: &parser::Type) -> bool {
    let type_name = ast::base_type_name(ty);
    !ast::is_list_type(ty) && (ast::is_scalar(type_name) || document.is_enum(type_name))
}

/// Checks shared by both directives: the parent is a model and every key field is usable.
fn validate_key_fields(
    document: &SchemaDocument,
    parent: &Positioned<parser::TypeDefinition>,
    field: &Positioned<parser::FieldDefinition>,
    directive: &Positioned<parser::ConstDirective>,
    sort_key_fields: &[String],
) -> Result<(), TransformerError> {
    let directive_name = directive.node.name.node.as_str();
    let type_name = parent.node.name.node.as_str();

    if !ast::has_directive(&parent.node.directives, "model") {
        return Err(TransformerError::invalid_directive_at(
            format!("The @{directive_name} directive may only be added to object definitions annotated with @model."),
            directive.pos,
        ));
    }

    if !is_valid_key_type(document, &field.node.ty.node) {
        return Err(TransformerError::invalid_directive_at(
            format!(
                "The key field '{}' on type '{type_name}' must be a scalar or enum, not a list.",
                field.node.name.node
            ),
            directive.pos,
        ));
    }

    for sort_key_field in sort_key_fields {
        if sort_key_field == field.node.name.node.as_str() {
            return Err(TransformerError::invalid_directive_at(
                format!("The sort key field '{sort_key_field}' of @{directive_name} on '{type_name}' repeats the partition key."),
                directive.pos,
            ));
        }

        let Some(sort_field) = ast::find_field(&parent.node, sort_key_field) else {
            return Err(TransformerError::invalid_directive_at(
                format!("Can't find field '{sort_key_field}' in {type_name}, but it was specified in the @{directive_name} sort key."),
                directive.pos,
            ));
        };

        if !is_valid_key_type(document, &sort_field.node.ty.node) {
            return Err(TransformerError::invalid_directive_at(
                format!("The sort key field '{sort_key_field}' on type '{type_name}' must be a scalar or enum, not a list."),
                directive.pos,
            ));
        }
    }

    Ok(())
}
