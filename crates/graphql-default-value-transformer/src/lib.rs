//! `@default(value)` fills in a field left out of a create mutation. `@sequence` marks a
//! Postgres column backed by a sequence, which the database fills in instead. Both are handled by
//! [`DefaultValueTransformer`].

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod coercion;
mod default_value;
mod sequence;

pub use coercion::validate_default_value;
pub use default_value::DefaultValueTransformer;

use graphql_model_transformer::names::ModelNames;
use graphql_transformer_core::{TransformerContext, TransformerError};

/// Let create mutations leave `field_name` out.
fn make_create_input_optional(
    ctx: &mut TransformerContext,
    model_name: &str,
    field_name: &str,
) -> Result<(), TransformerError> {
    let create_input = ModelNames::create_input(model_name);
    if let Some(input_field) = ctx.output_mut().input_field_mut(&create_input, field_name) {
        input_field.node.ty.node.nullable = true;
    }
    Ok(())
}
