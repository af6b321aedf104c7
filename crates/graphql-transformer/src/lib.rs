//! Runs the Amplify directives over a schema.
//!
//! [`construct_transformer_chain`] lists every directive plugin in the order their hooks must run,
//! and [`execute_transform`] runs that chain over an SDL document with a [`TransformConfig`].

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod config;

use graphql_auth_transformer::AuthTransformer;
use graphql_default_value_transformer::DefaultValueTransformer;
use graphql_function_transformer::FunctionTransformer;
use graphql_http_transformer::HttpTransformer;
use graphql_index_transformer::{IndexTransformer, PrimaryKeyTransformer};
use graphql_maps_to_transformer::{MapsToTransformer, RefersToTransformer};
use graphql_model_transformer::ModelTransformer;
use graphql_predictions_transformer::{PredictionsConfig, PredictionsTransformer};
use graphql_relational_transformer::{ManyToManyTransformer, RelationTransformer};
use graphql_searchable_transformer::SearchableTransformer;
use graphql_sql_transformer::SqlTransformer;
use graphql_transformer_core::{GraphQLTransform, TransformOptions, TransformOutcome, TransformerPlugin};
use graphql_validate_transformer::ValidateTransformer;

pub use config::TransformConfig;

/// Plugins added to the default chain.
#[derive(Default)]
pub struct TransformerChainOptions {
    pub predictions: Option<PredictionsConfig>,
    /// Appended after the default plugins, in order.
    pub custom_transformers: Vec<Box<dyn TransformerPlugin>>,
}

/// The default plugins followed by the custom ones.
///
/// The model plugin comes first so every other plugin finds the generated types. Keys are
/// registered before the relational plugins compute foreign keys, and auth comes after
/// everything that adds resolvers it has to guard.
pub fn construct_transformer_chain(options: TransformerChainOptions) -> Vec<Box<dyn TransformerPlugin>> {
    let mut transformers: Vec<Box<dyn TransformerPlugin>> = vec![
        Box::new(ModelTransformer::new()),
        Box::new(FunctionTransformer::new()),
        Box::new(HttpTransformer::new()),
        Box::new(PredictionsTransformer::new(options.predictions)),
        Box::new(PrimaryKeyTransformer::new()),
        Box::new(IndexTransformer::new()),
        Box::new(RelationTransformer::has_many()),
        Box::new(RelationTransformer::has_one()),
        Box::new(ManyToManyTransformer::new()),
        Box::new(RelationTransformer::belongs_to()),
        Box::new(DefaultValueTransformer::new()),
        Box::new(AuthTransformer::new()),
        Box::new(MapsToTransformer::new()),
        Box::new(SqlTransformer::new()),
        Box::new(RefersToTransformer::new()),
        Box::new(ValidateTransformer::new()),
        Box::new(SearchableTransformer::new()),
    ];

    transformers.extend(options.custom_transformers);
    transformers
}

/// Transform `schema` with the default chain plus `custom_transformers`.
pub fn execute_transform(
    schema: &str,
    config: &TransformConfig,
    custom_transformers: Vec<Box<dyn TransformerPlugin>>,
) -> TransformOutcome {
    let transformers = construct_transformer_chain(TransformerChainOptions {
        predictions: config.predictions.clone(),
        custom_transformers,
    });
    tracing::debug!(transformers = transformers.len(), "constructed transformer chain");

    let transform = GraphQLTransform::new(TransformOptions {
        transformers,
        context: config.context_options(),
        stack_mapping: config.stack_mapping.clone(),
    });

    match transform {
        Ok(mut transform) => transform.transform(schema),
        Err(error) => TransformOutcome {
            result: Err(error),
            logs: Vec::new(),
        },
    }
}
