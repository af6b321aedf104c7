use graphql_predictions_transformer::PredictionsConfig;
use graphql_transformer_core::{
    context::TransformerContextOptions,
    parameters::{AppSyncAuthConfiguration, ResolverConfig, TransformParameters},
    strategy::{ModelDataSourceStrategy, SqlModelDataSourceStrategy},
};
use indexmap::IndexMap;
use serde::Deserialize;

/// Project configuration of a transform run. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformConfig {
    #[serde(alias = "transformParameters")]
    pub parameters: TransformParameters,
    #[serde(alias = "authConfiguration")]
    pub auth_config: AppSyncAuthConfiguration,
    pub resolver_config: ResolverConfig,
    /// Backing store per model name. Models left out use the default DynamoDB table.
    pub data_source_strategies: IndexMap<String, ModelDataSourceStrategy>,
    pub sql_directive_data_source_strategy: Option<SqlModelDataSourceStrategy>,
    pub predictions: Option<PredictionsConfig>,
    /// Logical id to stack name overrides.
    pub stack_mapping: IndexMap<String, String>,
}

impl TransformConfig {
    pub(crate) fn context_options(&self) -> TransformerContextOptions {
        TransformerContextOptions {
            parameters: self.parameters.clone(),
            auth_config: self.auth_config.clone(),
            resolver_config: self.resolver_config.clone(),
            data_source_strategies: self.data_source_strategies.clone(),
            sql_directive_strategy: self.sql_directive_data_source_strategy.clone(),
        }
    }
}
