//! The state shared by every plugin during one transform.

mod data_sources;
mod keys;
mod metadata;
mod resolvers;
mod resource_names;
mod resources;

use std::sync::Arc;

use indexmap::IndexMap;

pub use data_sources::{DataSource, DataSourceKind, DataSourceManager};
pub use keys::{KeyDefinition, KeyRegistry, SecondaryIndex, DEFAULT_PRIMARY_KEY};
pub use metadata::{ForeignKeyField, MetadataStore, ModelResolverField, ModelResolverOperation};
pub use resolvers::{PipelineFunction, ResolverKind, ResolverManager, ResolverPipeline, Slot};
pub use resource_names::ResourceNames;
pub use resources::{Resource, ResourceContext};

use crate::{
    access_control::AccessControlMatrix,
    document::SchemaDocument,
    log::TransformerLogger,
    parameters::{AppSyncAuthConfiguration, ResolverConfig, SyncConfig, TransformParameters},
    strategy::{ModelDataSourceStrategy, SqlModelDataSourceStrategy},
    TransformerError,
};

static DEFAULT_STRATEGY: ModelDataSourceStrategy = ModelDataSourceStrategy::DefaultDynamoDb;

/// Inputs a transform run reads but never changes.
#[derive(Debug, Clone, Default)]
pub struct TransformerContextOptions {
    pub parameters: TransformParameters,
    pub auth_config: AppSyncAuthConfiguration,
    pub resolver_config: ResolverConfig,
    pub data_source_strategies: IndexMap<String, ModelDataSourceStrategy>,
    /// Strategy backing `@sql` fields on the root types.
    pub sql_directive_strategy: Option<SqlModelDataSourceStrategy>,
}

/// Handed to every plugin hook. Plugins must not keep anything borrowed from it past the hook.
#[derive(Debug)]
pub struct TransformerContext {
    input_document: Arc<SchemaDocument>,
    output: SchemaDocument,
    options: TransformerContextOptions,
    logger: TransformerLogger,
    resources: ResourceContext,
    resolvers: ResolverManager,
    data_sources: DataSourceManager,
    resource_names: ResourceNames,
    keys: KeyRegistry,
    metadata: MetadataStore,
    access_control: IndexMap<String, AccessControlMatrix>,
    functions: IndexMap<String, String>,
}

impl TransformerContext {
    pub fn new(document: SchemaDocument, options: TransformerContextOptions) -> Self {
        TransformerContext {
            output: document.clone(),
            input_document: Arc::new(document),
            options,
            logger: TransformerLogger::default(),
            resources: ResourceContext::default(),
            resolvers: ResolverManager::default(),
            data_sources: DataSourceManager::default(),
            resource_names: ResourceNames::default(),
            keys: KeyRegistry::default(),
            metadata: MetadataStore::default(),
            access_control: IndexMap::new(),
            functions: IndexMap::new(),
        }
    }

    /// Swap in the document after the pre-mutation phase rewrote it. The output starts over as a
    /// copy of it.
    pub(crate) fn reset_documents(&mut self, document: SchemaDocument) {
        self.output = document.clone();
        self.input_document = Arc::new(document);
    }

    pub(crate) fn into_parts(self) -> ContextParts {
        ContextParts {
            output: self.output,
            logger: self.logger,
            resources: self.resources,
            resolvers: self.resolvers,
            data_sources: self.data_sources,
            access_control: self.access_control,
            functions: self.functions,
        }
    }

    /// The schema as written by the user, after pre-mutation.
    pub fn input_document(&self) -> Arc<SchemaDocument> {
        Arc::clone(&self.input_document)
    }

    /// The schema being produced.
    pub fn output(&self) -> &SchemaDocument {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut SchemaDocument {
        &mut self.output
    }

    pub fn logger(&mut self) -> &mut TransformerLogger {
        &mut self.logger
    }

    pub fn parameters(&self) -> &TransformParameters {
        &self.options.parameters
    }

    pub fn auth_config(&self) -> &AppSyncAuthConfiguration {
        &self.options.auth_config
    }

    pub fn sync_config_for(&self, model_name: &str) -> Option<&SyncConfig> {
        self.options.resolver_config.sync_config_for(model_name)
    }

    /// The strategy of `model_name`, DynamoDB unless configured otherwise.
    pub fn strategy_for(&self, model_name: &str) -> &ModelDataSourceStrategy {
        self.options
            .data_source_strategies
            .get(model_name)
            .unwrap_or(&DEFAULT_STRATEGY)
    }

    pub fn is_sql_model(&self, model_name: &str) -> bool {
        self.strategy_for(model_name).is_sql()
    }

    pub fn sql_directive_strategy(&self) -> Option<&SqlModelDataSourceStrategy> {
        self.options.sql_directive_strategy.as_ref()
    }

    /// Every distinct SQL strategy in use, by name.
    pub fn sql_strategies(&self) -> IndexMap<&str, &SqlModelDataSourceStrategy> {
        self.options
            .data_source_strategies
            .values()
            .filter_map(ModelDataSourceStrategy::as_sql)
            .chain(self.options.sql_directive_strategy.as_ref())
            .map(|strategy| (strategy.name.as_str(), strategy))
            .collect()
    }

    pub fn resources(&self) -> &ResourceContext {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceContext {
        &mut self.resources
    }

    pub fn resolvers(&self) -> &ResolverManager {
        &self.resolvers
    }

    pub fn resolvers_mut(&mut self) -> &mut ResolverManager {
        &mut self.resolvers
    }

    pub fn data_sources(&self) -> &DataSourceManager {
        &self.data_sources
    }

    pub fn data_sources_mut(&mut self) -> &mut DataSourceManager {
        &mut self.data_sources
    }

    pub fn resource_names(&self) -> &ResourceNames {
        &self.resource_names
    }

    pub fn resource_names_mut(&mut self) -> &mut ResourceNames {
        &mut self.resource_names
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut KeyRegistry {
        &mut self.keys
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataStore {
        &mut self.metadata
    }

    pub fn access_control(&self, model_name: &str) -> Option<&AccessControlMatrix> {
        self.access_control.get(model_name)
    }

    pub fn set_access_control(&mut self, model_name: impl Into<String>, matrix: AccessControlMatrix) {
        self.access_control.insert(model_name.into(), matrix);
    }

    /// Register the code of a function bundled with the API, such as a VTL helper or Lambda source.
    pub fn add_function(&mut self, name: impl Into<String>, code: impl Into<String>) -> Result<(), TransformerError> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(TransformerError::resource_conflict(format!(
                "A function named {name} already exists."
            )));
        }
        self.functions.insert(name, code.into());
        Ok(())
    }
}

pub(crate) struct ContextParts {
    pub output: SchemaDocument,
    pub logger: TransformerLogger,
    pub resources: ResourceContext,
    pub resolvers: ResolverManager,
    pub data_sources: DataSourceManager,
    pub access_control: IndexMap<String, AccessControlMatrix>,
    pub functions: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn context(strategies: serde_json::Value) -> TransformerContext {
        TransformerContext::new(
            SchemaDocument::default(),
            TransformerContextOptions {
                data_source_strategies: serde_json::from_value(strategies).unwrap(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn unconfigured_models_use_dynamo_db() {
        let ctx = context(json!({}));

        assert_eq!(ctx.strategy_for("Todo"), &ModelDataSourceStrategy::DefaultDynamoDb);
        assert!(!ctx.is_sql_model("Todo"));
    }

    #[test]
    fn sql_strategies_are_deduplicated_by_name() {
        let strategy = json!({
            "dbType": "POSTGRES",
            "name": "PgStrategy",
            "dbConnectionConfig": { "connectionUriSsmPath": ["/db/uri"] }
        });
        let ctx = context(json!({ "Post": strategy, "Comment": strategy }));

        assert!(ctx.is_sql_model("Post"));
        assert_eq!(ctx.sql_strategies().keys().copied().collect::<Vec<_>>(), ["PgStrategy"]);
    }

    #[test]
    fn functions_are_unique() {
        let mut ctx = context(json!({}));
        ctx.add_function("Echo.js", "export const handler = () => {}").unwrap();

        assert!(ctx.add_function("Echo.js", "").is_err());
    }
}
