//! Mapping templates for model operations, one implementation per kind of data source.
//!
//! The generator of a model is chosen from its [`ModelDataSourceStrategy`] with
//! [`generator_for`]. Callers only ever see the [`ModelVtlGenerator`] trait.

mod dynamodb;
mod sql;

use graphql_transformer_core::{
    context::{KeyDefinition, ModelResolverOperation, SecondaryIndex},
    strategy::ModelDataSourceStrategy,
    MappingTemplate, TransformerContext, TransformerError,
};
use indoc::indoc;

pub use dynamodb::DynamoDbGenerator;
pub use sql::SqlLambdaGenerator;

/// The request and response template of one resolver step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverTemplates {
    pub request: MappingTemplate,
    pub response: MappingTemplate,
}

impl ResolverTemplates {
    pub fn new(request: impl Into<MappingTemplate>, response: impl Into<MappingTemplate>) -> Self {
        ResolverTemplates {
            request: request.into(),
            response: response.into(),
        }
    }
}

/// Everything about a model that shapes its templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationConfig {
    pub model_name: String,
    /// Name of the backing table, after `@mapsTo` and `@refersTo` renames.
    pub table_name: String,
    pub key: KeyDefinition,
    pub sync_enabled: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// GraphQL field name to column or attribute name, for renamed fields.
    pub field_mappings: Vec<(String, String)>,
}

impl OperationConfig {
    pub fn new(ctx: &TransformerContext, model_name: &str) -> Self {
        OperationConfig {
            model_name: model_name.to_owned(),
            table_name: ctx.resource_names().get_model_name_mapping(model_name).to_owned(),
            key: ctx.keys().primary_key(model_name),
            sync_enabled: ctx.metadata().is_sync_enabled(model_name),
            created_at: None,
            updated_at: None,
            field_mappings: ctx
                .resource_names()
                .field_mappings(model_name)
                .into_iter()
                .map(|(field, column)| (field.to_owned(), column.to_owned()))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_timestamps(mut self, created_at: Option<&str>, updated_at: Option<&str>) -> Self {
        self.created_at = created_at.map(str::to_owned);
        self.updated_at = updated_at.map(str::to_owned);
        self
    }
}

/// How a relational field finds its related records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLookup {
    /// Secondary index to query. `None` reads through the primary key.
    pub index_name: Option<String>,
    /// Field of the related model and the `$ctx.source` field it must equal, partition key first.
    pub key_bindings: Vec<(String, String)>,
    /// Whether the relation returns a connection rather than a single record.
    pub many: bool,
}

/// Generates the templates of every model operation against one kind of data source.
pub trait ModelVtlGenerator {
    /// The data source the model's resolvers run against.
    fn data_source_name(&self, model_name: &str) -> String;

    fn get(&self, config: &OperationConfig) -> ResolverTemplates;

    fn list(&self, config: &OperationConfig) -> ResolverTemplates;

    fn sync(&self, config: &OperationConfig) -> ResolverTemplates;

    fn create(&self, config: &OperationConfig) -> ResolverTemplates;

    fn update(&self, config: &OperationConfig) -> ResolverTemplates;

    fn delete(&self, config: &OperationConfig) -> ResolverTemplates;

    fn index_query(&self, config: &OperationConfig, index: &SecondaryIndex) -> ResolverTemplates;

    fn relation(&self, config: &OperationConfig, lookup: &RelationLookup) -> ResolverTemplates;

    /// Templates of a top-level model operation.
    fn generate(
        &self,
        operation: ModelResolverOperation,
        config: &OperationConfig,
    ) -> Result<ResolverTemplates, TransformerError> {
        Ok(match operation {
            ModelResolverOperation::Get => self.get(config),
            ModelResolverOperation::List => self.list(config),
            ModelResolverOperation::Sync => self.sync(config),
            ModelResolverOperation::Create => self.create(config),
            ModelResolverOperation::Update => self.update(config),
            ModelResolverOperation::Delete => self.delete(config),
            ModelResolverOperation::OnCreate | ModelResolverOperation::OnUpdate | ModelResolverOperation::OnDelete => {
                subscription()
            }
            ModelResolverOperation::Search | ModelResolverOperation::IndexQuery => {
                return Err(TransformerError::InvalidTransformerConfiguration(format!(
                    "The {operation} operation of {} is not generated by @model.",
                    config.model_name
                )))
            }
        })
    }
}

/// The generator matching the data source strategy of a model.
pub fn generator_for(strategy: &ModelDataSourceStrategy) -> Box<dyn ModelVtlGenerator> {
    match strategy {
        ModelDataSourceStrategy::DefaultDynamoDb | ModelDataSourceStrategy::AmplifyManagedDynamoDb => {
            Box::new(DynamoDbGenerator)
        }
        ModelDataSourceStrategy::SqlLambda(strategy) => Box::new(SqlLambdaGenerator::new(strategy)),
    }
}

/// Subscriptions resolve locally: the mutation result is forwarded as is.
pub fn subscription() -> ResolverTemplates {
    ResolverTemplates::new(
        indoc! {r#"
            {
              "version": "2018-05-29",
              "payload": {}
            }
        "#},
        "$util.toJson(null)\n",
    )
}

pub(crate) const RESPONSE_TEMPLATE: &str = indoc! {r"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    $util.toJson($ctx.result)
"};

/// Lines filling in the timestamps of `$args` on create and update.
pub(crate) fn timestamp_lines(config: &OperationConfig, creating: bool) -> String {
    let mut lines = String::from("#set( $now = $util.time.nowISO8601() )\n");
    if creating {
        if let Some(created_at) = &config.created_at {
            lines.push_str(&format!(
                "$util.qr($args.put(\"{created_at}\", $util.defaultIfNull($args.{created_at}, $now)))\n"
            ));
        }
    }
    if let Some(updated_at) = &config.updated_at {
        lines.push_str(&format!(
            "$util.qr($args.put(\"{updated_at}\", $util.defaultIfNull($args.{updated_at}, $now)))\n"
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use graphql_transformer_core::strategy::ModelDataSourceStrategy;
    use serde_json::json;

    use super::*;

    #[test]
    fn strategies_select_their_generator() {
        let sql: ModelDataSourceStrategy = serde_json::from_value(json!({
            "dbType": "MYSQL",
            "name": "MySQLStrategy",
            "dbConnectionConfig": { "connectionUriSsmPath": ["/db/uri"] }
        }))
        .unwrap();

        assert_eq!(
            generator_for(&ModelDataSourceStrategy::DefaultDynamoDb).data_source_name("Todo"),
            "TodoTable"
        );
        assert_eq!(
            generator_for(&sql).data_source_name("Todo"),
            "MySQLStrategyLambda"
        );
    }

    #[test]
    fn search_is_not_a_model_operation() {
        let config = OperationConfig {
            model_name: "Todo".to_owned(),
            table_name: "Todo".to_owned(),
            key: KeyDefinition::new("id", Vec::new()),
            sync_enabled: false,
            created_at: None,
            updated_at: None,
            field_mappings: Vec::new(),
        };

        let error = DynamoDbGenerator
            .generate(ModelResolverOperation::Search, &config)
            .unwrap_err();

        assert_eq!(error.to_string(), "The search operation of Todo is not generated by @model.");
    }
}
