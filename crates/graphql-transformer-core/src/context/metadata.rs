use indexmap::IndexMap;
use serde::Serialize;

use crate::access_control::ModelOperation;

/// What a generated top-level field does with its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ModelResolverOperation {
    Get,
    List,
    Sync,
    Search,
    IndexQuery,
    Create,
    Update,
    Delete,
    OnCreate,
    OnUpdate,
    OnDelete,
}

impl ModelResolverOperation {
    /// The access control operation guarding this field.
    pub fn model_operation(self) -> ModelOperation {
        match self {
            ModelResolverOperation::Get => ModelOperation::Get,
            ModelResolverOperation::List | ModelResolverOperation::IndexQuery => ModelOperation::List,
            ModelResolverOperation::Sync => ModelOperation::Sync,
            ModelResolverOperation::Search => ModelOperation::Search,
            ModelResolverOperation::Create => ModelOperation::Create,
            ModelResolverOperation::Update => ModelOperation::Update,
            ModelResolverOperation::Delete => ModelOperation::Delete,
            ModelResolverOperation::OnCreate | ModelResolverOperation::OnUpdate | ModelResolverOperation::OnDelete => {
                ModelOperation::Listen
            }
        }
    }

    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            ModelResolverOperation::Create | ModelResolverOperation::Update | ModelResolverOperation::Delete
        )
    }

    /// Index queries and search queries get their resolvers from the `@index` and `@searchable`
    /// plugins. Everything else is resolved by `@model`.
    pub fn is_model_owned(self) -> bool {
        !matches!(self, ModelResolverOperation::IndexQuery | ModelResolverOperation::Search)
    }

    pub fn is_subscription(self) -> bool {
        matches!(
            self,
            ModelResolverOperation::OnCreate | ModelResolverOperation::OnUpdate | ModelResolverOperation::OnDelete
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResolverField {
    pub operation: ModelResolverOperation,
    pub type_name: String,
    pub field_name: String,
}

/// A foreign key field a relational directive added to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyField {
    pub field_name: String,
    pub related_model: String,
    pub relation_field: String,
}

#[derive(Debug, Clone, Default)]
struct ModelMetadata {
    resolver_fields: Vec<ModelResolverField>,
    relational_fields: Vec<String>,
    implicit_foreign_keys: Vec<ForeignKeyField>,
    join_of: Option<(String, String)>,
    sync_enabled: bool,
}

/// Facts about models one plugin records and others read later.
#[derive(Debug, Default)]
pub struct MetadataStore {
    models: IndexMap<String, ModelMetadata>,
}

impl MetadataStore {
    fn model(&mut self, model_name: &str) -> &mut ModelMetadata {
        self.models.entry(model_name.to_owned()).or_default()
    }

    pub fn add_resolver_field(
        &mut self,
        model_name: &str,
        operation: ModelResolverOperation,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
    ) {
        self.model(model_name).resolver_fields.push(ModelResolverField {
            operation,
            type_name: type_name.into(),
            field_name: field_name.into(),
        });
    }

    /// Top-level fields generated for `model_name`, in generation order.
    pub fn resolver_fields(&self, model_name: &str) -> &[ModelResolverField] {
        self.models
            .get(model_name)
            .map(|model| model.resolver_fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn resolver_field(&self, model_name: &str, operation: ModelResolverOperation) -> Option<&ModelResolverField> {
        self.resolver_fields(model_name)
            .iter()
            .find(|field| field.operation == operation)
    }

    /// Mark a field as resolved through a relationship rather than read from the table.
    pub fn add_relational_field(&mut self, model_name: &str, field_name: impl Into<String>) {
        self.model(model_name).relational_fields.push(field_name.into());
    }

    pub fn is_relational_field(&self, model_name: &str, field_name: &str) -> bool {
        self.models
            .get(model_name)
            .is_some_and(|model| model.relational_fields.iter().any(|field| field == field_name))
    }

    pub fn relational_fields(&self, model_name: &str) -> &[String] {
        self.models
            .get(model_name)
            .map(|model| model.relational_fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn add_implicit_foreign_key(&mut self, model_name: &str, foreign_key: ForeignKeyField) {
        let model = self.model(model_name);
        if !model
            .implicit_foreign_keys
            .iter()
            .any(|existing| existing.field_name == foreign_key.field_name)
        {
            model.implicit_foreign_keys.push(foreign_key);
        }
    }

    pub fn implicit_foreign_keys(&self, model_name: &str) -> &[ForeignKeyField] {
        self.models
            .get(model_name)
            .map(|model| model.implicit_foreign_keys.as_slice())
            .unwrap_or(&[])
    }

    /// Record that `join_model` was generated to link `left` and `right`.
    pub fn set_join_model(&mut self, join_model: &str, left: impl Into<String>, right: impl Into<String>) {
        self.model(join_model).join_of = Some((left.into(), right.into()));
    }

    pub fn join_model_of(&self, join_model: &str) -> Option<(&str, &str)> {
        self.models
            .get(join_model)
            .and_then(|model| model.join_of.as_ref())
            .map(|(left, right)| (left.as_str(), right.as_str()))
    }

    pub fn set_sync_enabled(&mut self, model_name: &str) {
        self.model(model_name).sync_enabled = true;
    }

    pub fn is_sync_enabled(&self, model_name: &str) -> bool {
        self.models.get(model_name).is_some_and(|model| model.sync_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_fields_by_operation() {
        let mut metadata = MetadataStore::default();
        metadata.add_resolver_field("Todo", ModelResolverOperation::Get, "Query", "getTodo");
        metadata.add_resolver_field("Todo", ModelResolverOperation::OnCreate, "Subscription", "onCreateTodo");

        let subscription = metadata
            .resolver_field("Todo", ModelResolverOperation::OnCreate)
            .unwrap();

        assert_eq!(subscription.field_name, "onCreateTodo");
        assert_eq!(subscription.operation.model_operation(), ModelOperation::Listen);
        assert!(metadata.resolver_fields("Comment").is_empty());
    }

    #[test]
    fn index_and_search_queries_are_not_model_owned() {
        assert!(ModelResolverOperation::Get.is_model_owned());
        assert!(ModelResolverOperation::OnDelete.is_model_owned());
        assert!(!ModelResolverOperation::IndexQuery.is_model_owned());
        assert!(!ModelResolverOperation::Search.is_model_owned());
    }

    #[test]
    fn foreign_keys_are_recorded_once() {
        let mut metadata = MetadataStore::default();
        let foreign_key = ForeignKeyField {
            field_name: "postCommentsId".to_owned(),
            related_model: "Post".to_owned(),
            relation_field: "comments".to_owned(),
        };

        metadata.add_implicit_foreign_key("Comment", foreign_key.clone());
        metadata.add_implicit_foreign_key("Comment", foreign_key);

        assert_eq!(metadata.implicit_foreign_keys("Comment").len(), 1);
    }
}
