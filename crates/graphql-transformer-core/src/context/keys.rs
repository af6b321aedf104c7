use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::TransformerError;

pub const DEFAULT_PRIMARY_KEY: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDefinition {
    pub partition_key: String,
    pub sort_key_fields: Vec<String>,
}

impl KeyDefinition {
    pub fn new(partition_key: impl Into<String>, sort_key_fields: Vec<String>) -> Self {
        KeyDefinition {
            partition_key: partition_key.into(),
            sort_key_fields,
        }
    }

    /// Every key field, partition key first.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key_fields.iter().map(String::as_str))
    }

    /// Name of the attribute holding the sort key: composite keys are stored concatenated.
    pub fn sort_key_attribute(&self) -> Option<String> {
        match self.sort_key_fields.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            fields => Some(fields.join("#")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryIndex {
    pub name: String,
    pub key: KeyDefinition,
    pub query_field: Option<String>,
}

/// Primary keys and secondary indexes of every model.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    primary_keys: HashMap<String, KeyDefinition>,
    indexes: IndexMap<String, Vec<SecondaryIndex>>,
}

impl KeyRegistry {
    pub fn set_primary_key(&mut self, model_name: &str, key: KeyDefinition) -> Result<(), TransformerError> {
        if self.primary_keys.contains_key(model_name) {
            return Err(TransformerError::invalid_directive(format!(
                "You may only supply one primary key on type '{model_name}'."
            )));
        }
        self.primary_keys.insert(model_name.to_owned(), key);
        Ok(())
    }

    /// The declared primary key, or `id` without sort key fields.
    pub fn primary_key(&self, model_name: &str) -> KeyDefinition {
        self.primary_keys
            .get(model_name)
            .cloned()
            .unwrap_or_else(|| KeyDefinition::new(DEFAULT_PRIMARY_KEY, Vec::new()))
    }

    pub fn has_custom_primary_key(&self, model_name: &str) -> bool {
        self.primary_keys.contains_key(model_name)
    }

    pub fn add_index(&mut self, model_name: &str, index: SecondaryIndex) -> Result<(), TransformerError> {
        let indexes = self.indexes.entry(model_name.to_owned()).or_default();
        if indexes.iter().any(|existing| existing.name == index.name) {
            return Err(TransformerError::invalid_directive(format!(
                "You may not define more than one index named '{}' on type '{model_name}'.",
                index.name
            )));
        }
        indexes.push(index);
        Ok(())
    }

    pub fn indexes(&self, model_name: &str) -> &[SecondaryIndex] {
        self.indexes.get(model_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_index(&self, model_name: &str, index_name: &str) -> Option<&SecondaryIndex> {
        self.indexes(model_name).iter().find(|index| index.name == index_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_primary_key_is_id() {
        let keys = KeyRegistry::default();

        assert_eq!(keys.primary_key("Todo").fields().collect::<Vec<_>>(), ["id"]);
        assert!(!keys.has_custom_primary_key("Todo"));
    }

    #[test]
    fn composite_sort_keys() {
        let mut keys = KeyRegistry::default();
        keys.set_primary_key(
            "Order",
            KeyDefinition::new("customerId", vec!["status".to_owned(), "createdAt".to_owned()]),
        )
        .unwrap();

        let key = keys.primary_key("Order");
        assert_eq!(key.sort_key_attribute().as_deref(), Some("status#createdAt"));
        assert!(keys
            .set_primary_key("Order", KeyDefinition::new("id", Vec::new()))
            .is_err());
    }

    #[test]
    fn index_names_are_unique_per_model() {
        let mut keys = KeyRegistry::default();
        let index = SecondaryIndex {
            name: "byStatus".to_owned(),
            key: KeyDefinition::new("status", Vec::new()),
            query_field: Some("todosByStatus".to_owned()),
        };

        keys.add_index("Todo", index.clone()).unwrap();

        assert_eq!(
            keys.add_index("Todo", index).unwrap_err().to_string(),
            "You may not define more than one index named 'byStatus' on type 'Todo'."
        );
        assert!(keys.find_index("Todo", "byStatus").is_some());
        assert!(keys.indexes("Comment").is_empty());
    }
}
