use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::TransformerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceKind {
    AmazonDynamodb,
    AwsLambda,
    Http,
    None,
    AmazonOpensearchService,
    RelationalDatabase,
}

/// An AppSync data source resolvers run against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub name: String,
    pub kind: DataSourceKind,
    /// Kind specific settings: table name, function ARN, endpoint.
    pub config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl DataSource {
    pub fn new(name: impl Into<String>, kind: DataSourceKind, config: Value) -> Self {
        DataSource {
            name: name.into(),
            kind,
            config,
            stack: None,
        }
    }

    #[must_use]
    pub fn in_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct DataSourceManager {
    data_sources: IndexMap<String, DataSource>,
}

impl DataSourceManager {
    pub fn add(&mut self, data_source: DataSource) -> Result<(), TransformerError> {
        if self.data_sources.contains_key(&data_source.name) {
            return Err(TransformerError::resource_conflict(format!(
                "A data source named {} already exists.",
                data_source.name
            )));
        }
        self.data_sources.insert(data_source.name.clone(), data_source);
        Ok(())
    }

    /// Add the data source unless one with the same name exists. Returns whether it was added.
    pub fn add_if_absent(&mut self, data_source: DataSource) -> bool {
        if self.data_sources.contains_key(&data_source.name) {
            return false;
        }
        self.data_sources.insert(data_source.name.clone(), data_source);
        true
    }

    pub fn has(&self, name: &str) -> bool {
        self.data_sources.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&DataSource> {
        self.data_sources.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataSource> {
        self.data_sources.values()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn names_are_unique() {
        let mut data_sources = DataSourceManager::default();
        let table = DataSource::new("TodoTable", DataSourceKind::AmazonDynamodb, json!({ "tableName": "Todo" }));

        data_sources.add(table.clone()).unwrap();

        assert!(!data_sources.add_if_absent(table.clone()));
        assert_eq!(
            data_sources.add(table).unwrap_err().to_string(),
            "A data source named TodoTable already exists."
        );
        assert_eq!(data_sources.get("TodoTable").map(|ds| ds.kind.to_string()).as_deref(), Some("AMAZON_DYNAMODB"));
    }
}
