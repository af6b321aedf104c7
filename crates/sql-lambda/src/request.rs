//! The payload mapping templates send to the Lambda.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Get,
    GetFirst,
    List,
    Sync,
    Index,
    Create,
    Update,
    Delete,
    RawSql,
}

/// The database a request runs against. String literals are escaped differently per engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlEngine {
    #[default]
    Mysql,
    Postgres,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    /// Fields identifying a row.
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub non_scalar_fields: Vec<String>,
    /// GraphQL field name to column name, for renamed columns only.
    #[serde(default)]
    pub column_mapping: IndexMap<String, String>,
}

impl RequestMetadata {
    pub fn column<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.column_mapping
            .get(field_name)
            .map_or(field_name, String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaRequest {
    pub operation: Operation,
    /// The GraphQL field the request resolves.
    pub operation_name: String,
    #[serde(default)]
    pub engine: SqlEngine,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub metadata: RequestMetadata,
    /// Set for `RAW_SQL`.
    #[serde(default)]
    pub statement: Option<String>,
    /// Set for `INDEX`.
    #[serde(default)]
    pub index_name: Option<String>,
}

impl LambdaRequest {
    pub fn filter(&self) -> Option<&Value> {
        self.args.get("filter").filter(|filter| !filter.is_null())
    }

    pub fn limit(&self) -> Option<u64> {
        self.args.get("limit").and_then(Value::as_u64)
    }

    pub fn next_token(&self) -> Option<&str> {
        self.args.get("nextToken").and_then(Value::as_str)
    }

    pub fn input(&self) -> Option<&Map<String, Value>> {
        self.args.get("input").and_then(Value::as_object)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn templates_payload() {
        let request: LambdaRequest = serde_json::from_value(json!({
            "table": "posts",
            "args": { "filter": { "title": { "eq": "x" } }, "limit": 10 },
            "operation": "LIST",
            "operationName": "listPosts",
            "metadata": { "keys": ["id"], "nonScalarFields": [], "columnMapping": { "title": "post_title" } }
        }))
        .unwrap();

        assert_eq!(request.operation, Operation::List);
        assert_eq!(request.limit(), Some(10));
        assert_eq!(request.metadata.column("title"), "post_title");
        assert_eq!(request.metadata.column("id"), "id");
        assert!(request.next_token().is_none());
        assert_eq!(request.engine, SqlEngine::Mysql);
    }

    #[test]
    fn engine_is_read_from_the_payload() {
        let request: LambdaRequest = serde_json::from_value(json!({
            "operation": "RAW_SQL",
            "operationName": "topPosts",
            "engine": "POSTGRES",
            "statement": "SELECT 1"
        }))
        .unwrap();

        assert_eq!(request.engine, SqlEngine::Postgres);
    }
}
