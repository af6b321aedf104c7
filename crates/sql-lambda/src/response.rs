//! Rows returned by the database to the result a resolver hands back to GraphQL.

use serde_json::{json, Map, Value};

use crate::{
    pagination::Page,
    request::{LambdaRequest, Operation, RequestMetadata},
    SqlLambdaError,
};

/// Rename mapped columns of a row back to their GraphQL field names.
fn to_fields(row: Value, metadata: &RequestMetadata) -> Value {
    let Value::Object(columns) = row else {
        return row;
    };
    if metadata.column_mapping.is_empty() {
        return Value::Object(columns);
    }

    let fields: Map<String, Value> = columns
        .into_iter()
        .map(|(column, value)| {
            let field = metadata
                .column_mapping
                .iter()
                .find(|(_, mapped)| **mapped == column)
                .map_or(column, |(field, _)| field.clone());
            (field, value)
        })
        .collect();
    Value::Object(fields)
}

/// The result of `request` given the rows its statement returned.
///
/// List operations answer with a page of `items` and the `nextToken` of the following page. Key
/// lookups and mutations answer with their first row, custom statements with all rows.
pub fn to_response(request: &LambdaRequest, rows: Vec<Value>) -> Result<Value, SqlLambdaError> {
    let metadata = &request.metadata;
    let mut rows: Vec<Value> = rows.into_iter().map(|row| to_fields(row, metadata)).collect();

    let response = match request.operation {
        Operation::List | Operation::Sync | Operation::Index => {
            let next_token = Page::of(request)?.next_token(rows.len());
            json!({ "items": rows, "nextToken": next_token })
        }
        Operation::Get | Operation::GetFirst | Operation::Create | Operation::Update | Operation::Delete => {
            if rows.is_empty() {
                Value::Null
            } else {
                rows.swap_remove(0)
            }
        }
        Operation::RawSql => Value::Array(rows),
    };
    Ok(response)
}
