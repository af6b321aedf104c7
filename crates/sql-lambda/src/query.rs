//! SQL statements for every operation of a [`LambdaRequest`].

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::{
    filter::{parse_filter, quote},
    pagination::Page,
    request::{LambdaRequest, Operation, RequestMetadata, SqlEngine},
    SqlLambdaError,
};

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn identifier(name: &str) -> Result<&str, SqlLambdaError> {
    let valid = IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*)?$").unwrap())
        .is_match(name);
    if valid {
        Ok(name)
    } else {
        Err(SqlLambdaError::InvalidColumn(name.to_owned()))
    }
}

fn literal(value: &Value, engine: SqlEngine) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Bool(true) => "TRUE".to_owned(),
        Value::Bool(false) => "FALSE".to_owned(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => quote(text, engine),
        // Lists and objects are stored as JSON text.
        other => quote(&other.to_string(), engine),
    }
}

/// `id = '1' AND sk = 2` over the key fields, read from `values`.
fn key_condition(
    values: &Map<String, Value>,
    metadata: &RequestMetadata,
    engine: SqlEngine,
) -> Result<String, SqlLambdaError> {
    let mut parts = Vec::with_capacity(metadata.keys.len());
    for key in &metadata.keys {
        let value = values.get(key).unwrap_or(&Value::Null);
        parts.push(format!("{} = {}", identifier(metadata.column(key))?, literal(value, engine)));
    }
    if parts.is_empty() {
        return Err(SqlLambdaError::MissingArgument("key", "key field"));
    }
    Ok(parts.join(" AND "))
}

fn table(request: &LambdaRequest) -> Result<&str, SqlLambdaError> {
    let table = request
        .table
        .as_deref()
        .ok_or(SqlLambdaError::MissingArgument("model", "table"))?;
    identifier(table)
}

fn input(request: &LambdaRequest) -> Result<&Map<String, Value>, SqlLambdaError> {
    request.input().ok_or(SqlLambdaError::MissingArgument("mutation", "input"))
}

fn select(request: &LambdaRequest, first_only: bool) -> Result<String, SqlLambdaError> {
    let mut sql = format!("SELECT * FROM {}", table(request)?);
    if let Some(filter) = request.filter() {
        if let Some(condition) = parse_filter(filter, &request.metadata)? {
            sql.push_str(" WHERE ");
            sql.push_str(&condition.to_sql(request.engine));
        }
    }

    let page = if first_only { Page::first() } else { Page::of(request)? };
    sql.push_str(&format!(" LIMIT {}", page.limit));
    if page.offset > 0 {
        sql.push_str(&format!(" OFFSET {}", page.offset));
    }
    Ok(sql)
}

/// Substitute `:name` placeholders of a custom statement with the matching arguments.
fn bind_statement(statement: &str, args: &Map<String, Value>, engine: SqlEngine) -> String {
    let placeholder = PLACEHOLDER.get_or_init(|| Regex::new(r"(^|[^:]):([A-Za-z_][A-Za-z0-9_]*)").unwrap());

    placeholder
        .replace_all(statement, |captures: &Captures<'_>| {
            let value = args.get(&captures[2]).unwrap_or(&Value::Null);
            format!("{}{}", &captures[1], literal(value, engine))
        })
        .into_owned()
}

/// The statement a request runs.
pub fn to_sql(request: &LambdaRequest) -> Result<String, SqlLambdaError> {
    let metadata = &request.metadata;
    let engine = request.engine;

    let sql = match request.operation {
        Operation::Get => format!(
            "SELECT * FROM {} WHERE {} LIMIT 1",
            table(request)?,
            key_condition(&request.args, metadata, engine)?
        ),
        Operation::GetFirst => select(request, true)?,
        Operation::List | Operation::Sync | Operation::Index => select(request, false)?,
        Operation::Create => {
            let input = input(request)?;
            let mut columns = Vec::with_capacity(input.len());
            let mut values = Vec::with_capacity(input.len());
            for (field, value) in input {
                columns.push(identifier(metadata.column(field))?.to_owned());
                values.push(literal(value, engine));
            }
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table(request)?,
                columns.join(", "),
                values.join(", ")
            )
        }
        Operation::Update => {
            let input = input(request)?;
            let mut assignments = Vec::with_capacity(input.len());
            for (field, value) in input.iter().filter(|(field, _)| !metadata.keys.contains(field)) {
                assignments.push(format!("{} = {}", identifier(metadata.column(field))?, literal(value, engine)));
            }
            if assignments.is_empty() {
                return Err(SqlLambdaError::MissingArgument("update", "non-key field"));
            }
            format!(
                "UPDATE {} SET {} WHERE {}",
                table(request)?,
                assignments.join(", "),
                key_condition(input, metadata, engine)?
            )
        }
        Operation::Delete => format!(
            "DELETE FROM {} WHERE {}",
            table(request)?,
            key_condition(input(request)?, metadata, engine)?
        ),
        Operation::RawSql => {
            let statement = request
                .statement
                .as_deref()
                .ok_or(SqlLambdaError::MissingArgument("RAW_SQL", "statement"))?;
            bind_statement(statement, &request.args, engine)
        }
    };

    tracing::debug!(
        operation = %request.operation,
        operation_name = %request.operation_name,
        %engine,
        "rendered statement"
    );
    Ok(sql)
}
