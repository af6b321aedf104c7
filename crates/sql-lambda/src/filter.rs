//! Model filter inputs to SQL `WHERE` expressions.
//!
//! A filter is parsed into a [`Condition`] tree first and rendered afterwards, so that a filter
//! with an unknown operator or a malformed value fails as a whole instead of producing a partial
//! clause.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    request::{RequestMetadata, SqlEngine},
    SqlLambdaError,
};

static COLUMN_NAME: OnceLock<Regex> = OnceLock::new();

fn validate_column(column: &str) -> Result<(), SqlLambdaError> {
    let valid = COLUMN_NAME
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").unwrap())
        .is_match(column);

    if valid {
        Ok(())
    } else {
        Err(SqlLambdaError::InvalidColumn(column.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    NotContains,
    BeginsWith,
}

impl Comparison {
    fn parse(operator: &str) -> Option<Self> {
        Some(match operator {
            "eq" => Comparison::Eq,
            "ne" => Comparison::Ne,
            "gt" => Comparison::Gt,
            "ge" => Comparison::Ge,
            "lt" => Comparison::Lt,
            "le" => Comparison::Le,
            "contains" => Comparison::Contains,
            "notContains" => Comparison::NotContains,
            "beginsWith" => Comparison::BeginsWith,
            _ => return None,
        })
    }
}

/// A SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Literal {
    fn from_json(value: &Value) -> Result<Self, SqlLambdaError> {
        match value {
            Value::Null => Ok(Literal::Null),
            Value::Bool(value) => Ok(Literal::Bool(*value)),
            Value::Number(number) => Ok(Literal::Number(number.clone())),
            Value::String(text) => Ok(Literal::Text(text.clone())),
            other => Err(SqlLambdaError::InvalidFilter(format!("{other} is not a scalar value."))),
        }
    }
}

impl Literal {
    /// The literal as `engine` reads it.
    pub fn to_sql(&self, engine: SqlEngine) -> String {
        match self {
            Literal::Text(text) => quote(text, engine),
            other => other.bare(),
        }
    }

    /// The literal without quotes, as it appears inside a `LIKE` pattern.
    fn bare(&self) -> String {
        match self {
            Literal::Null => "NULL".to_owned(),
            Literal::Bool(true) => "TRUE".to_owned(),
            Literal::Bool(false) => "FALSE".to_owned(),
            Literal::Number(number) => number.to_string(),
            Literal::Text(text) => text.clone(),
        }
    }
}

/// A quoted string literal. MySQL reads a backslash as an escape character inside string
/// literals, so it is doubled there. PostgreSQL (with standard conforming strings) does not.
pub(crate) fn quote(text: &str, engine: SqlEngine) -> String {
    let escaped = match engine {
        SqlEngine::Mysql => text.replace('\\', "\\\\").replace('\'', "''"),
        SqlEngine::Postgres => text.replace('\'', "''"),
    };
    format!("'{escaped}'")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Compare {
        column: String,
        comparison: Comparison,
        value: Literal,
    },
    Between {
        column: String,
        low: Literal,
        high: Literal,
    },
}

impl Condition {
    /// Parse a filter object. Keys of one object are combined with `AND`. `None` when the filter
    /// constrains nothing, as `{}` and `{"and": []}` do.
    pub fn parse(filter: &Map<String, Value>, metadata: &RequestMetadata) -> Result<Option<Self>, SqlLambdaError> {
        let mut conditions = Vec::with_capacity(filter.len());

        for (key, value) in filter {
            let condition = match key.as_str() {
                "and" => combine(Self::parse_list(key, value, metadata)?, Condition::And),
                "or" => combine(Self::parse_list(key, value, metadata)?, Condition::Or),
                "not" => Self::parse(object(key, value)?, metadata)?.map(|inner| Condition::Not(Box::new(inner))),
                field_name => Self::parse_field(metadata.column(field_name), object(key, value)?)?,
            };
            conditions.extend(condition);
        }

        Ok(combine(conditions, Condition::And))
    }

    fn parse_list(key: &str, value: &Value, metadata: &RequestMetadata) -> Result<Vec<Self>, SqlLambdaError> {
        let Value::Array(items) = value else {
            return Err(SqlLambdaError::InvalidFilter(format!("{key} expects a list of filters.")));
        };

        let mut conditions = Vec::with_capacity(items.len());
        for item in items {
            conditions.extend(Self::parse(object(key, item)?, metadata)?);
        }
        Ok(conditions)
    }

    fn parse_field(column: &str, operators: &Map<String, Value>) -> Result<Option<Self>, SqlLambdaError> {
        validate_column(column)?;

        let mut conditions = Vec::with_capacity(operators.len());
        for (operator, value) in operators {
            let condition = if operator == "between" {
                match value.as_array().map(Vec::as_slice) {
                    Some([low, high]) => Condition::Between {
                        column: column.to_owned(),
                        low: Literal::from_json(low)?,
                        high: Literal::from_json(high)?,
                    },
                    _ => return Err(SqlLambdaError::BetweenArity),
                }
            } else {
                let Some(comparison) = Comparison::parse(operator) else {
                    tracing::warn!(%operator, %column, "rejecting filter with an unsupported operator");
                    return Err(SqlLambdaError::UnsupportedOperator(operator.clone()));
                };
                Condition::Compare {
                    column: column.to_owned(),
                    comparison,
                    value: Literal::from_json(value)?,
                }
            };
            conditions.push(condition);
        }

        Ok(combine(conditions, Condition::And))
    }

    /// The condition as a parenthesized SQL expression.
    pub fn to_sql(&self, engine: SqlEngine) -> String {
        match self {
            Condition::And(conditions) => join(conditions, " AND ", engine),
            Condition::Or(conditions) => join(conditions, " OR ", engine),
            Condition::Not(condition) => format!("(NOT {})", condition.to_sql(engine)),
            Condition::Between { column, low, high } => {
                format!("({column} BETWEEN {} AND {})", low.to_sql(engine), high.to_sql(engine))
            }
            Condition::Compare {
                column,
                comparison,
                value,
            } => {
                let (operator, rendered) = match (comparison, value) {
                    (Comparison::Eq, Literal::Null) => return format!("({column} IS NULL)"),
                    (Comparison::Ne, Literal::Null) => return format!("({column} IS NOT NULL)"),
                    (Comparison::Eq, value) => ("=", value.to_sql(engine)),
                    (Comparison::Ne, value) => ("!=", value.to_sql(engine)),
                    (Comparison::Gt, value) => (">", value.to_sql(engine)),
                    (Comparison::Ge, value) => (">=", value.to_sql(engine)),
                    (Comparison::Lt, value) => ("<", value.to_sql(engine)),
                    (Comparison::Le, value) => ("<=", value.to_sql(engine)),
                    (Comparison::Contains, value) => ("LIKE", like_pattern(value, "%", "%", engine)),
                    (Comparison::NotContains, value) => ("NOT LIKE", like_pattern(value, "%", "%", engine)),
                    (Comparison::BeginsWith, value) => ("LIKE", like_pattern(value, "", "%", engine)),
                };
                format!("({column} {operator} {rendered})")
            }
        }
    }
}

fn object<'a>(key: &str, value: &'a Value) -> Result<&'a Map<String, Value>, SqlLambdaError> {
    value
        .as_object()
        .ok_or_else(|| SqlLambdaError::InvalidFilter(format!("{key} expects an object.")))
}

/// One condition stays as is, several are grouped with `group`, none constrain nothing.
fn combine(mut conditions: Vec<Condition>, group: fn(Vec<Condition>) -> Condition) -> Option<Condition> {
    match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(group(conditions)),
    }
}

fn join(conditions: &[Condition], separator: &str, engine: SqlEngine) -> String {
    let parts: Vec<_> = conditions.iter().map(|condition| condition.to_sql(engine)).collect();
    format!("({})", parts.join(separator))
}

fn like_pattern(value: &Literal, prefix: &str, suffix: &str, engine: SqlEngine) -> String {
    quote(&format!("{prefix}{}{suffix}", value.bare()), engine)
}

/// Parse a filter value. `None` when it constrains nothing.
pub fn parse_filter(filter: &Value, metadata: &RequestMetadata) -> Result<Option<Condition>, SqlLambdaError> {
    Condition::parse(object("filter", filter)?, metadata)
}

/// Render a filter as a `WHERE` expression, renaming fields to columns through `metadata`. A filter
/// that constrains nothing renders as an empty string.
pub fn to_rds_query_expression_with(
    filter: &Value,
    metadata: &RequestMetadata,
    engine: SqlEngine,
) -> Result<String, SqlLambdaError> {
    Ok(parse_filter(filter, metadata)?
        .map(|condition| condition.to_sql(engine))
        .unwrap_or_default())
}

/// Render a filter whose fields are named like their columns, for MySQL.
pub fn to_rds_query_expression(filter: &Value) -> Result<String, SqlLambdaError> {
    to_rds_query_expression_with(filter, &RequestMetadata::default(), SqlEngine::Mysql)
}
