//! The Lambda behind SQL backed models.
//!
//! Mapping templates of SQL models hand the Lambda a [`LambdaRequest`]: the table, the GraphQL
//! arguments and enough metadata to map fields to columns. [`to_sql`] renders the statement for
//! it, and [`to_response`] turns the returned rows into the resolver result. Model filters become
//! `WHERE` expressions through [`to_rds_query_expression`], and list pages are addressed by an
//! opaque `nextToken`.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod error;
mod filter;
mod pagination;
mod query;
mod request;
mod response;

pub use error::SqlLambdaError;
pub use filter::{
    parse_filter, to_rds_query_expression, to_rds_query_expression_with, Comparison, Condition, Literal,
};
pub use pagination::{decode_next_token, encode_next_token, next_page_token, Page, DEFAULT_LIMIT};
pub use query::to_sql;
pub use request::{LambdaRequest, Operation, RequestMetadata, SqlEngine};
pub use response::to_response;
