#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SqlLambdaError {
    #[error("between condition must have two values")]
    BetweenArity,
    #[error("Unsupported operator \"{0}\" in filter.")]
    UnsupportedOperator(String),
    #[error("Invalid column name \"{0}\".")]
    InvalidColumn(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid nextToken.")]
    InvalidNextToken,
    #[error("The {0} operation requires a {1}.")]
    MissingArgument(&'static str, &'static str),
}
