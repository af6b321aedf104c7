use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "graphql-transform", version)]
/// Compile an annotated GraphQL schema into AppSync resolvers and stack resources
pub(crate) struct Args {
    /// Path to the annotated GraphQL schema
    #[arg(long, short, env = "GRAPHQL_TRANSFORM_SCHEMA")]
    pub schema: PathBuf,
    /// Path to a TOML or JSON transform configuration
    #[arg(long, short, env = "GRAPHQL_TRANSFORM_CONFIG")]
    pub config: Option<PathBuf>,
    /// Write the deployment resources here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Log filter, for example `debug` or `graphql_transformer_core=trace`. Defaults to `RUST_LOG`.
    #[arg(long = "log", env = "GRAPHQL_TRANSFORM_LOG")]
    pub log_filter: Option<String>,
}

pub(crate) fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments() {
        Args::command().debug_assert();

        let args = Args::try_parse_from(["graphql-transform", "--schema", "schema.graphql", "--log", "debug"]).unwrap();
        assert_eq!(args.schema, PathBuf::from("schema.graphql"));
        assert_eq!(args.log_filter.as_deref(), Some("debug"));
        assert!(args.config.is_none());
    }

    #[test]
    fn schema_is_required() {
        assert!(Args::try_parse_from(["graphql-transform"]).is_err());
    }
}
