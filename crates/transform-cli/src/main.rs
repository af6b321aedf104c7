#![cfg_attr(test, allow(unused_crate_dependencies))]

use std::{fs, process::ExitCode};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod args;
mod config;

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(args: &args::Args) -> anyhow::Result<bool> {
    let schema = fs::read_to_string(&args.schema)
        .with_context(|| format!("error loading schema {}", args.schema.display()))?;
    let config = config::load(args.config.as_deref())?;

    let outcome = graphql_transformer::execute_transform(&schema, &config, Vec::new());
    for log in &outcome.logs {
        eprintln!("{log}");
    }

    let resources = match outcome.result {
        Ok(resources) => resources,
        Err(error) => {
            eprintln!("{error}");
            return Ok(false);
        }
    };

    let json = serde_json::to_string_pretty(&resources)?;
    match &args.output {
        Some(path) => fs::write(path, json).with_context(|| format!("error writing {}", path.display()))?,
        None => println!("{json}"),
    }

    tracing::info!(
        resolvers = resources.resolvers.len(),
        stacks = resources.stacks.len(),
        "transform finished"
    );
    Ok(true)
}

fn main() -> ExitCode {
    let args = args::parse();
    init_logging(args.log_filter.as_deref());

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args(dir: &tempfile::TempDir, schema: &str) -> args::Args {
        let schema_path = dir.path().join("schema.graphql");
        fs::write(&schema_path, schema).unwrap();

        args::Args {
            schema: schema_path,
            config: None,
            output: Some(dir.path().join("resources.json")),
            log_filter: None,
        }
    }

    #[test]
    fn writes_the_resources() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir, "type Todo @model { id: ID! name: String }");

        assert!(run(&args).unwrap());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("resources.json")).unwrap()).unwrap();
        assert!(written["resolvers"]["Query.getTodo.req.vtl"].is_string());
        assert!(written["stacks"]["Todo"]["Resources"]["TodoTable"].is_object());
    }

    #[test]
    fn invalid_schemas_fail_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir, "type Todo @model @unknown { id: ID! }");

        assert!(!run(&args).unwrap());
        assert!(!dir.path().join("resources.json").exists());
    }

    #[test]
    fn missing_schema_is_an_error() {
        let args = args::Args {
            schema: PathBuf::from("/nonexistent/schema.graphql"),
            config: None,
            output: None,
            log_filter: None,
        };

        let error = run(&args).unwrap_err();
        assert!(error.to_string().starts_with("error loading schema"));
    }
}
