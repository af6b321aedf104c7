use std::{fs, path::Path};

use anyhow::{anyhow, Context};
use graphql_transformer::TransformConfig;

/// Reads a configuration file, as JSON when the extension says so and as TOML otherwise.
pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<TransformConfig> {
    let Some(path) = path else {
        return Ok(TransformConfig::default());
    };

    let contents = fs::read_to_string(path).with_context(|| format!("error loading config {}", path.display()))?;

    let is_json = path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let config = if is_json {
        serde_json::from_str(&contents).map_err(|err| anyhow!("invalid config {}: {err}", path.display()))?
    } else {
        toml::from_str(&contents).map_err(|err| anyhow!("invalid config {}: {err}", path.display()))?
    };

    tracing::debug!(path = %path.display(), "loaded transform configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use indoc::indoc;

    use super::*;

    #[test]
    fn no_path_means_defaults() {
        let config = load(None).unwrap();
        assert!(config.data_source_strategies.is_empty());
    }

    #[test]
    fn toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            indoc! {r#"
                [parameters]
                allowGen1Patterns = false

                [predictions]
                bucketName = "media"
            "#}
            .as_bytes(),
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert!(!config.parameters.allow_gen1_patterns);
        assert_eq!(config.predictions.unwrap().bucket_name, "media");
    }

    #[test]
    fn json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{ "stackMapping": { "QueryGetTodoResolver": "Custom" } }"#)
            .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.stack_mapping["QueryGetTodoResolver"], "Custom");
    }

    #[test]
    fn malformed_files_name_the_path() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"{ nope").unwrap();

        let error = load(Some(file.path())).unwrap_err().to_string();
        assert!(error.starts_with("invalid config "));
    }
}
