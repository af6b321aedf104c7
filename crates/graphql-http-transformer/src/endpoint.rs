//! Splitting an `@http` url into the data source origin and the per-field request parts.

use heck::ToUpperCamelCase;
use serde_json::{json, Value};
use url::Url;

const ENV_PLACEHOLDER: &str = "${env}";
const REGION_PLACEHOLDER: &str = "${aws_region}";

// Stand-ins that survive url parsing, swapped back when the origin is emitted.
const ENV_MARKER: &str = "amplify-env-placeholder";
const REGION_MARKER: &str = "amplify-region-placeholder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `https://api.example.com`, placeholders restored.
    pub origin: String,
    /// The path with `:name` segments left in place.
    pub path: String,
    pub path_parameters: Vec<String>,
    /// Static query string pairs from the url.
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let marked = raw
            .replace(ENV_PLACEHOLDER, ENV_MARKER)
            .replace(REGION_PLACEHOLDER, REGION_MARKER);
        let url = Url::parse(&marked).map_err(|err| format!("{raw} is not a valid url: {err}."))?;

        if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
            return Err(format!("The url {raw} must begin with http:// or https://."));
        }

        let origin = url
            .origin()
            .ascii_serialization()
            .replace(ENV_MARKER, ENV_PLACEHOLDER)
            .replace(REGION_MARKER, REGION_PLACEHOLDER);
        let path = url.path().to_owned();
        let path_parameters = path
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();
        let query = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Ok(Endpoint {
            origin,
            path,
            path_parameters,
            query,
        })
    }

    /// `ApiExampleComHttp` for `https://api.example.com`.
    pub fn data_source_name(&self) -> String {
        let host = self
            .origin
            .split_once("://")
            .map_or(self.origin.as_str(), |(_, host)| host)
            .replace(ENV_PLACEHOLDER, "")
            .replace(REGION_PLACEHOLDER, "");
        format!("{}Http", host.to_upper_camel_case())
    }

    /// The data source endpoint, substituting placeholders through CloudFormation.
    pub fn origin_value(&self) -> Value {
        if !self.origin.contains(ENV_PLACEHOLDER) && !self.origin.contains(REGION_PLACEHOLDER) {
            return json!(self.origin);
        }
        let origin = self.origin.replace(REGION_PLACEHOLDER, "${AWS::Region}");
        json!({ "Fn::Sub": [origin, { "env": { "Ref": "env" } }] })
    }

    /// The path as a VTL string, each `:name` segment read from the `params` argument.
    pub fn resource_path(&self) -> String {
        self.path
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => format!("${{ctx.args.params.{name}}}"),
                _ => segment.to_owned(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn path_parameters_and_static_query() {
        let endpoint = Endpoint::parse("https://api.example.com/posts/:id/comments?lang=en").unwrap();

        assert_eq!(endpoint.origin, "https://api.example.com");
        assert_eq!(endpoint.path_parameters, vec!["id".to_owned()]);
        assert_eq!(endpoint.query, vec![("lang".to_owned(), "en".to_owned())]);
        assert_eq!(endpoint.resource_path(), "/posts/${ctx.args.params.id}/comments");
        assert_eq!(endpoint.data_source_name(), "ApiExampleComHttp");
    }

    #[test]
    fn placeholders_in_the_host() {
        let endpoint = Endpoint::parse("https://${env}.api.${aws_region}.example.com/items").unwrap();

        assert_eq!(endpoint.origin, "https://${env}.api.${aws_region}.example.com");
        assert_eq!(
            endpoint.origin_value(),
            json!({ "Fn::Sub": ["https://${env}.api.${AWS::Region}.example.com", { "env": { "Ref": "env" } }] })
        );
        assert_eq!(endpoint.data_source_name(), "ApiExampleComHttp");
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert_eq!(
            Endpoint::parse("ftp://example.com/file").unwrap_err(),
            "The url ftp://example.com/file must begin with http:// or https://."
        );
        assert!(Endpoint::parse("/relative/path").is_err());
    }
}
