//! `@http(method, url, headers)` resolves a field with a call to an HTTP endpoint.
//!
//! Fields calling the same origin share one `HTTP` data source. Path segments written as `:name`
//! become required members of a generated `params` input argument. The remaining field arguments
//! go to the query string for `GET` and `DELETE`, and to the JSON body otherwise.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod endpoint;
mod templates;

use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer_core::{
    context::{DataSource, DataSourceKind, PipelineFunction, ResolverPipeline},
    directive::{get_arguments, DirectiveArguments},
    document::ast,
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use serde::Deserialize;
use serde_json::json;

pub use endpoint::Endpoint;

pub const HTTP_STACK: &str = "HttpStack";

const HTTP_DIRECTIVE_DEFINITION: &str = r"
directive @http(method: HttpMethod = GET, url: String!, headers: [HttpHeader] = []) on FIELD_DEFINITION
enum HttpMethod {
  GET
  POST
  PUT
  DELETE
  PATCH
}
input HttpHeader {
  key: String
  value: String
}
";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpHeader {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct HttpArguments {
    #[serde(default)]
    method: HttpMethod,
    url: String,
    #[serde(default)]
    headers: Vec<HttpHeader>,
}

impl DirectiveArguments for HttpArguments {
    const NAME: &'static str = "http";
}

#[derive(Debug)]
struct HttpField {
    type_name: String,
    field_name: String,
    method: HttpMethod,
    endpoint: Endpoint,
    headers: Vec<HttpHeader>,
    /// Arguments declared on the field itself.
    arguments: Vec<String>,
}

impl HttpField {
    /// `QueryGetPostParamsInput` for `Query.getPost`.
    fn params_input(&self) -> String {
        format!("{}{}ParamsInput", self.type_name, ast::upper_first(&self.field_name))
    }
}

#[derive(Debug, Default)]
pub struct HttpTransformer {
    fields: Vec<HttpField>,
}

impl HttpTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformerPlugin for HttpTransformer {
    fn name(&self) -> &str {
        "HttpTransformer"
    }

    fn directive_definitions(&self) -> &str {
        HTTP_DIRECTIVE_DEFINITION
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let arguments: HttpArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;
        let type_name = parent.node.name.node.as_str();
        let field_name = field.node.name.node.as_str();

        let endpoint = Endpoint::parse(&arguments.url).map_err(|message| {
            let message = format!("@http on {type_name}.{field_name}: {message}");
            TransformerError::invalid_directive_at(message, directive.pos)
        })?;

        let declared: Vec<String> = field
            .node
            .arguments
            .iter()
            .map(|argument| argument.node.name.node.to_string())
            .collect();
        if !endpoint.path_parameters.is_empty() && declared.iter().any(|argument| argument == "params") {
            return Err(TransformerError::invalid_directive_at(
                format!("@http on {type_name}.{field_name} uses path parameters, so the field cannot declare a params argument."),
                directive.pos,
            ));
        }

        self.fields.push(HttpField {
            type_name: type_name.to_owned(),
            field_name: field_name.to_owned(),
            method: arguments.method,
            endpoint,
            headers: arguments.headers,
            arguments: declared,
        });
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for http_field in &self.fields {
            if http_field.endpoint.path_parameters.is_empty() {
                continue;
            }

            let params_input = http_field.params_input();
            ctx.output_mut().add_type(ast::input_object_type(
                &params_input,
                http_field
                    .endpoint
                    .path_parameters
                    .iter()
                    .map(|name| ast::input_value(name, ast::non_null(ast::named_type("String"))))
                    .collect(),
            ))?;

            let Some(field) = ctx
                .output_mut()
                .field_mut(&http_field.type_name, &http_field.field_name)
            else {
                continue;
            };
            field
                .node
                .arguments
                .push(ast::input_value("params", ast::non_null(ast::named_type(&params_input))));
        }
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for http_field in &self.fields {
            let data_source = http_field.endpoint.data_source_name();
            ctx.data_sources_mut().add_if_absent(
                DataSource::new(
                    data_source.as_str(),
                    DataSourceKind::Http,
                    json!({ "HttpConfig": { "Endpoint": http_field.endpoint.origin_value() } }),
                )
                .in_stack(HTTP_STACK),
            );

            let request = templates::http_request(
                http_field.method,
                &http_field.endpoint,
                &http_field.headers,
                &http_field.arguments,
            );

            ctx.resolvers_mut().add_resolver(
                ResolverPipeline::pipeline(
                    http_field.type_name.as_str(),
                    http_field.field_name.as_str(),
                    PipelineFunction::new(Some(data_source), request, templates::HTTP_RESPONSE),
                )
                .in_stack(HTTP_STACK),
            )?;
            tracing::debug!(
                type_name = %http_field.type_name,
                field_name = %http_field.field_name,
                method = %http_field.method,
                "added http resolver"
            );
        }
        Ok(())
    }
}
