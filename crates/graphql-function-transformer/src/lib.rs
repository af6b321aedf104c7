//! `@function(name, region, accountId)` resolves a field with an AWS Lambda function.
//!
//! Every distinct function gets one `AWS_LAMBDA` data source with a service role allowed to invoke
//! it. Each application of the directive appends one invocation step to the field's pipeline
//! resolver, so repeating the directive chains functions: every step sees the previous result in
//! `$ctx.prev`.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod resources;

use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer_core::{
    context::{PipelineFunction, ResolverPipeline},
    directive::{get_arguments, DirectiveArguments},
    HookResult, TransformerContext, TransformerPlugin,
};
use indoc::{formatdoc, indoc};
use serde::Deserialize;

pub use resources::{data_source_name, function_arn, FUNCTION_STACK};

const FUNCTION_DIRECTIVE_DEFINITION: &str = r"
directive @function(name: String!, region: String, accountId: String) repeatable on FIELD_DEFINITION
";

const INVOCATION_RESPONSE: &str = indoc! {r"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    $util.toJson($ctx.result)
"};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionArguments {
    pub name: String,
    pub region: Option<String>,
    pub account_id: Option<String>,
}

impl DirectiveArguments for FunctionArguments {
    const NAME: &'static str = "function";

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("@function name must not be empty.".to_owned());
        }
        if self.account_id.as_ref().is_some_and(|id| !id.chars().all(|c| c.is_ascii_digit())) {
            return Err(format!("@function accountId of {} must be a numeric AWS account id.", self.name));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FunctionTransformer {
    /// `(type, field, function)` in declaration order.
    invocations: Vec<(String, String, FunctionArguments)>,
}

impl FunctionTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn invocation_request(type_name: &str, field_name: &str) -> String {
    formatdoc! {r#"
        {{
          "version": "2018-05-29",
          "operation": "Invoke",
          "payload": {{
            "typeName": "{type_name}",
            "fieldName": "{field_name}",
            "arguments": $util.toJson($ctx.arguments),
            "identity": $util.toJson($ctx.identity),
            "source": $util.toJson($ctx.source),
            "request": $util.toJson($ctx.request),
            "prev": $util.toJson($ctx.prev)
          }}
        }}
    "#}
}

impl TransformerPlugin for FunctionTransformer {
    fn name(&self) -> &str {
        "FunctionTransformer"
    }

    fn directive_definitions(&self) -> &str {
        FUNCTION_DIRECTIVE_DEFINITION
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let arguments: FunctionArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;

        self.invocations.push((
            parent.node.name.node.to_string(),
            field.node.name.node.to_string(),
            arguments,
        ));
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for (type_name, field_name, function) in &self.invocations {
            let data_source = resources::add_function_data_source(ctx, function)?;

            ctx.resolvers_mut().add_resolver(
                ResolverPipeline::pipeline(
                    type_name.as_str(),
                    field_name.as_str(),
                    PipelineFunction::new(
                        Some(data_source),
                        invocation_request(type_name, field_name),
                        INVOCATION_RESPONSE,
                    ),
                )
                .in_stack(FUNCTION_STACK),
            )?;
            tracing::debug!(
                type_name = %type_name,
                field_name = %field_name,
                function = %function.name,
                "added function invocation"
            );
        }
        Ok(())
    }
}
