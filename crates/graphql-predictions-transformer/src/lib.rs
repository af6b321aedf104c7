//! `@predictions(actions)` turns a query field into a chain of AI/ML calls: text and label
//! detection with Rekognition, translation with Translate, and speech synthesis with Polly through
//! a Lambda function. Images are read from the configured storage bucket.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod actions;
mod resources;
mod templates;

use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer_core::{
    context::{PipelineFunction, ResolverPipeline},
    directive::{get_arguments, DirectiveArguments},
    document::ast,
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use serde::Deserialize;

pub use actions::{validate_chain, PredictionsAction};
pub use resources::PREDICTIONS_STACK;

const PREDICTIONS_DIRECTIVE_DEFINITION: &str = r"
directive @predictions(actions: [PredictionsActions!]!) on FIELD_DEFINITION
enum PredictionsActions {
  identifyText
  identifyLabels
  convertTextToSpeech
  translateText
}
";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionsConfig {
    /// Storage bucket holding the images under `public/`.
    pub bucket_name: String,
}

#[derive(Debug, Deserialize)]
struct PredictionsArguments {
    actions: Vec<PredictionsAction>,
}

impl DirectiveArguments for PredictionsArguments {
    const NAME: &'static str = "predictions";

    fn validate(&self) -> Result<(), String> {
        validate_chain(&self.actions)
    }
}

#[derive(Debug)]
struct PredictionsField {
    field_name: String,
    actions: Vec<PredictionsAction>,
}

impl PredictionsField {
    fn input_type(&self) -> String {
        format!("{}Input", ast::upper_first(&self.field_name))
    }

    fn action_input_type(&self, action: PredictionsAction) -> String {
        format!("{}{}Input", ast::upper_first(&self.field_name), ast::upper_first(&action.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct PredictionsTransformer {
    config: Option<PredictionsConfig>,
    fields: Vec<PredictionsField>,
}

impl PredictionsTransformer {
    pub fn new(config: Option<PredictionsConfig>) -> Self {
        PredictionsTransformer {
            config,
            fields: Vec::new(),
        }
    }

    fn bucket_name(&self) -> Result<&str, TransformerError> {
        self.config
            .as_ref()
            .map(|config| config.bucket_name.as_str())
            .ok_or_else(|| {
                TransformerError::InvalidTransformerConfiguration(
                    "The @predictions directive requires a storage bucket. Configure predictions.bucketName.".to_owned(),
                )
            })
    }
}

impl TransformerPlugin for PredictionsTransformer {
    fn name(&self) -> &str {
        "PredictionsTransformer"
    }

    fn directive_definitions(&self) -> &str {
        PREDICTIONS_DIRECTIVE_DEFINITION
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        self.bucket_name()?;

        let type_name = parent.node.name.node.as_str();
        let field_name = field.node.name.node.as_str();
        if type_name != ctx.input_document().query_type_name() {
            return Err(TransformerError::invalid_directive_at(
                format!("@predictions can only be used on Query fields. {type_name}.{field_name} is not one."),
                directive.pos,
            ));
        }
        if field.node.arguments.iter().any(|argument| argument.node.name.node == "input") {
            return Err(TransformerError::invalid_directive_at(
                format!("Query.{field_name} cannot declare an input argument, @predictions generates it."),
                directive.pos,
            ));
        }

        let arguments: PredictionsArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;

        if let Some(last) = arguments.actions.last() {
            let expected = last.return_type();
            let declared = &field.node.ty.node;
            if ast::is_list_type(declared) != ast::is_list_type(&expected)
                || ast::base_type_name(declared) != ast::base_type_name(&expected)
            {
                return Err(TransformerError::invalid_directive_at(
                    format!("Query.{field_name} must return {expected} to end with {last}."),
                    directive.pos,
                ));
            }
        }

        self.fields.push(PredictionsField {
            field_name: field_name.to_owned(),
            actions: arguments.actions,
        });
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let query_type = ctx.output().query_type_name().to_owned();

        for field in &self.fields {
            let mut members = Vec::with_capacity(field.actions.len());
            for (index, action) in field.actions.iter().enumerate() {
                let action_input = field.action_input_type(*action);
                ctx.output_mut().add_type(ast::input_object_type(
                    &action_input,
                    action
                        .input_fields(index > 0)
                        .into_iter()
                        .map(|(name, ty)| ast::input_value(name, ty))
                        .collect(),
                ))?;
                members.push(ast::input_value(&action.to_string(), ast::non_null(ast::named_type(&action_input))));
            }

            let input_type = field.input_type();
            ctx.output_mut().add_type(ast::input_object_type(&input_type, members))?;

            if let Some(output_field) = ctx.output_mut().field_mut(&query_type, &field.field_name) {
                output_field
                    .node
                    .arguments
                    .push(ast::input_value("input", ast::non_null(ast::named_type(&input_type))));
            }
        }
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        if self.fields.is_empty() {
            return Ok(());
        }

        let bucket = self.bucket_name()?.to_owned();
        let query_type = ctx.output().query_type_name().to_owned();

        for field in &self.fields {
            for (index, action) in field.actions.iter().enumerate() {
                let data_source = resources::data_source_for(ctx, *action, &bucket)?;

                ctx.resolvers_mut().add_resolver(
                    ResolverPipeline::pipeline(
                        query_type.as_str(),
                        field.field_name.as_str(),
                        PipelineFunction::new(
                            Some(data_source),
                            templates::request(*action, &bucket, index > 0),
                            templates::response(*action),
                        ),
                    )
                    .in_stack(PREDICTIONS_STACK),
                )?;
            }
            tracing::debug!(
                field_name = %field.field_name,
                actions = field.actions.len(),
                "added predictions resolver"
            );
        }
        Ok(())
    }
}
