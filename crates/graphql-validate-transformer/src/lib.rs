//! `@validate(type, value, errorMessage)` checks mutation input against field constraints.
//!
//! Numeric checks (`gt`, `lt`, `gte`, `lte`) apply to `Int` and `Float` fields, text checks
//! (`minLength`, `maxLength`, `startsWith`, `endsWith`, `matches`) to `String` fields. All
//! validations of a model run in one `preDataLoad` function on its create and update resolvers,
//! and only look at values present in the input.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod rules;

use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer_core::{
    context::{ModelResolverOperation, PipelineFunction, Slot},
    directive::{get_arguments, DirectiveArguments},
    document::{ast, MODEL_DIRECTIVE},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use serde::Deserialize;

pub use rules::{validation_request, Validation, ValidationType};

const VALIDATE_DIRECTIVE_DEFINITION: &str = r"
directive @validate(type: ValidationType!, value: String!, errorMessage: String) repeatable on FIELD_DEFINITION
enum ValidationType {
  gt
  lt
  gte
  lte
  minLength
  maxLength
  startsWith
  endsWith
  matches
}
";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateArguments {
    #[serde(rename = "type")]
    kind: ValidationType,
    value: String,
    error_message: Option<String>,
}

impl DirectiveArguments for ValidateArguments {
    const NAME: &'static str = "validate";

    fn validate(&self) -> Result<(), String> {
        match &self.error_message {
            Some(message) if message.trim().is_empty() => Err("@validate errorMessage must not be empty.".to_owned()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidateTransformer {
    /// `(model, validation)` in declaration order.
    validations: Vec<(String, Validation)>,
}

impl ValidateTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    fn model_names(&self) -> Vec<&str> {
        let mut model_names: Vec<&str> = Vec::new();
        for (model_name, _) in &self.validations {
            if !model_names.contains(&model_name.as_str()) {
                model_names.push(model_name);
            }
        }
        model_names
    }
}

impl TransformerPlugin for ValidateTransformer {
    fn name(&self) -> &str {
        "ValidateTransformer"
    }

    fn directive_definitions(&self) -> &str {
        VALIDATE_DIRECTIVE_DEFINITION
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let model_name = parent.node.name.node.as_str();
        let field_name = field.node.name.node.as_str();
        let invalid = |message: String| TransformerError::invalid_directive_at(message, directive.pos);

        if !ast::has_directive(&parent.node.directives, MODEL_DIRECTIVE) {
            return Err(invalid(format!(
                "@validate on {model_name}.{field_name} requires {model_name} to be annotated with @model."
            )));
        }

        let arguments: ValidateArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;

        let ty = &field.node.ty.node;
        let type_name = ast::base_type_name(ty);
        if ast::is_list_type(ty) {
            return Err(invalid(format!("@validate cannot be used on list field {model_name}.{field_name}.")));
        }
        let type_fits = if arguments.kind.is_numeric() {
            matches!(type_name, "Int" | "Float")
        } else {
            type_name == "String"
        };
        if !type_fits {
            return Err(invalid(format!(
                "A {} validation cannot be used on {model_name}.{field_name} of type {type_name}.",
                arguments.kind
            )));
        }

        let duplicate = self
            .validations
            .iter()
            .any(|(model, existing)| {
                model == model_name && existing.field_name == field_name && existing.kind == arguments.kind
            });
        if duplicate {
            return Err(invalid(format!(
                "{model_name}.{field_name} has more than one {} validation.",
                arguments.kind
            )));
        }

        let validation = Validation {
            field_name: field_name.to_owned(),
            kind: arguments.kind,
            value: arguments.value,
            error_message: arguments.error_message,
        };
        validation.check_value().map_err(invalid)?;

        self.validations.push((model_name.to_owned(), validation));
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for model_name in self.model_names() {
            let validations: Vec<Validation> = self
                .validations
                .iter()
                .filter(|(model, _)| model == model_name)
                .map(|(_, validation)| validation.clone())
                .collect();
            let request = validation_request(&validations);

            for operation in [ModelResolverOperation::Create, ModelResolverOperation::Update] {
                let Some(resolver_field) = ctx.metadata().resolver_field(model_name, operation).cloned() else {
                    continue;
                };
                ctx.resolvers_mut().add_to_slot(
                    &resolver_field.type_name,
                    &resolver_field.field_name,
                    Slot::PreDataLoad,
                    PipelineFunction::local(request.as_str(), "$util.toJson({})\n"),
                )?;
            }
            tracing::debug!(model = model_name, validations = validations.len(), "added input validation");
        }
        Ok(())
    }
}
