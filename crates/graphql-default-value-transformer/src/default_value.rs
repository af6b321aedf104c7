use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer_core::{
    context::{ModelResolverOperation, PipelineFunction, Slot},
    directive::{get_arguments, DirectiveArguments},
    document::{ast, MODEL_DIRECTIVE},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use serde::Deserialize;

use crate::{
    coercion::{literal, validate_default_value},
    sequence::{check_sequence_field, SEQUENCE_DIRECTIVE},
};

const DEFAULT_DIRECTIVE_DEFINITION: &str = r"
directive @default(value: String!) on FIELD_DEFINITION
directive @sequence on FIELD_DEFINITION
";

#[derive(Debug, Deserialize)]
struct DefaultArguments {
    value: String,
}

impl DirectiveArguments for DefaultArguments {
    const NAME: &'static str = "default";
}

#[derive(Debug, Clone)]
struct DefaultField {
    model_name: String,
    field_name: String,
    /// VTL literal of the value.
    literal: String,
}

/// Handles both `@default` and `@sequence`, the two ways a create mutation may leave a field out.
#[derive(Debug, Default)]
pub struct DefaultValueTransformer {
    fields: Vec<DefaultField>,
    /// `(model, field)` pairs filled in by a Postgres sequence.
    sequences: Vec<(String, String)>,
}

impl DefaultValueTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformerPlugin for DefaultValueTransformer {
    fn name(&self) -> &str {
        "DefaultValueTransformer"
    }

    fn directive_definitions(&self) -> &str {
        DEFAULT_DIRECTIVE_DEFINITION
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
        let ty = &field.node.ty.node;
        let type_name = ast::base_type_name(ty);
        let input = ctx.input_document();

        let directive_name = directive.node.name.node.as_str();
        if !ast::has_directive(&parent.node.directives, MODEL_DIRECTIVE) {
            return Err(TransformerError::invalid_directive_at(
                format!("The @{directive_name} directive may only be added to object definitions annotated with @model."),
                directive.pos,
            ));
        }
        if ast::has_directive(&field.node.directives, "default")
            && ast::has_directive(&field.node.directives, SEQUENCE_DIRECTIVE)
        {
            return Err(TransformerError::invalid_directive_at(
                format!("{model_name}.{field_name} cannot have both @default and @sequence."),
                directive.pos,
            ));
        }
        if directive_name == SEQUENCE_DIRECTIVE {
            check_sequence_field(model_name, field, directive, ctx)?;
            self.sequences.push((model_name.to_owned(), field_name.to_owned()));
            return Ok(());
        }
        if ast::is_list_type(ty) {
            return Err(TransformerError::invalid_directive_at(
                format!("The @default directive cannot be used on list field {model_name}.{field_name}."),
                directive.pos,
            ));
        }
        if !ast::is_scalar(type_name) && !input.is_enum(type_name) {
            return Err(TransformerError::invalid_directive_at(
                "The @default directive may only be added to scalar or enum field types.",
                directive.pos,
            ));
        }

        let arguments: DefaultArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;
        validate_default_value(&input, type_name, &arguments.value)
            .map_err(|message| TransformerError::invalid_directive_at(message, directive.pos))?;

        self.fields.push(DefaultField {
            model_name: model_name.to_owned(),
            field_name: field_name.to_owned(),
            literal: literal(type_name, &arguments.value),
        });
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for field in &self.fields {
            crate::make_create_input_optional(ctx, &field.model_name, &field.field_name)?;
        }
        for (model_name, field_name) in &self.sequences {
            crate::make_create_input_optional(ctx, model_name, field_name)?;
        }
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let mut model_names: Vec<&str> = self.fields.iter().map(|field| field.model_name.as_str()).collect();
        model_names.dedup();

        for model_name in model_names {
            let Some(create) = ctx
                .metadata()
                .resolver_field(model_name, ModelResolverOperation::Create)
                .cloned()
            else {
                continue;
            };

            let mut request = String::new();
            for field in self.fields.iter().filter(|field| field.model_name == model_name) {
                request.push_str(&format!(
                    "#if( $util.isNull($ctx.args.input.{name}) )\n  \
                     $util.qr($ctx.args.input.put(\"{name}\", {literal}))\n\
                     #end\n",
                    name = field.field_name,
                    literal = field.literal,
                ));
            }
            request.push_str("$util.toJson({})\n");

            ctx.resolvers_mut().add_to_slot(
                &create.type_name,
                &create.field_name,
                Slot::Init,
                PipelineFunction::local(request, "$util.toJson({})\n"),
            )?;
            tracing::debug!(model = model_name, "added default values to the create resolver");
        }
        Ok(())
    }
}
