use graphql_transformer_core::{
    directive::{get_arguments, DirectiveArguments},
    document::{ast, SchemaDocument, MODEL_DIRECTIVE},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use indexmap::IndexMap;
use serde::Deserialize;

const REFERS_TO_DIRECTIVE_DEFINITION: &str = r"
directive @refersTo(name: String!) on OBJECT | FIELD_DEFINITION
";

#[derive(Debug, Deserialize)]
struct RefersToArguments {
    name: String,
}

impl DirectiveArguments for RefersToArguments {
    const NAME: &'static str = "refersTo";

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("@refersTo name must not be empty.".to_owned());
        }
        Ok(())
    }
}

/// Table and column names of SQL models. The SQL Lambda receives the column mapping with every
/// request, so the resolvers need no extra slots.
#[derive(Debug, Default)]
pub struct RefersToTransformer;

impl RefersToTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl TransformerPlugin for RefersToTransformer {
    fn name(&self) -> &str {
        "RefersToTransformer"
    }

    fn directive_definitions(&self) -> &str {
        REFERS_TO_DIRECTIVE_DEFINITION
    }

    fn pre_mutate_schema(&mut self, document: &mut SchemaDocument, ctx: &mut TransformerContext) -> HookResult {
        let deep_merge = ctx.parameters().should_deep_merge_directive_config_defaults;

        for definition in document.types() {
            let type_name = definition.node.name.node.as_str();
            let is_model = ast::has_directive(&definition.node.directives, MODEL_DIRECTIVE);

            if let Some(directive) = ast::find_directive(&definition.node.directives, "refersTo") {
                let arguments: RefersToArguments = get_arguments(directive, deep_merge)?;
                if !is_model || !ctx.is_sql_model(type_name) {
                    return Err(TransformerError::invalid_directive_at(
                        format!("@refersTo is only supported on SQL models. {type_name} is not a SQL model."),
                        directive.pos,
                    ));
                }
                tracing::debug!(model = type_name, table = %arguments.name, "model refers to table");
                ctx.resource_names_mut().set_model_name_mapping(type_name, arguments.name);
            }

            // Column name to the field claiming it.
            let mut columns: IndexMap<String, String> = IndexMap::new();
            for field in ast::object_fields(&definition.node) {
                let field_name = field.node.name.node.as_str();
                let Some(directive) = ast::find_directive(&field.node.directives, "refersTo") else {
                    continue;
                };
                let arguments: RefersToArguments = get_arguments(directive, deep_merge)?;

                if !is_model || !ctx.is_sql_model(type_name) {
                    return Err(TransformerError::invalid_directive_at(
                        format!("@refersTo on {type_name}.{field_name} is only supported on fields of SQL models."),
                        directive.pos,
                    ));
                }
                if let Some(other) = columns.get(&arguments.name) {
                    return Err(TransformerError::invalid_directive_at(
                        format!(
                            "Fields {other} and {field_name} of {type_name} both refer to column {}.",
                            arguments.name
                        ),
                        directive.pos,
                    ));
                }
                let shadows_field = ast::find_field(&definition.node, &arguments.name).is_some_and(|other| {
                    other.node.name.node != field.node.name.node
                        && !ast::has_directive(&other.node.directives, "refersTo")
                });
                if shadows_field {
                    return Err(TransformerError::invalid_directive_at(
                        format!(
                            "Field {field_name} of {type_name} cannot refer to column {column} because {column} is also a field of {type_name}.",
                            column = arguments.name
                        ),
                        directive.pos,
                    ));
                }

                ctx.resource_names_mut()
                    .set_field_name_mapping(type_name, field_name, arguments.name.as_str());
                columns.insert(arguments.name, field_name.to_owned());
            }
        }
        Ok(())
    }
}
