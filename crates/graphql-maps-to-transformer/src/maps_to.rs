use async_graphql_parser::{types as parser, Positioned};
use graphql_relational_transformer::implicit_foreign_key;
use graphql_transformer_core::{
    directive::{get_arguments, DirectiveArguments},
    document::{ast, SchemaDocument, MODEL_DIRECTIVE},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::field_mapping::attach_field_mapping_slots;

const MAPS_TO_DIRECTIVE_DEFINITION: &str = r"
directive @mapsTo(name: String!) on OBJECT
";

#[derive(Debug, Deserialize)]
struct MapsToArguments {
    name: String,
}

impl DirectiveArguments for MapsToArguments {
    const NAME: &'static str = "mapsTo";

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("@mapsTo name must not be empty.".to_owned());
        }
        Ok(())
    }
}

/// Keeps renamed models on their original tables.
///
/// Implicit foreign keys derived from a renamed model's name change with it, so records written
/// before the rename are translated by field mapping slots on every resolver reading or writing them.
#[derive(Debug, Default)]
pub struct MapsToTransformer {
    /// GraphQL model name to original name.
    renamed: IndexMap<String, String>,
}

impl MapsToTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_mapping(
        definition: &Positioned<parser::TypeDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        document: &SchemaDocument,
        ctx: &TransformerContext,
    ) -> Result<String, TransformerError> {
        let type_name = definition.node.name.node.as_str();
        let arguments: MapsToArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;

        if !ast::has_directive(&definition.node.directives, MODEL_DIRECTIVE) {
            return Err(TransformerError::invalid_directive_at(
                format!("@mapsTo can only be used on an @model type. {type_name} is not a model."),
                directive.pos,
            ));
        }
        if arguments.name != type_name && document.has_type(&arguments.name) {
            return Err(TransformerError::invalid_directive_at(
                format!(
                    "Type {type_name} cannot be mapped to {original} because {original} is also defined in the schema.",
                    original = arguments.name
                ),
                directive.pos,
            ));
        }

        Ok(arguments.name)
    }
}

/// The model whose name the implicit key `field_name` was derived from, among `candidates`.
fn key_owner<'a>(candidates: [&'a str; 2], field_name: &str, relation_field: &str) -> Option<&'a str> {
    candidates
        .into_iter()
        .find(|candidate| implicit_foreign_key(candidate, relation_field) == field_name)
}

impl TransformerPlugin for MapsToTransformer {
    fn name(&self) -> &str {
        "MapsToTransformer"
    }

    fn directive_definitions(&self) -> &str {
        MAPS_TO_DIRECTIVE_DEFINITION
    }

    fn pre_mutate_schema(&mut self, document: &mut SchemaDocument, ctx: &mut TransformerContext) -> HookResult {
        for definition in document.types() {
            let Some(directive) = ast::find_directive(&definition.node.directives, "mapsTo") else {
                continue;
            };
            let original = Self::read_mapping(definition, directive, document, ctx)?;
            let type_name = definition.node.name.node.to_string();

            tracing::debug!(model = %type_name, original = %original, "model keeps its original table");
            ctx.resource_names_mut().set_model_name_mapping(type_name.as_str(), original.as_str());
            self.renamed.insert(type_name, original);
        }
        Ok(())
    }

    fn after(&mut self, ctx: &mut TransformerContext) -> HookResult {
        if self.renamed.is_empty() {
            return Ok(());
        }

        let model_names: Vec<String> = ctx.output().model_names().map(str::to_owned).collect();

        let mut mappings: IndexMap<String, Vec<(String, String)>> = IndexMap::new();
        for model_name in &model_names {
            for foreign_key in ctx.metadata().implicit_foreign_keys(model_name) {
                let Some(owner) = key_owner(
                    [model_name.as_str(), foreign_key.related_model.as_str()],
                    &foreign_key.field_name,
                    &foreign_key.relation_field,
                ) else {
                    continue;
                };
                let Some(original) = self.renamed.get(owner) else {
                    continue;
                };
                mappings.entry(model_name.clone()).or_default().push((
                    foreign_key.field_name.clone(),
                    implicit_foreign_key(original, &foreign_key.relation_field),
                ));
            }
        }

        for (model_name, model_mappings) in &mappings {
            for (field_name, attribute) in model_mappings {
                ctx.resource_names_mut()
                    .set_field_name_mapping(model_name.as_str(), field_name.as_str(), attribute.as_str());
            }

            for resolver_field in ctx.metadata().resolver_fields(model_name).to_vec() {
                if resolver_field.operation.is_subscription()
                    || !ctx
                        .resolvers()
                        .has_resolver(&resolver_field.type_name, &resolver_field.field_name)
                {
                    continue;
                }
                attach_field_mapping_slots(
                    ctx,
                    &resolver_field.type_name,
                    &resolver_field.field_name,
                    model_mappings,
                    resolver_field.operation.is_mutation(),
                )?;
            }

            // Relations returning the mapped model read the same records.
            let input = ctx.input_document();
            for parent in &model_names {
                for relation_field in ctx.metadata().relational_fields(parent).to_vec() {
                    let returns_model = input
                        .field(parent, &relation_field)
                        .is_some_and(|field| ast::base_type_name(&field.node.ty.node) == model_name.as_str());
                    if returns_model && ctx.resolvers().has_resolver(parent, &relation_field) {
                        attach_field_mapping_slots(ctx, parent, &relation_field, model_mappings, false)?;
                    }
                }
            }
        }

        Ok(())
    }
}
