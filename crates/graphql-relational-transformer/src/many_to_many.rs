use async_graphql_parser::{types as parser, Positioned};
use async_graphql_value::ConstValue;
use graphql_transformer_core::{
    context::DEFAULT_PRIMARY_KEY,
    directive::get_arguments,
    document::{ast, SchemaDocument, MODEL_DIRECTIVE},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use indexmap::IndexMap;

use crate::arguments::ManyToManyArguments;

const MANY_TO_MANY_DIRECTIVE_DEFINITION: &str = r"
directive @manyToMany(relationName: String!, limit: Int = 100) on FIELD_DEFINITION
";

const DIRECTIVE_NAME: &str = "manyToMany";

/// One of the two fields of a many-to-many relation.
#[derive(Debug, Clone)]
struct Side {
    model_name: String,
    field_name: String,
    related_model: String,
    pos: async_graphql_parser::Pos,
}

/// Expands every `@manyToMany` pair into a join model with two `@belongsTo` fields, and the two
/// annotated fields into `@hasMany` over that join model.
#[derive(Debug, Default)]
pub struct ManyToManyTransformer {
    join_models: Vec<String>,
}

impl ManyToManyTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join models generated by the last run.
    pub fn join_models(&self) -> &[String] {
        &self.join_models
    }
}

fn collect_sides(
    document: &SchemaDocument,
    deep_merge: bool,
) -> Result<IndexMap<String, Vec<Side>>, TransformerError> {
    let mut relations: IndexMap<String, Vec<Side>> = IndexMap::new();

    for definition in document.types() {
        for field in ast::object_fields(&definition.node) {
            let Some(directive) = ast::find_directive(&field.node.directives, DIRECTIVE_NAME) else {
                continue;
            };
            let model_name = definition.node.name.node.to_string();

            if !ast::has_directive(&definition.node.directives, MODEL_DIRECTIVE) {
                return Err(TransformerError::invalid_directive_at(
                    "@manyToMany must be on an @model object type field.",
                    directive.pos,
                ));
            }
            if !ast::is_list_type(&field.node.ty.node) {
                return Err(TransformerError::invalid_directive_at(
                    "@manyToMany must be used with a list.",
                    directive.pos,
                ));
            }

            let arguments: ManyToManyArguments = get_arguments(directive, deep_merge)?;
            relations.entry(arguments.relation_name).or_default().push(Side {
                model_name,
                field_name: field.node.name.node.to_string(),
                related_model: ast::base_type_name(&field.node.ty.node).to_owned(),
                pos: directive.pos,
            });
        }
    }

    Ok(relations)
}

/// Name and type of the partition key of `model_name`, read from its `@primaryKey` if any.
fn partition_key(document: &SchemaDocument, model_name: &str) -> (String, String) {
    document
        .fields(model_name)
        .iter()
        .find(|field| ast::has_directive(&field.node.directives, "primaryKey"))
        .map(|field| {
            (
                field.node.name.node.to_string(),
                ast::base_type_name(&field.node.ty.node).to_owned(),
            )
        })
        .unwrap_or_else(|| (DEFAULT_PRIMARY_KEY.to_owned(), "ID".to_owned()))
}

fn join_model(
    document: &SchemaDocument,
    join_model_name: &str,
    left: &Side,
    right: &Side,
) -> Positioned<parser::TypeDefinition> {
    let mut fields = vec![ast::field(DEFAULT_PRIMARY_KEY, ast::non_null(ast::named_type("ID")))];
    let mut relation_fields = Vec::new();

    for side in [left, right] {
        let (_, key_type) = partition_key(document, &side.model_name);
        let field_name = ast::lower_first(&side.model_name);
        let foreign_key = format!("{field_name}Id");

        let mut key_field = ast::field(&foreign_key, ast::non_null(ast::named_type(&key_type)));
        key_field.node.directives.push(ast::directive(
            "index",
            vec![("name", ConstValue::String(format!("by{}", side.model_name)))],
        ));
        fields.push(key_field);

        let mut relation_field = ast::field(&field_name, ast::non_null(ast::named_type(&side.model_name)));
        relation_field
            .node
            .directives
            .push(ast::directive("belongsTo", vec![("fields", ast::string_list(&[foreign_key.as_str()]))]));
        relation_fields.push(relation_field);
    }
    fields.extend(relation_fields);

    let mut definition = ast::object_type(join_model_name, fields);
    definition
        .node
        .directives
        .push(ast::directive(MODEL_DIRECTIVE, Vec::new()));
    definition
}

/// Replace `@manyToMany` on `side` with `@hasMany` over the join model.
fn rewrite_side(document: &mut SchemaDocument, side: &Side, join_model_name: &str) -> HookResult {
    let (key_field, _) = partition_key(document, &side.model_name);
    let field = document
        .field_mut(&side.model_name, &side.field_name)
        .ok_or_else(|| TransformerError::schema_validation_at("The @manyToMany field is missing.", side.pos))?;

    let mut ty = ast::list_of(ast::named_type(join_model_name));
    ty.nullable = !ast::is_non_null_type(&field.node.ty.node);
    field.node.ty = ast::positioned(ty);

    field
        .node
        .directives
        .retain(|directive| directive.node.name.node != DIRECTIVE_NAME);
    field.node.directives.push(ast::directive(
        "hasMany",
        vec![
            ("indexName", ConstValue::String(format!("by{}", side.model_name))),
            ("fields", ast::string_list(&[key_field.as_str()])),
        ],
    ));
    Ok(())
}

impl TransformerPlugin for ManyToManyTransformer {
    fn name(&self) -> &str {
        "ManyToManyTransformer"
    }

    fn directive_definitions(&self) -> &str {
        MANY_TO_MANY_DIRECTIVE_DEFINITION
    }

    fn pre_mutate_schema(&mut self, document: &mut SchemaDocument, ctx: &mut TransformerContext) -> HookResult {
        let relations = collect_sides(document, ctx.parameters().should_deep_merge_directive_config_defaults)?;
        self.join_models.clear();

        for (relation_name, sides) in relations {
            let [left, right] = sides.as_slice() else {
                let pos = sides.first().map(|side| side.pos);
                let message = format!("@manyToMany relation '{relation_name}' must be used in exactly two locations.");
                return Err(match pos {
                    Some(pos) => TransformerError::invalid_directive_at(message, pos),
                    None => TransformerError::invalid_directive(message),
                });
            };

            if left.model_name == right.model_name {
                return Err(TransformerError::invalid_directive_at(
                    format!("@manyToMany relation '{relation_name}' must connect two different models."),
                    right.pos,
                ));
            }
            if left.related_model != right.model_name || right.related_model != left.model_name {
                return Err(TransformerError::invalid_directive_at(
                    format!(
                        "@manyToMany relation '{relation_name}' expects {}.{} and {}.{} to reference each other.",
                        left.model_name, left.field_name, right.model_name, right.field_name
                    ),
                    right.pos,
                ));
            }

            let join_model_name = ast::upper_first(&relation_name);
            if document.has_type(&join_model_name) {
                return Err(TransformerError::invalid_directive_at(
                    format!("Blocked creation of join table '{join_model_name}' for @manyToMany because a type with that name already exists."),
                    left.pos,
                ));
            }

            if !ctx.parameters().allow_gen1_patterns {
                ctx.logger().warn(format!(
                    "@manyToMany is deprecated. This functionality will be removed in the next major release. Replace '{relation_name}' with an explicit join model using @hasMany and @belongsTo."
                ));
            }

            let definition = join_model(document, &join_model_name, left, right);
            document.add_type(definition)?;
            rewrite_side(document, left, &join_model_name)?;
            rewrite_side(document, right, &join_model_name)?;

            ctx.metadata_mut()
                .set_join_model(&join_model_name, left.model_name.as_str(), right.model_name.as_str());
            tracing::debug!(
                join_model = %join_model_name,
                left = %left.model_name,
                right = %right.model_name,
                "generated join model"
            );
            self.join_models.push(join_model_name);
        }

        Ok(())
    }
}
