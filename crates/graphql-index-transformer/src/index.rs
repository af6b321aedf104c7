use async_graphql_parser::{types as parser, Positioned};
use graphql_model_transformer::{
    connection_arguments,
    definitions::{self, ModelShape},
    generator_for,
    names::{ModelNames, INPUT_ARG_SORT_DIRECTION, SORT_DIRECTION_TYPE},
    resources::SQL_STACK,
    OperationConfig,
};
use graphql_transformer_core::{
    context::{KeyDefinition, ModelResolverOperation, PipelineFunction, ResolverPipeline, SecondaryIndex},
    directive::{get_arguments, DirectiveArguments},
    document::ast,
    HookResult, TransformerContext, TransformerPlugin,
};
use inflector::Inflector;
use serde::Deserialize;

const INDEX_DIRECTIVE_DEFINITION: &str = r"
directive @index(name: String, sortKeyFields: [String], queryField: String) repeatable on FIELD_DEFINITION
";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexArguments {
    name: Option<String>,
    #[serde(default)]
    sort_key_fields: Vec<String>,
    query_field: Option<String>,
}

impl DirectiveArguments for IndexArguments {
    const NAME: &'static str = "index";

    fn validate(&self) -> Result<(), String> {
        match &self.name {
            Some(name) if name.is_empty() => Err("@index name must not be empty.".to_owned()),
            _ => Ok(()),
        }
    }
}

/// `todosByStatusAndCreatedAt`: the model's plural followed by the key fields.
fn default_index_name(model_name: &str, key: &KeyDefinition) -> String {
    let fields: Vec<_> = key.fields().map(ast::upper_first).collect();
    format!("{}By{}", ast::lower_first(&model_name.to_plural()), fields.join("And"))
}

/// `listTodoByStatusAndCreatedAt`, generated when an index leaves out `queryField`.
fn default_query_field(model_name: &str, key: &KeyDefinition) -> String {
    let fields: Vec<_> = key.fields().map(ast::upper_first).collect();
    format!("list{model_name}By{}", fields.join("And"))
}

#[derive(Debug, Default)]
pub struct IndexTransformer {
    indexes: Vec<(String, SecondaryIndex)>,
}

impl IndexTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformerPlugin for IndexTransformer {
    fn name(&self) -> &str {
        "IndexTransformer"
    }

    fn directive_definitions(&self) -> &str {
        INDEX_DIRECTIVE_DEFINITION
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let arguments: IndexArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;
        let model_name = parent.node.name.node.as_str();

        super::validate_key_fields(&ctx.input_document(), parent, field, directive, &arguments.sort_key_fields)?;

        let key = KeyDefinition::new(field.node.name.node.as_str(), arguments.sort_key_fields);
        let name = arguments
            .name
            .unwrap_or_else(|| default_index_name(model_name, &key));
        let query_field = arguments.query_field.or_else(|| {
            ctx.parameters()
                .enable_auto_index_query_names
                .then(|| default_query_field(model_name, &key))
        });

        self.indexes.push((model_name.to_owned(), SecondaryIndex { name, key, query_field }));
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for (model_name, index) in &self.indexes {
            tracing::debug!(model = %model_name, index = %index.name, "registered secondary index");
            ctx.keys_mut().add_index(model_name, index.clone())?;
        }
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for (model_name, index) in &self.indexes {
            let Some(query_field) = &index.query_field else {
                continue;
            };

            let shape = ModelShape {
                model_name,
                fields: ctx.output().fields(model_name).to_vec(),
                key: &index.key,
                sync_enabled: ctx.metadata().is_sync_enabled(model_name),
                timestamps: [None, None],
            };

            let partition = &index.key.partition_key;
            let mut arguments = vec![ast::input_value(partition, shape.key_field_type(partition))];
            if let Some(sort_key) = definitions::add_sort_key_condition(ctx.output_mut(), &shape, &index.key) {
                arguments.push(sort_key);
            }
            arguments.push(ast::input_value(INPUT_ARG_SORT_DIRECTION, ast::named_type(SORT_DIRECTION_TYPE)));
            arguments.extend(connection_arguments(model_name));

            ctx.output_mut().add_query_field(ast::field_with_arguments(
                query_field,
                arguments,
                ast::named_type(&ModelNames::connection(model_name)),
            ))?;

            let query_type = ctx.output().query_type_name().to_owned();
            ctx.metadata_mut()
                .add_resolver_field(model_name, ModelResolverOperation::IndexQuery, query_type, query_field.as_str());
        }
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for (model_name, index) in &self.indexes {
            let Some(query_field) = &index.query_field else {
                continue;
            };

            let strategy = ctx.strategy_for(model_name).clone();
            let generator = generator_for(&strategy);
            let config = OperationConfig::new(ctx, model_name);
            let templates = generator.index_query(&config, index);
            let stack = if strategy.is_sql() {
                SQL_STACK.to_owned()
            } else {
                ModelNames::stack(model_name)
            };

            let query_type = ctx.output().query_type_name().to_owned();
            ctx.resolvers_mut().add_resolver(
                ResolverPipeline::pipeline(
                    query_type,
                    query_field.as_str(),
                    PipelineFunction::new(
                        Some(generator.data_source_name(model_name)),
                        templates.request,
                        templates.response,
                    ),
                )
                .in_stack(stack),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::partition_only("Todo", &[], "todosByStatus", "listTodoByStatus")]
    #[case::with_sort_key(
        "Category",
        &["createdAt"],
        "categoriesByStatusAndCreatedAt",
        "listCategoryByStatusAndCreatedAt"
    )]
    fn default_names(
        #[case] model_name: &str,
        #[case] sort_key_fields: &[&str],
        #[case] index_name: &str,
        #[case] query_field: &str,
    ) {
        let key = KeyDefinition::new(
            "status",
            sort_key_fields.iter().map(|field| (*field).to_owned()).collect(),
        );

        assert_eq!(default_index_name(model_name, &key), index_name);
        assert_eq!(default_query_field(model_name, &key), query_field);
    }
}
