//! `@searchable` streams a model's table into an OpenSearch domain and adds a `search` query
//! with full text filters, sorting and aggregations.

#![cfg_attr(test, allow(unused_crate_dependencies))]

pub mod definitions;
pub mod resources;
mod templates;

use async_graphql_parser::{types as parser, Positioned};
use graphql_model_transformer::names::ModelNames;
use graphql_transformer_core::{
    context::{ModelResolverOperation, PipelineFunction, ResolverPipeline},
    directive::{get_arguments_with_defaults, DirectiveArguments},
    document::{ast, MODEL_DIRECTIVE},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use resources::{DATA_SOURCE_NAME, SEARCHABLE_STACK};

const SEARCHABLE_DIRECTIVE_DEFINITION: &str = r"
directive @searchable(queries: SearchableQueryMap) on OBJECT

input SearchableQueryMap {
  search: String
}
";

#[derive(Debug, Deserialize)]
struct SearchableArguments {
    queries: Option<SearchableQueryMap>,
}

#[derive(Debug, Deserialize)]
struct SearchableQueryMap {
    search: Option<String>,
}

impl DirectiveArguments for SearchableArguments {
    const NAME: &'static str = "searchable";
}

/// `searchPosts` for `Post`.
pub fn default_search_query(model_name: &str) -> String {
    format!("search{}", ModelNames::plural(model_name))
}

fn default_arguments(model_name: &str) -> Map<String, Value> {
    let mut defaults = Map::new();
    defaults.insert("queries".to_owned(), json!({ "search": default_search_query(model_name) }));
    defaults
}

#[derive(Debug)]
struct SearchableModel {
    model_name: String,
    search_query: Option<String>,
}

#[derive(Debug, Default)]
pub struct SearchableTransformer {
    models: Vec<SearchableModel>,
}

impl SearchableTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformerPlugin for SearchableTransformer {
    fn name(&self) -> &str {
        "SearchableTransformer"
    }

    fn directive_definitions(&self) -> &str {
        SEARCHABLE_DIRECTIVE_DEFINITION
    }

    fn object(
        &mut self,
        definition: &Positioned<parser::TypeDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let model_name = definition.node.name.node.as_str();
        if !ast::has_directive(&definition.node.directives, MODEL_DIRECTIVE) {
            return Err(TransformerError::invalid_directive_at(
                format!("@searchable can only be used on an @model type. {model_name} is not a model."),
                directive.pos,
            ));
        }

        if !ctx.parameters().allow_gen1_patterns {
            ctx.logger().warn(format!(
                "@searchable on {model_name} is deprecated. Consider a zero-ETL integration with OpenSearch instead."
            ));
        }

        let arguments: SearchableArguments = get_arguments_with_defaults(
            directive,
            default_arguments(model_name),
            ctx.parameters().should_deep_merge_directive_config_defaults,
        )?;

        self.models.push(SearchableModel {
            model_name: model_name.to_owned(),
            search_query: arguments.queries.and_then(|queries| queries.search),
        });
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for model in &self.models {
            let Some(search_query) = &model.search_query else {
                continue;
            };
            let model_name = model.model_name.as_str();

            definitions::add_search_types(ctx.output_mut(), model_name)?;

            let arguments = vec![
                ast::input_value("filter", ast::named_type(&definitions::filter_input(model_name))),
                ast::input_value(
                    "sort",
                    ast::list_of(ast::named_type(&definitions::sort_input(model_name))),
                ),
                ast::input_value("limit", ast::named_type("Int")),
                ast::input_value("nextToken", ast::named_type("String")),
                ast::input_value("from", ast::named_type("Int")),
                ast::input_value(
                    "aggregates",
                    ast::list_of(ast::named_type(&definitions::aggregation_input(model_name))),
                ),
            ];
            ctx.output_mut().add_query_field(ast::field_with_arguments(
                search_query,
                arguments,
                ast::named_type(&definitions::connection(model_name)),
            ))?;

            let query_type = ctx.output().query_type_name().to_owned();
            ctx.metadata_mut()
                .add_resolver_field(model_name, ModelResolverOperation::Search, query_type, search_query.as_str());
        }
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        if self.models.is_empty() {
            return Ok(());
        }
        resources::add_domain(ctx)?;

        for model in &self.models {
            let model_name = model.model_name.as_str();
            resources::add_stream_mapping(ctx, model_name)?;

            let Some(search_query) = &model.search_query else {
                continue;
            };
            let index = ctx.resource_names().get_model_name_mapping(model_name).to_lowercase();
            let sort_field = ctx.keys().primary_key(model_name).partition_key;
            let query_type = ctx.output().query_type_name().to_owned();

            ctx.resolvers_mut().add_resolver(
                ResolverPipeline::pipeline(
                    query_type,
                    search_query.as_str(),
                    PipelineFunction::new(
                        Some(DATA_SOURCE_NAME.to_owned()),
                        templates::search_request(&index, &sort_field),
                        templates::SEARCH_RESPONSE,
                    ),
                )
                .in_stack(SEARCHABLE_STACK),
            )?;
            tracing::debug!(model = model_name, query = %search_query, "added search resolver");
        }
        Ok(())
    }
}
