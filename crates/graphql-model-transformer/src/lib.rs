//! The `@model` directive.
//!
//! A type annotated with `@model` gets a backing store, CRUD queries, mutations and subscriptions,
//! the input types those operations take, and one resolver per operation. Which templates the
//! resolvers carry depends on the data source strategy of the model, see [`generator`].

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod arguments;
pub mod definitions;
pub mod generator;
pub mod names;
pub mod resources;

use async_graphql_parser::{types as parser, Positioned};
use async_graphql_value::ConstValue;
use graphql_transformer_core::{
    context::{ModelResolverOperation, PipelineFunction, ResolverPipeline},
    directive::get_arguments_with_defaults,
    document::{ast, SchemaDocument},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use indexmap::IndexMap;

pub use arguments::{ModelArguments, SubscriptionLevel, MODEL_DIRECTIVE_DEFINITION};
pub use generator::{generator_for, ModelVtlGenerator, OperationConfig, RelationLookup, ResolverTemplates};
use names::*;

use crate::definitions::ModelShape;

/// Directive marking a field as part of the primary key. Declared by the index plugin.
const PRIMARY_KEY_DIRECTIVE: &str = "primaryKey";

#[derive(Debug, Default)]
pub struct ModelTransformer {
    models: IndexMap<String, ModelArguments>,
}

impl ModelTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments of every `@model` seen during the visit, in schema order.
    pub fn models(&self) -> &IndexMap<String, ModelArguments> {
        &self.models
    }
}

/// Read the `@model` arguments of `definition`, if it is a model.
pub fn model_arguments(
    definition: &Positioned<parser::TypeDefinition>,
    ctx: &TransformerContext,
) -> Result<Option<ModelArguments>, TransformerError> {
    let Some(directive) = ast::find_directive(&definition.node.directives, "model") else {
        return Ok(None);
    };

    get_arguments_with_defaults(
        directive,
        ModelArguments::defaults_for(&definition.node.name.node),
        ctx.parameters().should_deep_merge_directive_config_defaults,
    )
    .map(Some)
}

impl TransformerPlugin for ModelTransformer {
    fn name(&self) -> &str {
        "ModelTransformer"
    }

    fn directive_definitions(&self) -> &str {
        MODEL_DIRECTIVE_DEFINITION
    }

    fn object(
        &mut self,
        definition: &Positioned<parser::TypeDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let model_name = definition.node.name.node.to_string();

        let document = ctx.input_document();
        let root_types = [
            document.query_type_name(),
            document.mutation_type_name(),
            document.subscription_type_name(),
        ];
        if root_types.contains(&model_name.as_str()) {
            return Err(TransformerError::invalid_directive_at(
                format!("'{model_name}' is a reserved type name and currently in use within the default schema element."),
                directive.pos,
            ));
        }

        let arguments: ModelArguments = get_arguments_with_defaults(
            directive,
            ModelArguments::defaults_for(&model_name),
            ctx.parameters().should_deep_merge_directive_config_defaults,
        )?;

        let fields = ast::object_fields(&definition.node);
        let has_primary_key = fields
            .iter()
            .any(|field| ast::has_directive(&field.node.directives, PRIMARY_KEY_DIRECTIVE));

        if !has_primary_key && ast::find_field(&definition.node, "id").is_none() {
            if let Some(fields) = ctx
                .output_mut()
                .type_definition_mut(&model_name)
                .and_then(|definition| ast::object_fields_mut(&mut definition.node))
            {
                fields.insert(0, ast::field("id", ast::non_null(ast::named_type("ID"))));
            }
        }

        for timestamp in [arguments.created_at(), arguments.updated_at()].into_iter().flatten() {
            let field = ast::field(timestamp, ast::non_null(ast::named_type("AWSDateTime")));
            ctx.output_mut().add_field_if_absent(&model_name, field)?;
        }

        if ctx.sync_config_for(&model_name).is_some() && !ctx.is_sql_model(&model_name) {
            ctx.metadata_mut().set_sync_enabled(&model_name);
            let output = ctx.output_mut();
            output.add_field_if_absent(
                &model_name,
                ast::field(SYNC_FIELD_VERSION, ast::non_null(ast::named_type("Int"))),
            )?;
            output.add_field_if_absent(&model_name, ast::field(SYNC_FIELD_DELETED, ast::named_type("Boolean")))?;
            output.add_field_if_absent(
                &model_name,
                ast::field(SYNC_FIELD_LAST_CHANGED_AT, ast::non_null(ast::named_type("AWSTimestamp"))),
            )?;
        }

        tracing::debug!(model = %model_name, "registered model");
        self.models.insert(model_name, arguments);
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for (model_name, arguments) in &self.models {
            if ctx.is_sql_model(model_name)
                && !ctx.keys().has_custom_primary_key(model_name)
                && !has_id_field(ctx.output(), model_name)
            {
                return Err(TransformerError::invalid_directive(format!(
                    "SQL model \"{model_name}\" must define a primary key with @primaryKey."
                )));
            }

            let key = ctx.keys().primary_key(model_name);
            let sync_enabled = ctx.metadata().is_sync_enabled(model_name);
            let fields = ctx.output().fields(model_name).to_vec();

            let shape = ModelShape {
                model_name,
                fields,
                key: &key,
                sync_enabled,
                timestamps: [arguments.created_at(), arguments.updated_at()],
            };
            definitions::add_model_types(ctx.output_mut(), &shape)?;

            add_query_fields(ctx, &shape, arguments)?;
            add_mutation_fields(ctx, model_name, arguments)?;
            add_subscription_fields(ctx, model_name, arguments)?;
        }

        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for (model_name, arguments) in &self.models {
            let strategy = ctx.strategy_for(model_name).clone();
            match strategy.as_sql() {
                Some(sql) => resources::add_sql_lambda(ctx, sql)?,
                None => resources::add_model_table(ctx, model_name)?,
            }

            let generator = generator_for(&strategy);
            let data_source = generator.data_source_name(model_name);
            let config = OperationConfig::new(ctx, model_name)
                .with_timestamps(arguments.created_at(), arguments.updated_at());
            let stack = if strategy.is_sql() {
                resources::SQL_STACK.to_owned()
            } else {
                ModelNames::stack(model_name)
            };

            let fields = ctx.metadata().resolver_fields(model_name).to_vec();
            for field in fields.into_iter().filter(|field| field.operation.is_model_owned()) {
                let templates = generator.generate(field.operation, &config)?;
                let function = if field.operation.is_subscription() {
                    PipelineFunction::local(templates.request, templates.response)
                } else {
                    PipelineFunction::new(Some(data_source.clone()), templates.request, templates.response)
                };
                ctx.resolvers_mut().add_resolver(
                    ResolverPipeline::pipeline(field.type_name, field.field_name, function).in_stack(stack.clone()),
                )?;
            }
        }

        Ok(())
    }
}

fn has_id_field(document: &SchemaDocument, model_name: &str) -> bool {
    document.field(model_name, "id").is_some()
}

fn add_query_fields(ctx: &mut TransformerContext, shape: &ModelShape<'_>, arguments: &ModelArguments) -> HookResult {
    let model_name = shape.model_name;
    let query_type = ctx.output().query_type_name().to_owned();

    if let Some(get_query) = arguments.get_query() {
        let key_arguments = shape
            .key
            .fields()
            .map(|field_name| ast::input_value(field_name, shape.key_field_type(field_name)))
            .collect();
        ctx.output_mut()
            .add_query_field(ast::field_with_arguments(get_query, key_arguments, ast::named_type(model_name)))?;
        ctx.metadata_mut()
            .add_resolver_field(model_name, ModelResolverOperation::Get, &query_type, get_query);
    }

    if let Some(list_query) = arguments.list_query() {
        let mut list_arguments = Vec::new();
        if let Some(sort_key) = definitions::add_sort_key_condition(ctx.output_mut(), shape, shape.key) {
            let partition = &shape.key.partition_key;
            list_arguments.push(ast::input_value(partition, ast::nullable(shape.key_field_type(partition))));
            list_arguments.push(sort_key);
        }
        list_arguments.extend(connection_arguments(model_name));
        if shape.key.sort_key_attribute().is_some() {
            list_arguments.push(ast::input_value(INPUT_ARG_SORT_DIRECTION, ast::named_type(SORT_DIRECTION_TYPE)));
        }

        ctx.output_mut().add_query_field(ast::field_with_arguments(
            list_query,
            list_arguments,
            ast::named_type(&ModelNames::connection(model_name)),
        ))?;
        ctx.metadata_mut()
            .add_resolver_field(model_name, ModelResolverOperation::List, &query_type, list_query);
    }

    if shape.sync_enabled {
        let sync_query = ModelNames::sync_query(model_name);
        let mut sync_arguments = connection_arguments(model_name);
        sync_arguments.push(ast::input_value(INPUT_ARG_LAST_SYNC, ast::named_type("AWSTimestamp")));
        ctx.output_mut().add_query_field(ast::field_with_arguments(
            &sync_query,
            sync_arguments,
            ast::named_type(&ModelNames::connection(model_name)),
        ))?;
        ctx.metadata_mut()
            .add_resolver_field(model_name, ModelResolverOperation::Sync, &query_type, sync_query);
    }

    Ok(())
}

/// `filter`, `limit` and `nextToken`, the arguments of every paginated model query.
pub fn connection_arguments(model_name: &str) -> Vec<Positioned<parser::InputValueDefinition>> {
    vec![
        ast::input_value(INPUT_ARG_FILTER, ast::named_type(&ModelNames::filter_input(model_name))),
        ast::input_value(INPUT_ARG_LIMIT, ast::named_type("Int")),
        ast::input_value(INPUT_ARG_NEXT_TOKEN, ast::named_type("String")),
    ]
}

fn add_mutation_fields(ctx: &mut TransformerContext, model_name: &str, arguments: &ModelArguments) -> HookResult {
    let mutation_type = ctx.output().mutation_type_name().to_owned();

    let mutations = [
        (arguments.create_mutation(), ModelResolverOperation::Create, ModelNames::create_input(model_name)),
        (arguments.update_mutation(), ModelResolverOperation::Update, ModelNames::update_input(model_name)),
        (arguments.delete_mutation(), ModelResolverOperation::Delete, ModelNames::delete_input(model_name)),
    ];

    for (field_name, operation, input) in mutations {
        let Some(field_name) = field_name else { continue };

        let field = ast::field_with_arguments(
            field_name,
            vec![
                ast::input_value(INPUT_ARG_INPUT, ast::non_null(ast::named_type(&input))),
                ast::input_value(INPUT_ARG_CONDITION, ast::named_type(&ModelNames::condition_input(model_name))),
            ],
            ast::named_type(model_name),
        );
        ctx.output_mut().add_mutation_field(field)?;
        ctx.metadata_mut()
            .add_resolver_field(model_name, operation, &mutation_type, field_name);
    }

    Ok(())
}

fn add_subscription_fields(ctx: &mut TransformerContext, model_name: &str, arguments: &ModelArguments) -> HookResult {
    let Some(subscriptions) = arguments
        .subscriptions
        .as_ref()
        .filter(|subscriptions| subscriptions.level != SubscriptionLevel::Off)
    else {
        return Ok(());
    };
    let subscription_type = ctx.output().subscription_type_name().to_owned();

    let subscribed = [
        (&subscriptions.on_create, arguments.create_mutation(), ModelResolverOperation::OnCreate),
        (&subscriptions.on_update, arguments.update_mutation(), ModelResolverOperation::OnUpdate),
        (&subscriptions.on_delete, arguments.delete_mutation(), ModelResolverOperation::OnDelete),
    ];

    for (names, mutation, operation) in subscribed {
        let (Some(names), Some(mutation)) = (names, mutation) else {
            continue;
        };

        for field_name in names {
            let mut field = ast::field_with_arguments(
                field_name,
                vec![ast::input_value(
                    INPUT_ARG_FILTER,
                    ast::named_type(&ModelNames::filter_input(model_name)),
                )],
                ast::named_type(model_name),
            );
            field.node.directives.push(ast::directive(
                "aws_subscribe",
                vec![("mutations", ConstValue::List(vec![ConstValue::String(mutation.to_owned())]))],
            ));
            ctx.output_mut().add_subscription_field(field)?;
            ctx.metadata_mut()
                .add_resolver_field(model_name, operation, &subscription_type, field_name.as_str());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use graphql_transformer_core::{GraphQLTransform, TransformOptions};
    use indoc::indoc;

    use super::*;

    fn transform(schema: &str) -> graphql_transformer_core::DeploymentResources {
        let mut transform = GraphQLTransform::new(TransformOptions {
            transformers: vec![Box::new(ModelTransformer::new())],
            ..Default::default()
        })
        .unwrap();
        transform.transform(schema).into_result().unwrap()
    }

    #[test]
    fn ids_and_timestamps_are_added() {
        let output = transform("type Todo @model { content: String }");

        let expected = "type Todo {\n  id: ID!\n  content: String\n  createdAt: AWSDateTime!\n  updatedAt: AWSDateTime!\n}";
        assert!(output.schema.contains(expected));
    }

    #[test]
    fn disabled_sections_generate_nothing() {
        let output = transform(indoc! {r"
            type Todo @model(mutations: null, subscriptions: null) {
              id: ID!
            }
        "});

        assert!(output.resolvers.contains_key("Query.getTodo.req.vtl"));
        assert!(!output.resolvers.contains_key("Mutation.createTodo.req.vtl"));
        assert!(!output.schema.contains("type Subscription"));
    }

    #[test]
    fn root_types_cannot_be_models() {
        let mut transform = GraphQLTransform::new(TransformOptions {
            transformers: vec![Box::new(ModelTransformer::new())],
            ..Default::default()
        })
        .unwrap();

        let error = transform
            .transform("type Query @model { id: ID! }")
            .into_result()
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "'Query' is a reserved type name and currently in use within the default schema element."
        );
    }
}
