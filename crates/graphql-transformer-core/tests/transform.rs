#![allow(unused_crate_dependencies)]

use std::sync::{Arc, Mutex};

use async_graphql_parser::{types as ast, Positioned};
use graphql_transformer_core::{
    context::{PipelineFunction, ResolverPipeline},
    document::ast as sdl,
    log::TransformerLogLevel,
    strategy::ModelDataSourceStrategy,
    GraphQLTransform, HookResult, TransformOptions, TransformerContext, TransformerError, TransformerPlugin,
};
use indoc::indoc;
use serde_json::json;

type Calls = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: &'static str,
    definitions: &'static str,
    calls: Calls,
}

impl Recorder {
    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{}:{call}", self.name));
        }
    }
}

impl TransformerPlugin for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn directive_definitions(&self) -> &str {
        self.definitions
    }

    fn before(&mut self, _ctx: &mut TransformerContext) -> HookResult {
        self.record("before".to_owned());
        Ok(())
    }

    fn object(
        &mut self,
        definition: &Positioned<ast::TypeDefinition>,
        directive: &Positioned<ast::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        self.record(format!("object {} @{}", definition.node.name.node, directive.node.name.node));

        if directive.node.name.node == "deprecatedThing" {
            ctx.logger().warn("@deprecatedThing is deprecated");
        }
        Ok(())
    }

    fn field(
        &mut self,
        parent: &Positioned<ast::TypeDefinition>,
        field: &Positioned<ast::FieldDefinition>,
        directive: &Positioned<ast::ConstDirective>,
        _ctx: &mut TransformerContext,
    ) -> HookResult {
        self.record(format!(
            "field {}.{} @{}",
            parent.node.name.node, field.node.name.node, directive.node.name.node
        ));
        Ok(())
    }

    fn transform_schema(&mut self, _ctx: &mut TransformerContext) -> HookResult {
        self.record("transformSchema".to_owned());
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        self.record("generateResolvers".to_owned());

        if self.name == "model" {
            ctx.output_mut()
                .add_query_field(sdl::field("getTodo", sdl::named_type("Todo")))?;
            ctx.resolvers_mut().add_resolver(ResolverPipeline::pipeline(
                "Query",
                "getTodo",
                PipelineFunction::new(Some("TodoTable".to_owned()), "get", "result"),
            ))?;
        }
        Ok(())
    }

    fn after(&mut self, _ctx: &mut TransformerContext) -> HookResult {
        self.record("after".to_owned());
        Ok(())
    }
}

struct Failing;

impl TransformerPlugin for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn directive_definitions(&self) -> &str {
        "directive @failing on OBJECT"
    }

    fn object(
        &mut self,
        definition: &Positioned<ast::TypeDefinition>,
        _directive: &Positioned<ast::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        ctx.logger().info("about to fail");
        Err(TransformerError::invalid_directive_at(
            format!("{} cannot be transformed.", definition.node.name.node),
            definition.pos,
        ))
    }
}

fn recorders(calls: &Calls) -> Vec<Box<dyn TransformerPlugin>> {
    vec![
        Box::new(Recorder {
            name: "model",
            definitions: "directive @model on OBJECT",
            calls: calls.clone(),
        }),
        Box::new(Recorder {
            name: "relational",
            definitions: indoc! {r#"
                directive @hasMany(fields: [String!]) on FIELD_DEFINITION
                directive @deprecatedThing on OBJECT
            "#},
            calls: calls.clone(),
        }),
    ]
}

fn transform(transformers: Vec<Box<dyn TransformerPlugin>>) -> GraphQLTransform {
    GraphQLTransform::new(TransformOptions {
        transformers,
        ..Default::default()
    })
    .unwrap()
}

const SCHEMA: &str = indoc! {r#"
    type Post @deprecatedThing @model {
      id: ID!
      comments: [Comment] @hasMany
    }

    type Comment @model @aws_iam {
      id: ID!
      content: String @deprecated(reason: "unused")
    }
"#};

#[test]
fn hooks_run_per_phase_in_plugin_order() {
    let calls = Calls::default();
    let mut transform = transform(recorders(&calls));

    let outcome = transform.transform(SCHEMA);

    assert!(outcome.result.is_ok());
    insta::assert_debug_snapshot!(calls.lock().unwrap(), @r###"
    [
        "model:before",
        "relational:before",
        "model:object Post @model",
        "model:object Comment @model",
        "relational:object Post @deprecatedThing",
        "relational:field Post.comments @hasMany",
        "model:transformSchema",
        "relational:transformSchema",
        "model:generateResolvers",
        "relational:generateResolvers",
        "model:after",
        "relational:after",
    ]
    "###);
}

#[test]
fn successful_transform_returns_resources_and_logs() {
    let calls = Calls::default();
    let mut transform = transform(recorders(&calls));

    let outcome = transform.transform(SCHEMA);
    let resources = outcome.result.unwrap();

    assert_eq!(outcome.logs.len(), 1);
    assert_eq!(outcome.logs[0].level, TransformerLogLevel::Warn);
    assert!(resources.resolvers.contains_key("Query.getTodo.req.vtl"));
    assert!(resources.root_stack.resources.contains_key("QueryGetTodoResolver"));
    assert!(resources.root_stack.resources.contains_key("GraphQLAPIDefaultApiKey"));
    assert!(resources.schema.contains("type Comment @aws_iam {"));
    assert!(resources.schema.contains("content: String @deprecated(reason: \"unused\")"));
    assert!(!resources.schema.contains("@model"));
}

#[test]
fn failed_transform_returns_no_resources() {
    let mut transform = transform(vec![Box::new(Failing)]);

    let outcome = transform.transform("type Post @failing { id: ID! }");

    assert_eq!(outcome.logs.len(), 1);
    assert_eq!(outcome.logs[0].to_string(), "[INFO] about to fail");
    assert_eq!(
        outcome.result.err().map(|error| error.to_string()).as_deref(),
        Some("Post cannot be transformed.")
    );
}

#[test]
fn unknown_directives_are_rejected() {
    let calls = Calls::default();
    let mut transform = transform(recorders(&calls));

    let error = transform
        .transform("type Post @model @searchable { id: ID! }")
        .into_result()
        .unwrap_err();

    assert_eq!(error.to_string(), r#"Unknown directive "@searchable"."#);
    assert!(!calls.lock().unwrap().iter().any(|call| call.contains("object")));
}

#[test]
fn non_repeatable_directives_may_only_appear_once() {
    let calls = Calls::default();
    let mut transform = transform(recorders(&calls));

    let error = transform
        .transform("type Post @model @model { id: ID! }")
        .into_result()
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        r#"The directive "@model" can only be used once at this location."#
    );
}

#[test]
fn repeatable_directives_may_appear_twice() {
    let calls = Calls::default();
    let mut transformers = recorders(&calls);
    transformers.push(Box::new(Recorder {
        name: "tags",
        definitions: "directive @tag(name: String!) repeatable on OBJECT",
        calls: calls.clone(),
    }));
    let mut transform = transform(transformers);

    let result = transform
        .transform(r#"type Post @model @tag(name: "a") @tag(name: "b") { id: ID! }"#)
        .into_result();

    assert!(result.is_ok());
    let tag_calls = calls.lock().unwrap().iter().filter(|call| *call == "object Post @tag").count();
    assert_eq!(tag_calls, 2);
}

#[test]
fn directives_declared_twice_are_a_configuration_error() {
    let calls = Calls::default();
    let mut transformers = recorders(&calls);
    transformers.push(Box::new(Recorder {
        name: "model-again",
        definitions: "directive @model on OBJECT",
        calls: calls.clone(),
    }));

    let error = GraphQLTransform::new(TransformOptions {
        transformers,
        ..Default::default()
    })
    .err()
    .unwrap();

    assert_eq!(
        error,
        TransformerError::InvalidTransformerConfiguration(
            "Directive @model is declared by more than one transformer.".to_owned()
        )
    );
}

#[test]
fn searchable_on_a_sql_model_is_rejected() {
    let mut transform = GraphQLTransform::new(TransformOptions {
        transformers: vec![Box::new(Recorder {
            name: "model",
            definitions: "directive @model on OBJECT\ndirective @searchable on OBJECT",
            calls: Calls::default(),
        })],
        context: graphql_transformer_core::context::TransformerContextOptions {
            data_source_strategies: serde_json::from_value(json!({
                "Post": {
                    "dbType": "MYSQL",
                    "name": "MySQLStrategy",
                    "dbConnectionConfig": { "connectionUriSsmPath": ["/db/uri"] }
                }
            }))
            .unwrap(),
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();

    let error = transform
        .transform("type Post @model @searchable { id: ID! }")
        .into_result()
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "@searchable directive on Post is not supported on a SQL datasource. Following directives are not supported on a SQL datasource: @searchable, @predictions, @function, @manyToMany, @http, @mapsTo"
    );
}

#[test]
fn dynamo_db_models_may_use_searchable() {
    let mut transform = GraphQLTransform::new(TransformOptions {
        transformers: vec![Box::new(Recorder {
            name: "model",
            definitions: "directive @model on OBJECT\ndirective @searchable on OBJECT",
            calls: Calls::default(),
        })],
        context: graphql_transformer_core::context::TransformerContextOptions {
            data_source_strategies: [("Post".to_owned(), ModelDataSourceStrategy::AmplifyManagedDynamoDb)]
                .into_iter()
                .collect(),
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();

    assert!(transform
        .transform("type Post @model @searchable { id: ID! }")
        .result
        .is_ok());
}

#[test]
fn transform_needs_at_least_one_plugin() {
    let error = GraphQLTransform::new(TransformOptions::default()).err().unwrap();

    assert_eq!(error.to_string(), "Must provide at least one transformer.");
}
