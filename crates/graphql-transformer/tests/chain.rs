#![allow(unused_crate_dependencies)]

use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer::{construct_transformer_chain, execute_transform, TransformConfig, TransformerChainOptions};
use graphql_transformer_core::{log::TransformerLogLevel, HookResult, TransformerContext, TransformerPlugin};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

struct AuditTransformer;

impl TransformerPlugin for AuditTransformer {
    fn name(&self) -> &str {
        "AuditTransformer"
    }

    fn directive_definitions(&self) -> &str {
        "directive @audit on OBJECT"
    }

    fn object(
        &mut self,
        definition: &Positioned<parser::TypeDefinition>,
        _directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        ctx.logger().info(format!("auditing {}", definition.node.name.node));
        Ok(())
    }
}

#[test]
fn default_chain_has_a_fixed_length() {
    let names: Vec<String> = construct_transformer_chain(TransformerChainOptions::default())
        .iter()
        .map(|transformer| transformer.name().to_owned())
        .collect();

    assert_eq!(
        names,
        [
            "ModelTransformer",
            "FunctionTransformer",
            "HttpTransformer",
            "PredictionsTransformer",
            "PrimaryKeyTransformer",
            "IndexTransformer",
            "HasManyTransformer",
            "HasOneTransformer",
            "ManyToManyTransformer",
            "BelongsToTransformer",
            "DefaultValueTransformer",
            "AuthTransformer",
            "MapsToTransformer",
            "SqlTransformer",
            "RefersToTransformer",
            "ValidateTransformer",
            "SearchableTransformer",
        ]
    );
}

#[test]
fn custom_transformers_are_appended() {
    let chain = construct_transformer_chain(TransformerChainOptions {
        custom_transformers: vec![Box::new(AuditTransformer), Box::new(AuditTransformer)],
        ..Default::default()
    });

    assert_eq!(chain.len(), 19);
    assert_eq!(chain[17].name(), "AuditTransformer");
}

#[test]
fn simple_model() {
    let output = execute_transform(
        "type Todo @model { id: ID! name: String! description: String }",
        &TransformConfig::default(),
        Vec::new(),
    )
    .into_result()
    .unwrap();

    assert!(output.schema.contains("type Todo {"));
    assert!(!output.schema.contains("@model"));
    assert!(output.resolvers.contains_key("Query.getTodo.req.vtl"));
    assert!(output.resolvers.contains_key("Mutation.deleteTodo.req.vtl"));
    assert!(output.stacks["Todo"].resources.contains_key("TodoTable"));
}

#[test]
fn directives_compose() {
    let schema = indoc! {r#"
        type Post @model @auth(rules: [{ allow: owner }]) {
          id: ID!
          title: String! @validate(type: minLength, value: "3")
          status: String @default(value: "draft")
          comments: [Comment] @hasMany
        }

        type Comment @model @auth(rules: [{ allow: owner }]) {
          id: ID!
          content: String
        }
    "#};
    let config: TransformConfig = serde_json::from_value(json!({
        "authConfig": { "defaultAuthentication": { "authenticationType": "AMAZON_COGNITO_USER_POOLS" } }
    }))
    .unwrap();

    let output = execute_transform(schema, &config, Vec::new()).into_result().unwrap();

    assert!(output.resolvers.contains_key("Mutation.createPost.auth.1.req.vtl"));
    assert!(output.resolvers.contains_key("Mutation.createPost.init.1.req.vtl"));
    assert!(output.resolvers.contains_key("Mutation.createPost.preDataLoad.1.req.vtl"));
    assert!(output.resolvers.contains_key("Post.comments.req.vtl"));
    assert!(output.resolvers.contains_key("Post.comments.auth.1.req.vtl"));
    assert!(output.schema.contains("postCommentsId: ID"));
}

#[test]
fn custom_transformer_logs_are_returned() {
    let outcome = execute_transform(
        "type Todo @model @audit { id: ID! }",
        &TransformConfig::default(),
        vec![Box::new(AuditTransformer)],
    );

    assert!(outcome
        .logs
        .iter()
        .any(|log| log.level == TransformerLogLevel::Info && log.message == "auditing Todo"));
    assert!(outcome.result.is_ok());
}

#[test]
fn unknown_directives_fail() {
    let error = execute_transform("type Todo @model @audit { id: ID! }", &TransformConfig::default(), Vec::new())
        .into_result()
        .unwrap_err();

    assert_eq!(error.to_string(), "Unknown directive \"@audit\".");
}

#[test]
fn predictions_use_the_configured_bucket() {
    let schema = indoc! {r#"
        type Query {
          recognize: String @predictions(actions: [identifyText])
        }
    "#};

    let missing = execute_transform(schema, &TransformConfig::default(), Vec::new()).into_result();
    assert!(missing.is_err());

    let config: TransformConfig = serde_json::from_value(json!({ "predictions": { "bucketName": "media" } })).unwrap();
    let output = execute_transform(schema, &config, Vec::new()).into_result().unwrap();
    assert!(output.schema.contains("recognize(input: RecognizeInput!): String"));
}

#[test]
fn index_query_fields_resolve_through_the_index() {
    let schema = indoc! {r#"
        type Todo @model {
          id: ID!
          status: String! @index(name: "byStatus", queryField: "todosByStatus")
        }
    "#};

    let output = execute_transform(schema, &TransformConfig::default(), Vec::new())
        .into_result()
        .unwrap();

    assert!(output.resolvers["Query.todosByStatus.req.vtl"].contains("#set( $ListRequest.index = \"byStatus\" )"));
    assert!(output.resolvers.contains_key("Query.getTodo.req.vtl"));
}

#[test]
fn searchable_models_get_a_search_resolver() {
    let schema = indoc! {r#"
        type Post @model @searchable {
          id: ID!
          title: String
        }
    "#};

    let output = execute_transform(schema, &TransformConfig::default(), Vec::new())
        .into_result()
        .unwrap();

    assert!(output.resolvers.contains_key("Query.searchPosts.req.vtl"));
    assert!(output.resolvers.contains_key("Query.listPosts.req.vtl"));
}

#[test]
fn many_to_many_join_models_transform() {
    let schema = indoc! {r#"
        type Post @model {
          id: ID!
          tags: [Tag] @manyToMany(relationName: "PostTags")
        }

        type Tag @model {
          id: ID!
          posts: [Post] @manyToMany(relationName: "PostTags")
        }
    "#};

    let output = execute_transform(schema, &TransformConfig::default(), Vec::new())
        .into_result()
        .unwrap();

    assert!(output.resolvers.contains_key("Post.tags.req.vtl"));
    assert!(output.resolvers.contains_key("Query.getPostTags.req.vtl"));
}
