#![allow(unused_crate_dependencies)]

use graphql_index_transformer::{IndexTransformer, PrimaryKeyTransformer};
use graphql_model_transformer::ModelTransformer;
use graphql_transformer_core::{DeploymentResources, GraphQLTransform, TransformOptions, TransformerError};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

fn transform(schema: &str) -> Result<DeploymentResources, TransformerError> {
    let mut transform = GraphQLTransform::new(TransformOptions {
        transformers: vec![
            Box::new(ModelTransformer::new()),
            Box::new(PrimaryKeyTransformer::new()),
            Box::new(IndexTransformer::new()),
        ],
        ..Default::default()
    })?;

    transform.transform(schema).into_result()
}

#[test]
fn custom_primary_key_with_composite_sort_key() {
    let output = transform(indoc! {r#"
        type Order @model {
          customerEmail: String! @primaryKey(sortKeyFields: ["status", "orderedAt"])
          status: String!
          orderedAt: AWSDateTime!
        }
    "#})
    .unwrap();

    assert!(output
        .schema
        .contains("getOrder(customerEmail: String!, status: String!, orderedAt: AWSDateTime!): Order"));
    assert!(output.schema.contains("input ModelOrderStatusOrderedAtCompositeKeyConditionInput {"));
    assert!(!output.schema.contains("  id: ID!"));

    let table = &output.stacks["Order"].resources["OrderTable"];
    assert_eq!(
        table.properties["KeySchema"],
        json!([
            { "AttributeName": "customerEmail", "KeyType": "HASH" },
            { "AttributeName": "status#orderedAt", "KeyType": "RANGE" },
        ])
    );
}

#[test]
fn secondary_index_with_query_field() {
    let output = transform(indoc! {r#"
        type Todo @model {
          id: ID!
          status: String! @index(name: "byStatus", sortKeyFields: ["createdAt"], queryField: "todosByStatus")
          createdAt: AWSDateTime!
        }
    "#})
    .unwrap();

    assert!(output.schema.contains(
        "todosByStatus(status: String!, createdAt: ModelStringKeyConditionInput, sortDirection: ModelSortDirection, filter: ModelTodoFilterInput, limit: Int, nextToken: String): ModelTodoConnection"
    ));
    assert!(output.resolvers["Query.todosByStatus.req.vtl"].contains("#set( $ListRequest.index = \"byStatus\" )"));

    let table = &output.stacks["Todo"].resources["TodoTable"];
    assert_eq!(table.properties["GlobalSecondaryIndexes"][0]["IndexName"], json!("byStatus"));
    assert_eq!(
        table.properties["AttributeDefinitions"],
        json!([
            { "AttributeName": "id", "AttributeType": "S" },
            { "AttributeName": "status", "AttributeType": "S" },
            { "AttributeName": "createdAt", "AttributeType": "S" },
        ])
    );
}

#[test]
fn key_fields_must_exist() {
    let error = transform(indoc! {r#"
        type Todo @model {
          id: ID! @primaryKey(sortKeyFields: ["missing"])
        }
    "#})
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Can't find field 'missing' in Todo, but it was specified in the @primaryKey sort key."
    );
}

#[test]
fn primary_keys_must_be_non_null() {
    let error = transform("type Todo @model { id: ID @primaryKey }").unwrap_err();

    assert_eq!(error.to_string(), "The primary key on type 'Todo' must reference non-null fields.");
}
