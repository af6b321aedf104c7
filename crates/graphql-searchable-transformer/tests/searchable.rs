#![allow(unused_crate_dependencies)]

use graphql_model_transformer::ModelTransformer;
use graphql_searchable_transformer::SearchableTransformer;
use graphql_transformer_core::{
    context::TransformerContextOptions, log::TransformerLogLevel, parameters::TransformParameters,
    strategy::ModelDataSourceStrategy, DeploymentResources, GraphQLTransform, TransformOptions, TransformOutcome,
    TransformerPlugin,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

const SCHEMA: &str = indoc! {r"
    type Post @model @searchable {
      id: ID!
      title: String!
      rating: Int
      tags: [String]
    }
"};

fn run(schema: &str, context: TransformerContextOptions) -> TransformOutcome {
    let transformers: Vec<Box<dyn TransformerPlugin>> =
        vec![Box::new(ModelTransformer::new()), Box::new(SearchableTransformer::new())];

    GraphQLTransform::new(TransformOptions {
        transformers,
        context,
        ..Default::default()
    })
    .unwrap()
    .transform(schema)
}

fn transform(schema: &str) -> DeploymentResources {
    run(schema, TransformerContextOptions::default()).into_result().unwrap()
}

#[test]
fn adds_a_search_query_with_its_inputs() {
    let output = transform(SCHEMA);

    assert!(output.schema.contains(
        "searchPosts(filter: SearchablePostFilterInput, sort: [SearchablePostSortInput], limit: Int, nextToken: String, from: Int, aggregates: [SearchablePostAggregationInput]): SearchablePostConnection"
    ));
    assert!(output.schema.contains(indoc! {r"
        input SearchablePostFilterInput {
          id: SearchableIDFilterInput
          title: SearchableStringFilterInput
          rating: SearchableIntFilterInput
    "}));
    assert!(output.schema.contains(
        "union SearchableAggregateGenericResult = SearchableAggregateScalarResult | SearchableAggregateBucketResult"
    ));

    let request = &output.resolvers["Query.searchPosts.req.vtl"];
    assert!(request.contains("\"path\": \"/post/_doc/_search\""));
}

#[test]
fn streams_the_table_into_the_domain() {
    let output = transform(SCHEMA);

    let stack = &output.stacks["SearchableStack"];
    assert!(stack.resources.contains_key("OpenSearchDomain"));
    assert!(stack.resources.contains_key("OpenSearchDataSource"));
    assert!(stack.resources.contains_key("QuerySearchPostsResolver"));

    let mapping = &stack.resources["SearchableModelLambdaMappingPost"];
    assert_eq!(mapping.properties["EventSourceArn"], json!({ "Fn::GetAtt": ["PostTable", "StreamArn"] }));
}

#[test]
fn search_query_can_be_disabled() {
    let output = transform(indoc! {r"
        type Post @model @searchable(queries: { search: null }) {
          id: ID!
        }
    "});

    assert!(!output.schema.contains("searchPosts"));
    assert!(output.stacks["SearchableStack"]
        .resources
        .contains_key("SearchableModelLambdaMappingPost"));
}

#[test]
fn warns_when_gen1_patterns_are_disallowed() {
    let outcome = run(
        SCHEMA,
        TransformerContextOptions {
            parameters: TransformParameters {
                allow_gen1_patterns: false,
                ..Default::default()
            },
            ..Default::default()
        },
    );

    let warnings: Vec<_> = outcome
        .logs
        .iter()
        .filter(|log| log.level == TransformerLogLevel::Warn)
        .map(|log| log.message.as_str())
        .collect();
    assert_eq!(
        warnings,
        ["@searchable on Post is deprecated. Consider a zero-ETL integration with OpenSearch instead."]
    );
    assert!(outcome.into_result().is_ok());
}

#[test]
fn sql_models_cannot_be_searchable() {
    let strategy: ModelDataSourceStrategy = serde_json::from_value(json!({
        "dbType": "MYSQL",
        "name": "MySQLStrategy",
        "dbConnectionConfig": { "connectionUriSsmPath": ["/db/uri"] }
    }))
    .unwrap();

    let outcome = run(
        SCHEMA,
        TransformerContextOptions {
            data_source_strategies: [("Post".to_owned(), strategy)].into_iter().collect(),
            ..Default::default()
        },
    );

    let error = outcome.into_result().unwrap_err().to_string();
    assert!(error.contains("@searchable directive on Post"));
    assert!(error.contains(
        "Following directives are not supported on a SQL datasource: @searchable, @predictions, @function, @manyToMany, @http, @mapsTo"
    ));
}
