#![allow(unused_crate_dependencies)]

use graphql_sql_transformer::SqlTransformer;
use graphql_transformer_core::{
    context::TransformerContextOptions, strategy::SqlModelDataSourceStrategy, DeploymentResources, GraphQLTransform,
    TransformOptions, TransformerError, TransformerPlugin,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

fn strategy() -> SqlModelDataSourceStrategy {
    serde_json::from_value(json!({
        "name": "MySQLStrategy",
        "dbType": "MYSQL",
        "dbConnectionConfig": { "connectionUriSsmPath": ["/db/uri"] },
        "customSqlStatements": { "topPosts": "SELECT * FROM posts ORDER BY score DESC LIMIT :limit" }
    }))
    .unwrap()
}

fn transform_with(
    schema: &str,
    sql_directive_strategy: Option<SqlModelDataSourceStrategy>,
) -> Result<DeploymentResources, TransformerError> {
    let transformers: Vec<Box<dyn TransformerPlugin>> = vec![Box::new(SqlTransformer::new())];

    GraphQLTransform::new(TransformOptions {
        transformers,
        context: TransformerContextOptions {
            sql_directive_strategy,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap()
    .transform(schema)
    .into_result()
}

fn transform(schema: &str) -> Result<DeploymentResources, TransformerError> {
    transform_with(schema, Some(strategy()))
}

#[test]
fn inline_statements_run_on_the_sql_lambda() {
    let output = transform(indoc! {r#"
        type Post {
          id: ID!
          title: String
        }

        type Query {
          searchPosts(term: String!): [Post] @sql(statement: "SELECT * FROM posts WHERE title LIKE :term")
          countPosts: Int @sql(statement: "SELECT COUNT(*) AS count FROM posts")
        }
    "#})
    .unwrap();

    let request = &output.resolvers["Query.searchPosts.req.vtl"];
    assert!(request.contains(
        r#"#set( $lambdaInput.statement = $util.parseJson('"SELECT * FROM posts WHERE title LIKE :term"') )"#
    ));
    assert!(request.contains("#set( $lambdaInput.operation = \"RAW_SQL\" )"));
    assert!(request.contains("#set( $lambdaInput.engine = \"MYSQL\" )"));

    assert!(output.resolvers["Query.searchPosts.res.vtl"].ends_with("$util.toJson($ctx.result)\n"));
    assert!(output.resolvers["Query.countPosts.res.vtl"].contains("$util.toJson($ctx.result[0])"));

    let stack = &output.stacks["SqlApiStack"];
    assert!(stack.resources.contains_key("MySQLStrategyLambdaFunction"));
    assert!(stack.resources.contains_key("QuerySearchPostsResolver"));
}

#[test]
fn references_resolve_against_custom_statements() {
    let output = transform(indoc! {r#"
        type Query {
          topPosts(limit: Int): [String] @sql(reference: "topPosts")
        }
    "#})
    .unwrap();

    assert!(output.resolvers["Query.topPosts.req.vtl"].contains("ORDER BY score DESC LIMIT :limit"));

    let error = transform(indoc! {r#"
        type Query {
          newest: [String] @sql(reference: "newest")
        }
    "#})
    .unwrap_err();
    assert_eq!(
        error.to_string(),
        "The \"newest\" reference of @sql on Query.newest was not found in the custom SQL statements."
    );
}

#[test]
fn statement_and_reference_are_exclusive() {
    let schema = r#"type Query { posts: [String] @sql(statement: "SELECT 1", reference: "topPosts") }"#;
    let error = transform(schema).unwrap_err();
    assert_eq!(
        error.to_string(),
        "@sql can have either a 'statement' or a 'reference' argument, but not both."
    );

    let error = transform("type Query { posts: [String] @sql }").unwrap_err();
    assert_eq!(error.to_string(), "@sql requires either a 'statement' or a 'reference' argument.");
}

#[test]
fn only_root_fields() {
    let error = transform(indoc! {r#"
        type Post {
          related: [String] @sql(statement: "SELECT 1")
        }

        type Query {
          ping: String
        }
    "#})
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "@sql can only be used on Query or Mutation fields. Post.related is not one."
    );
}

#[test]
fn a_strategy_is_required() {
    let error = transform_with(r#"type Query { posts: [String] @sql(statement: "SELECT 1") }"#, None).unwrap_err();

    assert_eq!(error.to_string(), "The @sql directive requires a SQL data source strategy.");
}
