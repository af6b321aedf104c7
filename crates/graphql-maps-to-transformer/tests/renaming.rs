#![allow(unused_crate_dependencies)]

use graphql_maps_to_transformer::{MapsToTransformer, RefersToTransformer};
use graphql_model_transformer::ModelTransformer;
use graphql_relational_transformer::RelationTransformer;
use graphql_transformer_core::{
    context::TransformerContextOptions, strategy::ModelDataSourceStrategy, DeploymentResources, GraphQLTransform,
    TransformOptions, TransformerError, TransformerPlugin,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

fn transform_with(schema: &str, context: TransformerContextOptions) -> Result<DeploymentResources, TransformerError> {
    let transformers: Vec<Box<dyn TransformerPlugin>> = vec![
        Box::new(ModelTransformer::new()),
        Box::new(RelationTransformer::has_many()),
        Box::new(RelationTransformer::belongs_to()),
        Box::new(MapsToTransformer::new()),
        Box::new(RefersToTransformer::new()),
    ];

    GraphQLTransform::new(TransformOptions {
        transformers,
        context,
        ..Default::default()
    })
    .unwrap()
    .transform(schema)
    .into_result()
}

fn sql_context(models: &[&str]) -> TransformerContextOptions {
    let strategy: ModelDataSourceStrategy = serde_json::from_value(json!({
        "dbType": "POSTGRES",
        "name": "PgStrategy",
        "dbConnectionConfig": { "connectionUriSsmPath": ["/db/uri"] }
    }))
    .unwrap();

    TransformerContextOptions {
        data_source_strategies: models
            .iter()
            .map(|model| ((*model).to_owned(), strategy.clone()))
            .collect(),
        ..Default::default()
    }
}

#[test]
fn renamed_models_keep_their_table() {
    let output = transform_with(
        indoc! {r#"
            type Article @model @mapsTo(name: "Post") {
              id: ID!
              title: String
            }
        "#},
        TransformerContextOptions::default(),
    )
    .unwrap();

    let table = &output.stacks["Article"].resources["PostTable"];
    assert_eq!(table.properties["TableName"]["Fn::Join"][1][0], json!("Post"));
    assert!(output.schema.contains("type Article {"));
}

#[test]
fn implicit_foreign_keys_read_the_original_attribute() {
    let output = transform_with(
        indoc! {r#"
            type Article @model @mapsTo(name: "Post") {
              id: ID!
              comments: [Comment] @hasMany
            }

            type Comment @model {
              id: ID!
              content: String
            }
        "#},
        TransformerContextOptions::default(),
    )
    .unwrap();

    let init = &output.resolvers["Mutation.createComment.init.1.req.vtl"];
    assert!(init.contains(r#"$util.parseJson('{"articleCommentsId":"postCommentsId"}')"#));

    assert!(output.resolvers.contains_key("Query.getComment.postDataLoad.1.res.vtl"));
    assert!(!output.resolvers.contains_key("Query.getComment.init.1.req.vtl"));
    assert!(output.resolvers.contains_key("Article.comments.postDataLoad.1.res.vtl"));
}

#[test]
fn maps_to_requires_a_model() {
    let error = transform_with(
        indoc! {r#"
            type Article @mapsTo(name: "Post") {
              id: ID!
            }

            type Query {
              article: Article
            }
        "#},
        TransformerContextOptions::default(),
    )
    .unwrap_err();

    assert!(error.to_string().starts_with("@mapsTo can only be used on an @model type."));
}

#[test]
fn original_name_must_be_free() {
    let error = transform_with(
        indoc! {r#"
            type Article @model @mapsTo(name: "Post") {
              id: ID!
            }

            type Post @model {
              id: ID!
            }
        "#},
        TransformerContextOptions::default(),
    )
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Type Article cannot be mapped to Post because Post is also defined in the schema."
    );
}

#[test]
fn sql_tables_and_columns_are_passed_to_the_lambda() {
    let output = transform_with(
        indoc! {r#"
            type Post @model @refersTo(name: "posts") {
              id: ID!
              title: String @refersTo(name: "post_title")
            }
        "#},
        sql_context(&["Post"]),
    )
    .unwrap();

    let request = &output.resolvers["Query.getPost.req.vtl"];
    assert!(request.contains("#set( $lambdaInput.table = \"posts\" )"));
    assert!(request.contains(r#""columnMapping":{"title":"post_title"}"#));
}

#[test]
fn refers_to_is_sql_only() {
    let error = transform_with(
        indoc! {r#"
            type Post @model @refersTo(name: "posts") {
              id: ID!
            }
        "#},
        TransformerContextOptions::default(),
    )
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "@refersTo is only supported on SQL models. Post is not a SQL model."
    );
}

#[test]
fn two_fields_cannot_share_a_column() {
    let error = transform_with(
        indoc! {r#"
            type Post @model {
              id: ID!
              title: String @refersTo(name: "name")
              headline: String @refersTo(name: "name")
            }
        "#},
        sql_context(&["Post"]),
    )
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Fields title and headline of Post both refer to column name."
    );
}
