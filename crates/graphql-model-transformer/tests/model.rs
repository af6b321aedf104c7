#![allow(unused_crate_dependencies)]

use graphql_model_transformer::ModelTransformer;
use graphql_transformer_core::{
    context::TransformerContextOptions,
    parameters::{ConflictHandlerType, ResolverConfig, SyncConfig},
    strategy::ModelDataSourceStrategy,
    DeploymentResources, GraphQLTransform, TransformOptions,
};
use indoc::indoc;
use serde_json::json;

fn transform_with(schema: &str, context: TransformerContextOptions) -> DeploymentResources {
    let mut transform = GraphQLTransform::new(TransformOptions {
        transformers: vec![Box::new(ModelTransformer::new())],
        context,
        ..Default::default()
    })
    .unwrap();

    transform.transform(schema).into_result().unwrap()
}

#[test]
fn simple_create_and_read() {
    let output = transform_with(
        "type Todo @model { id: ID! content: String }",
        TransformerContextOptions::default(),
    );

    assert!(output.resolvers.contains_key("Query.getTodo.req.vtl"));
    assert!(output.resolvers.contains_key("Query.listTodos.req.vtl"));
    assert!(output.resolvers.contains_key("Mutation.createTodo.req.vtl"));
    assert!(output.resolvers.contains_key("Subscription.onCreateTodo.req.vtl"));
    assert!(output.schema.contains("input CreateTodoInput {\n  id: ID\n  content: String\n"));
    assert!(output
        .schema
        .contains("onCreateTodo(filter: ModelTodoFilterInput): Todo @aws_subscribe(mutations: [\"createTodo\"])"));

    let todo_stack = &output.stacks["Todo"];
    assert_eq!(todo_stack.resources["TodoTable"].resource_type, "AWS::DynamoDB::Table");
    assert_eq!(
        todo_stack.resources["TodoTable"].properties["KeySchema"],
        json!([{ "AttributeName": "id", "KeyType": "HASH" }])
    );
    assert!(todo_stack.resources.contains_key("TodoTableDataSource"));
    assert!(todo_stack.resources.contains_key("QueryGetTodoResolver"));
    assert!(output.root_stack.resources.contains_key("Todo"));
}

#[test]
fn conflict_detection_adds_versioning() {
    let context = TransformerContextOptions {
        resolver_config: ResolverConfig {
            project: Some(SyncConfig {
                conflict_handler: ConflictHandlerType::Automerge,
                lambda_conflict_handler: None,
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    let output = transform_with("type Note @model { id: ID! text: String }", context);

    assert!(output.schema.contains("  _version: Int!\n  _deleted: Boolean\n  _lastChangedAt: AWSTimestamp!\n"));
    assert!(output.schema.contains(
        "syncNotes(filter: ModelNoteFilterInput, limit: Int, nextToken: String, lastSync: AWSTimestamp): ModelNoteConnection"
    ));
    assert!(output.resolvers["Mutation.updateNote.req.vtl"]
        .contains("\"_version\": $util.defaultIfNull($args._version, 0)"));
    assert!(output.root_stack.resources.contains_key("AmplifyDataStore"));

    let data_source = &output.stacks["Note"].resources["NoteTableDataSource"];
    assert_eq!(data_source.properties["Config"]["ConflictHandler"], json!({ "Type": "AUTOMERGE" }));
}

#[test]
fn sql_models_share_one_lambda() {
    let strategy: ModelDataSourceStrategy = serde_json::from_value(json!({
        "dbType": "MYSQL",
        "name": "MySQLStrategy",
        "dbConnectionConfig": { "connectionUriSsmPath": ["/db/uri"] }
    }))
    .unwrap();

    let context = TransformerContextOptions {
        data_source_strategies: [("Post", strategy.clone()), ("Comment", strategy)]
            .into_iter()
            .map(|(model, strategy)| (model.to_owned(), strategy))
            .collect(),
        ..Default::default()
    };

    let output = transform_with(
        indoc! {r"
            type Post @model {
              id: ID!
              title: String
            }

            type Comment @model {
              id: ID!
              content: String
            }
        "},
        context,
    );

    let sql_stack = &output.stacks["SqlApiStack"];
    assert!(sql_stack.resources.contains_key("MySQLStrategyLambdaFunction"));
    assert!(sql_stack.resources.contains_key("MySQLStrategyLambdaDataSource"));
    assert!(!sql_stack.resources.contains_key("MySQLStrategyLambdaDataSourceDataSource"));
    assert_eq!(
        sql_stack.resources["MySQLStrategyLambdaDataSource"].properties["Name"],
        "MySQLStrategyLambda"
    );
    assert!(sql_stack.resources.contains_key("QueryGetPostResolver"));
    assert!(sql_stack.resources.contains_key("QueryGetCommentResolver"));
    assert!(!output.stacks.contains_key("Post"));
    assert!(output.resolvers["Query.listPosts.req.vtl"].contains("#set( $lambdaInput.operation = \"LIST\" )"));
}
