#![allow(unused_crate_dependencies)]

use graphql_function_transformer::FunctionTransformer;
use graphql_model_transformer::ModelTransformer;
use graphql_transformer_core::{
    DeploymentResources, GraphQLTransform, TransformOptions, TransformerError, TransformerPlugin,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn transform(schema: &str) -> Result<DeploymentResources, TransformerError> {
    let transformers: Vec<Box<dyn TransformerPlugin>> =
        vec![Box::new(ModelTransformer::new()), Box::new(FunctionTransformer::new())];

    GraphQLTransform::new(TransformOptions {
        transformers,
        ..Default::default()
    })
    .unwrap()
    .transform(schema)
    .into_result()
}

#[test]
fn query_fields_invoke_their_function() {
    let output = transform(
        r#"
        type Query {
          echo(msg: String): String @function(name: "echofunction-${env}")
        }
        "#,
    )
    .unwrap();

    let stack = &output.stacks["FunctionDirectiveStack"];
    let data_source = &stack.resources["EchofunctionLambdaDataSource"];
    assert_eq!(data_source.properties["Type"], json!("AWS_LAMBDA"));
    assert_eq!(
        data_source.properties["Config"]["LambdaConfig"]["LambdaFunctionArn"],
        json!({
            "Fn::Sub": [
                "arn:aws:lambda:${AWS::Region}:${AWS::AccountId}:function:echofunction-${env}",
                { "env": { "Ref": "env" } }
            ]
        })
    );
    assert!(stack.resources.contains_key("EchofunctionLambdaDataSourceServiceRole"));
    assert!(stack.resources.contains_key("QueryEchoResolver"));

    let request = &output.resolvers["Query.echo.req.vtl"];
    assert!(request.contains("\"operation\": \"Invoke\""));
    assert!(request.contains("\"fieldName\": \"echo\""));
}

#[test]
fn repeated_functions_chain_in_one_pipeline() {
    let output = transform(
        r#"
        type Query {
          pipeline: String @function(name: "authorize") @function(name: "fetch")
          other: String @function(name: "fetch")
        }
        "#,
    )
    .unwrap();

    let resolver = &output.stacks["FunctionDirectiveStack"].resources["QueryPipelineResolver"];
    let functions = resolver.properties["Functions"].as_array().unwrap();
    let data_sources: Vec<_> = functions.iter().map(|function| function["DataSourceName"].clone()).collect();
    assert_eq!(data_sources, vec![json!("AuthorizeLambda"), json!("FetchLambda")]);

    assert!(output.resolvers.contains_key("Query.pipeline.dataLoad.2.req.vtl"));

    let lambda_data_sources = output.stacks["FunctionDirectiveStack"]
        .resources
        .keys()
        .filter(|id| id.ends_with("LambdaDataSource"))
        .count();
    assert_eq!(lambda_data_sources, 2);
}

#[test]
fn function_name_is_required() {
    let error = transform(
        r#"
        type Query {
          echo: String @function(region: "us-east-1")
        }
        "#,
    )
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        r#"Directive "@function" argument "name" of type "String!" is required, but it was not provided."#
    );
}

#[test]
fn account_ids_are_numeric() {
    let error = transform(
        r#"
        type Query {
          echo: String @function(name: "echo", accountId: "mine")
        }
        "#,
    )
    .unwrap_err();

    assert_eq!(error.to_string(), "@function accountId of echo must be a numeric AWS account id.");
}
