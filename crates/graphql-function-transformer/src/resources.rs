use graphql_transformer_core::{
    context::{DataSource, DataSourceKind, Resource},
    TransformerContext, TransformerError,
};
use heck::ToUpperCamelCase;
use serde_json::{json, Value};

use crate::FunctionArguments;

pub const FUNCTION_STACK: &str = "FunctionDirectiveStack";

/// Placeholder Amplify substitutes with the environment name in function names.
const ENV_PLACEHOLDER: &str = "${env}";

/// `EchoFunctionLambda` for `echoFunction-${env}`. Functions in another region or account get
/// those appended so that they don't share a data source.
pub fn data_source_name(function: &FunctionArguments) -> String {
    let base = function.name.replace(ENV_PLACEHOLDER, "").to_upper_camel_case();
    let region = function.region.as_deref().unwrap_or_default().to_upper_camel_case();
    let account = function.account_id.as_deref().unwrap_or_default();
    format!("{base}{region}{account}Lambda")
}

/// The invoked function's ARN. The region and account default to the stack's own, and
/// `${env}` resolves against the `env` parameter.
pub fn function_arn(function: &FunctionArguments) -> Value {
    let region = function.region.as_deref().unwrap_or("${AWS::Region}");
    let account = function.account_id.as_deref().unwrap_or("${AWS::AccountId}");
    let arn = format!("arn:aws:lambda:{region}:{account}:function:{}", function.name);

    if function.name.contains(ENV_PLACEHOLDER) {
        json!({ "Fn::Sub": [arn, { "env": { "Ref": "env" } }] })
    } else {
        json!({ "Fn::Sub": arn })
    }
}

/// Register the data source of `function` and its service role once, returning its name.
pub(crate) fn add_function_data_source(
    ctx: &mut TransformerContext,
    function: &FunctionArguments,
) -> Result<String, TransformerError> {
    let name = data_source_name(function);
    if ctx.data_sources().has(&name) {
        return Ok(name);
    }

    let role_logical_id = format!("{name}DataSourceServiceRole");
    let arn = function_arn(function);

    ctx.resources_mut().set_resource_in_stack(
        role_logical_id.as_str(),
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": "appsync.amazonaws.com" },
                        "Action": "sts:AssumeRole",
                    }],
                },
                "Policies": [{
                    "PolicyName": format!("{name}InvokePolicy"),
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Action": "lambda:InvokeFunction",
                            "Resource": [arn.clone(), { "Fn::Join": [":", [arn.clone(), "*"]] }],
                        }],
                    },
                }],
            }),
        ),
        FUNCTION_STACK,
    )?;

    ctx.data_sources_mut().add(
        DataSource::new(
            name.as_str(),
            DataSourceKind::AwsLambda,
            json!({
                "LambdaConfig": { "LambdaFunctionArn": arn },
                "ServiceRoleArn": { "Fn::GetAtt": [role_logical_id, "Arn"] },
            }),
        )
        .in_stack(FUNCTION_STACK),
    )?;

    tracing::debug!(data_source = %name, "added Lambda data source");
    Ok(name)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn function(name: &str, region: Option<&str>, account_id: Option<&str>) -> FunctionArguments {
        FunctionArguments {
            name: name.to_owned(),
            region: region.map(str::to_owned),
            account_id: account_id.map(str::to_owned),
        }
    }

    #[rstest]
    #[case::plain(function("echofunction", None, None), "EchofunctionLambda")]
    #[case::environment(function("echo-function-${env}", None, None), "EchoFunctionLambda")]
    #[case::cross_account(function("echo", Some("us-east-2"), Some("123456789012")), "EchoUsEast2123456789012Lambda")]
    fn data_source_names(#[case] function: FunctionArguments, #[case] expected: &str) {
        assert_eq!(data_source_name(&function), expected);
    }

    #[test]
    fn environment_names_substitute_the_env_parameter() {
        assert_eq!(
            function_arn(&function("echo-${env}", None, None)),
            json!({
                "Fn::Sub": [
                    "arn:aws:lambda:${AWS::Region}:${AWS::AccountId}:function:echo-${env}",
                    { "env": { "Ref": "env" } }
                ]
            })
        );
        assert_eq!(
            function_arn(&function("echo", Some("eu-west-1"), Some("123456789012"))),
            json!({ "Fn::Sub": "arn:aws:lambda:eu-west-1:123456789012:function:echo" })
        );
    }
}
