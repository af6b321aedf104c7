use graphql_transformer_core::{
    context::{DataSource, DataSourceKind, Resource},
    TransformerContext, TransformerError,
};
use serde_json::json;

use crate::actions::PredictionsAction;

pub const PREDICTIONS_STACK: &str = "PredictionsDirectiveStack";
pub const ROLE_LOGICAL_ID: &str = "PredictionsIAMRole";
pub const SPEECH_FUNCTION_LOGICAL_ID: &str = "PredictionsLambdaFunction";

/// The data source serving `action`, created on first use.
pub(crate) fn data_source_for(
    ctx: &mut TransformerContext,
    action: PredictionsAction,
    bucket: &str,
) -> Result<String, TransformerError> {
    add_role(ctx, bucket)?;

    let (name, data_source) = match action {
        PredictionsAction::IdentifyText | PredictionsAction::IdentifyLabels => {
            ("Rekognition", http_data_source("Rekognition", "rekognition"))
        }
        PredictionsAction::TranslateText => ("Translate", http_data_source("Translate", "translate")),
        PredictionsAction::ConvertTextToSpeech => {
            add_speech_function(ctx, bucket)?;
            (
                "PredictionsLambda",
                DataSource::new(
                    "PredictionsLambda",
                    DataSourceKind::AwsLambda,
                    json!({
                        "LambdaConfig": { "LambdaFunctionArn": { "Fn::GetAtt": [SPEECH_FUNCTION_LOGICAL_ID, "Arn"] } },
                        "ServiceRoleArn": { "Fn::GetAtt": [ROLE_LOGICAL_ID, "Arn"] },
                    }),
                ),
            )
        }
    };

    ctx.data_sources_mut().add_if_absent(data_source.in_stack(PREDICTIONS_STACK));
    Ok(name.to_owned())
}

/// An IAM signed HTTP data source for the regional endpoint of `service`.
fn http_data_source(name: &str, service: &str) -> DataSource {
    DataSource::new(
        name,
        DataSourceKind::Http,
        json!({
            "HttpConfig": {
                "Endpoint": { "Fn::Sub": format!("https://{service}.${{AWS::Region}}.amazonaws.com") },
                "AuthorizationConfig": {
                    "AuthorizationType": "AWS_IAM",
                    "AwsIamConfig": { "SigningRegion": { "Ref": "AWS::Region" }, "SigningServiceName": service },
                },
            },
            "ServiceRoleArn": { "Fn::GetAtt": [ROLE_LOGICAL_ID, "Arn"] },
        }),
    )
}

fn add_role(ctx: &mut TransformerContext, bucket: &str) -> Result<(), TransformerError> {
    if ctx.resources().has_resource(ROLE_LOGICAL_ID) {
        return Ok(());
    }

    ctx.resources_mut().set_resource_in_stack(
        ROLE_LOGICAL_ID,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": ["appsync.amazonaws.com", "lambda.amazonaws.com"] },
                        "Action": "sts:AssumeRole",
                    }],
                },
                "Policies": [{
                    "PolicyName": "PredictionsStorageAccess",
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [
                            {
                                "Effect": "Allow",
                                "Action": ["s3:GetObject"],
                                "Resource": format!("arn:aws:s3:::{bucket}/public/*"),
                            },
                            {
                                "Effect": "Allow",
                                "Action": [
                                    "rekognition:DetectText",
                                    "rekognition:DetectLabels",
                                    "translate:TranslateText",
                                    "polly:SynthesizeSpeech",
                                ],
                                "Resource": "*",
                            },
                        ],
                    },
                }],
            }),
        ),
        PREDICTIONS_STACK,
    )
}

fn add_speech_function(ctx: &mut TransformerContext, bucket: &str) -> Result<(), TransformerError> {
    if ctx.resources().has_resource(SPEECH_FUNCTION_LOGICAL_ID) {
        return Ok(());
    }

    ctx.resources_mut().set_resource_in_stack(
        SPEECH_FUNCTION_LOGICAL_ID,
        Resource::new(
            "AWS::Lambda::Function",
            json!({
                "Handler": "predictionsLambda.handler",
                "Runtime": "nodejs18.x",
                "Role": { "Fn::GetAtt": [ROLE_LOGICAL_ID, "Arn"] },
                "Timeout": 60,
                "Environment": { "Variables": { "BUCKET_NAME": bucket } },
            }),
        )
        .depends_on(ROLE_LOGICAL_ID),
        PREDICTIONS_STACK,
    )
}
