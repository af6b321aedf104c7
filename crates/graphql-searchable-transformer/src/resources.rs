//! The OpenSearch domain and the Lambda streaming table changes into it.

use graphql_transformer_core::{
    context::{DataSource, DataSourceKind, Resource},
    TransformerContext, TransformerError,
};
use serde_json::json;

pub const SEARCHABLE_STACK: &str = "SearchableStack";
pub const DOMAIN_LOGICAL_ID: &str = "OpenSearchDomain";
pub const STREAMING_FUNCTION_LOGICAL_ID: &str = "OpenSearchStreamingLambdaFunction";
pub const DATA_SOURCE_NAME: &str = "OpenSearch";

const DEFAULT_INSTANCE_TYPE: &str = "t3.small.search";
const DEFAULT_INSTANCE_COUNT: u32 = 1;
const DEFAULT_VOLUME_SIZE_GB: u32 = 10;

/// Domain, streaming function and data source shared by every searchable model.
pub fn add_domain(ctx: &mut TransformerContext) -> Result<(), TransformerError> {
    if ctx.resources().has_resource(DOMAIN_LOGICAL_ID) {
        return Ok(());
    }

    let node_to_node_encryption = ctx.parameters().enable_search_node_to_node_encryption;
    ctx.resources_mut().set_resource_in_stack(
        DOMAIN_LOGICAL_ID,
        Resource::new(
            "AWS::OpenSearchService::Domain",
            json!({
                "EngineVersion": "OpenSearch_2.11",
                "ClusterConfig": {
                    "InstanceType": DEFAULT_INSTANCE_TYPE,
                    "InstanceCount": DEFAULT_INSTANCE_COUNT,
                },
                "EBSOptions": {
                    "EBSEnabled": true,
                    "VolumeType": "gp2",
                    "VolumeSize": DEFAULT_VOLUME_SIZE_GB,
                },
                "NodeToNodeEncryptionOptions": { "Enabled": node_to_node_encryption },
                "EncryptionAtRestOptions": { "Enabled": true },
            }),
        ),
        SEARCHABLE_STACK,
    )?;

    ctx.resources_mut().set_resource_in_stack(
        STREAMING_FUNCTION_LOGICAL_ID,
        Resource::new(
            "AWS::Lambda::Function",
            json!({
                "Handler": "python_streaming_function.lambda_handler",
                "Runtime": "python3.12",
                "Environment": {
                    "Variables": {
                        "OPENSEARCH_ENDPOINT": {
                            "Fn::Join": ["", ["https://", { "Fn::GetAtt": [DOMAIN_LOGICAL_ID, "DomainEndpoint"] }]]
                        },
                        "OPENSEARCH_REGION": { "Ref": "AWS::Region" },
                        "OPENSEARCH_USE_EXTERNAL_VERSIONING": "false",
                    },
                },
            }),
        )
        .depends_on(DOMAIN_LOGICAL_ID),
        SEARCHABLE_STACK,
    )?;

    ctx.data_sources_mut().add(
        DataSource::new(
            DATA_SOURCE_NAME,
            DataSourceKind::AmazonOpensearchService,
            json!({
                "AwsRegion": { "Ref": "AWS::Region" },
                "Endpoint": { "Fn::Join": ["", ["https://", { "Fn::GetAtt": [DOMAIN_LOGICAL_ID, "DomainEndpoint"] }]] },
            }),
        )
        .in_stack(SEARCHABLE_STACK),
    )?;

    tracing::debug!("added OpenSearch domain");
    Ok(())
}

/// Feed the table of `model_name` into the domain through its stream.
pub fn add_stream_mapping(ctx: &mut TransformerContext, model_name: &str) -> Result<(), TransformerError> {
    let table_logical_id = ctx.resource_names().table_logical_id(model_name);

    ctx.resources_mut().set_resource_in_stack(
        format!("SearchableModelLambdaMapping{model_name}"),
        Resource::new(
            "AWS::Lambda::EventSourceMapping",
            json!({
                "BatchSize": 1,
                "Enabled": true,
                "EventSourceArn": { "Fn::GetAtt": [table_logical_id, "StreamArn"] },
                "FunctionName": { "Fn::GetAtt": [STREAMING_FUNCTION_LOGICAL_ID, "Arn"] },
                "StartingPosition": "LATEST",
            }),
        ),
        SEARCHABLE_STACK,
    )
}
