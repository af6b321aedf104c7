//! Tables, functions and data sources backing the models.

use graphql_transformer_core::{
    context::{DataSource, DataSourceKind, KeyDefinition, Resource},
    document::ast,
    parameters::SyncConfig,
    strategy::{SqlConnectionConfig, SqlModelDataSourceStrategy},
    TransformerContext, TransformerError,
};
use serde_json::{json, Value};

use crate::names::{ModelNames, SYNC_FIELD_LAST_CHANGED_AT};

pub const SQL_STACK: &str = "SqlApiStack";
pub const DATA_STORE_TABLE: &str = "AmplifyDataStore";

const DATA_STORE_TTL_MINUTES: u32 = 43_200;
const DELTA_SYNC_TTL_MINUTES: u32 = 30;

/// DynamoDB attribute type of a key field.
fn attribute_type(ctx: &TransformerContext, model_name: &str, field_name: &str) -> &'static str {
    let type_name = ctx
        .output()
        .field(model_name, field_name)
        .map(|field| ast::base_type_name(&field.node.ty.node).to_owned());

    match type_name.as_deref() {
        Some("Int" | "Float" | "AWSTimestamp" | "BigInt") => "N",
        _ => "S",
    }
}

fn key_schema(key: &KeyDefinition) -> Value {
    let mut schema = vec![json!({ "AttributeName": key.partition_key, "KeyType": "HASH" })];
    if let Some(attribute) = key.sort_key_attribute() {
        schema.push(json!({ "AttributeName": attribute, "KeyType": "RANGE" }));
    }
    Value::Array(schema)
}

/// Attributes used by `key`, a composite sort key being a single string attribute.
fn key_attributes(ctx: &TransformerContext, model_name: &str, key: &KeyDefinition) -> Vec<(String, &'static str)> {
    let mut attributes = vec![(
        key.partition_key.clone(),
        attribute_type(ctx, model_name, &key.partition_key),
    )];
    match key.sort_key_fields.as_slice() {
        [] => (),
        [sort_field] => attributes.push((sort_field.clone(), attribute_type(ctx, model_name, sort_field))),
        _ => attributes.extend(key.sort_key_attribute().map(|attribute| (attribute, "S"))),
    }
    attributes
}

/// The table of a DynamoDB model with its secondary indexes, in the model's stack.
pub fn add_model_table(ctx: &mut TransformerContext, model_name: &str) -> Result<(), TransformerError> {
    let table_logical_id = ctx.resource_names().table_logical_id(model_name);
    let table_name = ctx.resource_names().get_model_name_mapping(model_name).to_owned();
    let primary_key = ctx.keys().primary_key(model_name);

    let mut attributes = key_attributes(ctx, model_name, &primary_key);
    let mut global_indexes = Vec::new();

    for index in ctx.keys().indexes(model_name) {
        for attribute in key_attributes(ctx, model_name, &index.key) {
            if !attributes.iter().any(|(name, _)| *name == attribute.0) {
                attributes.push(attribute);
            }
        }
        global_indexes.push(json!({
            "IndexName": index.name,
            "KeySchema": key_schema(&index.key),
            "Projection": { "ProjectionType": "ALL" },
        }));
    }

    let mut properties = json!({
        "TableName": {
            "Fn::Join": ["", [table_name, "-", { "Ref": "AppSyncApiId" }, "-", { "Ref": "env" }]]
        },
        "KeySchema": key_schema(&primary_key),
        "AttributeDefinitions": attributes
            .iter()
            .map(|(name, attribute_type)| json!({ "AttributeName": name, "AttributeType": attribute_type }))
            .collect::<Vec<_>>(),
        "BillingMode": "PAY_PER_REQUEST",
        "StreamSpecification": { "StreamViewType": "NEW_AND_OLD_IMAGES" },
        "SSESpecification": { "SSEEnabled": true },
    });
    if !global_indexes.is_empty() {
        properties["GlobalSecondaryIndexes"] = Value::Array(global_indexes);
    }
    if ctx.metadata().is_sync_enabled(model_name) {
        properties["TimeToLiveSpecification"] = json!({ "AttributeName": "_ttl", "Enabled": true });
    }

    ctx.resources_mut().set_resource_in_stack(
        table_logical_id.clone(),
        Resource::new("AWS::DynamoDB::Table", properties),
        ModelNames::stack(model_name),
    )?;

    let mut config = json!({
        "TableName": { "Ref": table_logical_id },
        "AwsRegion": { "Ref": "AWS::Region" },
    });
    let sync_config = ctx
        .sync_config_for(model_name)
        .filter(|_| ctx.metadata().is_sync_enabled(model_name))
        .cloned();
    if let Some(sync_config) = sync_config {
        config["Versioned"] = json!(true);
        config["DeltaSyncConfig"] = json!({
            "DeltaSyncTableName": { "Ref": DATA_STORE_TABLE },
            "DeltaSyncTableTTL": DELTA_SYNC_TTL_MINUTES,
            "BaseTableTTL": DATA_STORE_TTL_MINUTES,
        });
        config["ConflictHandler"] = conflict_handler(&sync_config);
        add_data_store_table(ctx)?;
    }

    ctx.data_sources_mut().add(
        DataSource::new(ModelNames::data_source(model_name), DataSourceKind::AmazonDynamodb, config)
            .in_stack(ModelNames::stack(model_name)),
    )?;

    tracing::debug!(model = model_name, table = %table_logical_id, "added model table");
    Ok(())
}

fn conflict_handler(sync_config: &SyncConfig) -> Value {
    let mut handler = json!({ "Type": sync_config.conflict_handler.to_string() });
    if let Some(lambda) = &sync_config.lambda_conflict_handler {
        handler["LambdaArn"] = match &lambda.lambda_arn {
            Some(arn) => json!(arn),
            None => json!({
                "Fn::Sub": format!("arn:aws:lambda:${{AWS::Region}}:${{AWS::AccountId}}:function:{}", lambda.name)
            }),
        };
    }
    handler
}

/// The table DataStore delta sync reads from, shared by every versioned model.
fn add_data_store_table(ctx: &mut TransformerContext) -> Result<(), TransformerError> {
    if ctx.resources().has_resource(DATA_STORE_TABLE) {
        return Ok(());
    }

    ctx.resources_mut().set_resource(
        DATA_STORE_TABLE,
        Resource::new(
            "AWS::DynamoDB::Table",
            json!({
                "KeySchema": [
                    { "AttributeName": "ds_pk", "KeyType": "HASH" },
                    { "AttributeName": "ds_sk", "KeyType": "RANGE" },
                ],
                "AttributeDefinitions": [
                    { "AttributeName": "ds_pk", "AttributeType": "S" },
                    { "AttributeName": "ds_sk", "AttributeType": "S" },
                ],
                "BillingMode": "PAY_PER_REQUEST",
                "TimeToLiveSpecification": { "AttributeName": SYNC_FIELD_LAST_CHANGED_AT, "Enabled": true },
            }),
        ),
    )
}

/// The Lambda translating model operations to SQL, and its data source. One per strategy, whatever
/// the number of models using it.
pub fn add_sql_lambda(
    ctx: &mut TransformerContext,
    strategy: &SqlModelDataSourceStrategy,
) -> Result<(), TransformerError> {
    let function_logical_id = strategy.lambda_function_name();
    if ctx.resources().has_resource(&function_logical_id) {
        return Ok(());
    }

    let mut properties = json!({
        "Handler": "handler.run",
        "Runtime": "nodejs18.x",
        "MemorySize": 512,
        "Timeout": 30,
        "Environment": { "Variables": sql_environment(strategy) },
    });
    if let Some(vpc) = &strategy.vpc_configuration {
        properties["VpcConfig"] = json!({
            "SecurityGroupIds": vpc.security_group_ids,
            "SubnetIds": vpc
                .subnet_availability_zone_config
                .iter()
                .map(|subnet| subnet.subnet_id.as_str())
                .collect::<Vec<_>>(),
        });
    }

    ctx.resources_mut().set_resource_in_stack(
        function_logical_id.clone(),
        Resource::new("AWS::Lambda::Function", properties),
        SQL_STACK,
    )?;

    let mut function_arn = json!({ "Fn::GetAtt": [function_logical_id, "Arn"] });
    if let Some(concurrency) = &strategy.sql_lambda_provisioned_concurrency_config {
        let alias_logical_id = format!("{}Alias", strategy.lambda_function_name());
        ctx.resources_mut().set_resource_in_stack(
            alias_logical_id.clone(),
            Resource::new(
                "AWS::Lambda::Alias",
                json!({
                    "FunctionName": { "Ref": function_logical_id },
                    "FunctionVersion": "$LATEST",
                    "Name": "provisioned",
                    "ProvisionedConcurrencyConfig": {
                        "ProvisionedConcurrentExecutions": concurrency.provisioned_concurrent_executions,
                    },
                }),
            ),
            SQL_STACK,
        )?;
        function_arn = json!({ "Ref": alias_logical_id });
    }

    ctx.data_sources_mut().add_if_absent(
        DataSource::new(
            strategy.lambda_data_source_name(),
            DataSourceKind::AwsLambda,
            json!({ "LambdaFunctionArn": function_arn }),
        )
        .in_stack(SQL_STACK),
    );

    tracing::debug!(strategy = %strategy.name, "added SQL lambda");
    Ok(())
}

fn sql_environment(strategy: &SqlModelDataSourceStrategy) -> Value {
    let mut environment = json!({ "engine": strategy.db_type.to_string().to_lowercase() });

    match &strategy.db_connection_config {
        SqlConnectionConfig::SsmPaths {
            hostname_ssm_path,
            port_ssm_path,
            username_ssm_path,
            password_ssm_path,
            database_name_ssm_path,
        } => {
            environment["hostname"] = json!(hostname_ssm_path);
            environment["port"] = json!(port_ssm_path);
            environment["username"] = json!(username_ssm_path);
            environment["password"] = json!(password_ssm_path);
            environment["database"] = json!(database_name_ssm_path);
            environment["credentialStorageMethod"] = json!("SSM");
        }
        SqlConnectionConfig::SecretsManager {
            secret_arn,
            port,
            database_name,
            hostname,
            key_arn,
        } => {
            environment["secretArn"] = json!(secret_arn);
            environment["port"] = json!(port.to_string());
            environment["database"] = json!(database_name);
            environment["hostname"] = json!(hostname);
            if let Some(key_arn) = key_arn {
                environment["keyArn"] = json!(key_arn);
            }
            environment["credentialStorageMethod"] = json!("SECRETS_MANAGER");
        }
        SqlConnectionConfig::ConnectionUri { connection_uri_ssm_path } => {
            environment["connectionString"] = json!(connection_uri_ssm_path.join(","));
            environment["credentialStorageMethod"] = json!("SSM");
        }
    }

    environment
}

#[cfg(test)]
mod tests {
    use graphql_transformer_core::strategy::SqlModelDataSourceStrategy;
    use serde_json::json;

    use super::*;

    #[test]
    fn connection_uris_are_passed_as_ssm_paths() {
        let strategy: SqlModelDataSourceStrategy = serde_json::from_value(json!({
            "name": "PgStrategy",
            "dbType": "POSTGRES",
            "dbConnectionConfig": { "connectionUriSsmPath": ["/a/uri", "/b/uri"] }
        }))
        .unwrap();

        assert_eq!(
            sql_environment(&strategy),
            json!({
                "engine": "postgres",
                "connectionString": "/a/uri,/b/uri",
                "credentialStorageMethod": "SSM",
            })
        );
    }

    #[test]
    fn composite_sort_keys_become_one_range_attribute() {
        let key = KeyDefinition::new("customerId", vec!["status".to_owned(), "createdAt".to_owned()]);

        assert_eq!(
            key_schema(&key),
            json!([
                { "AttributeName": "customerId", "KeyType": "HASH" },
                { "AttributeName": "status#createdAt", "KeyType": "RANGE" },
            ])
        );
    }
}
