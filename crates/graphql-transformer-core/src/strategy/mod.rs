//! Data source strategies: which backing store serves a model.

mod database_url;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use database_url::{parse_database_url, DatabaseConnectionConfig, DatabaseEngine, DatabaseUrlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlDbType {
    Mysql,
    Postgres,
}

/// How the SQL Lambda finds its database credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlConnectionConfig {
    #[serde(rename_all = "camelCase")]
    SsmPaths {
        hostname_ssm_path: String,
        port_ssm_path: String,
        username_ssm_path: String,
        password_ssm_path: String,
        database_name_ssm_path: String,
    },
    #[serde(rename_all = "camelCase")]
    SecretsManager {
        secret_arn: String,
        port: u16,
        database_name: String,
        hostname: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_arn: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ConnectionUri { connection_uri_ssm_path: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetAvailabilityZone {
    pub subnet_id: String,
    pub availability_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcConfig {
    pub vpc_id: String,
    pub security_group_ids: Vec<String>,
    pub subnet_availability_zone_config: Vec<SubnetAvailabilityZone>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedConcurrencyConfig {
    pub provisioned_concurrent_executions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlModelDataSourceStrategy {
    /// Unique among strategies, used to name the Lambda and its data source.
    pub name: String,
    pub db_type: SqlDbType,
    pub db_connection_config: SqlConnectionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_configuration: Option<VpcConfig>,
    /// Statements `@sql(reference:)` can point at, by reference name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub custom_sql_statements: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_lambda_provisioned_concurrency_config: Option<ProvisionedConcurrencyConfig>,
}

impl SqlModelDataSourceStrategy {
    /// The data source name. Its resource is `{name}LambdaDataSource`.
    pub fn lambda_data_source_name(&self) -> String {
        format!("{}Lambda", self.name)
    }

    pub fn lambda_function_name(&self) -> String {
        format!("{}LambdaFunction", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum DynamoDbProvisionStrategy {
    Default,
    AmplifyTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dbType", rename_all = "SCREAMING_SNAKE_CASE")]
enum RawStrategy {
    #[serde(rename = "DYNAMODB", rename_all = "camelCase")]
    DynamoDb { provision_strategy: DynamoDbProvisionStrategy },
    Mysql(SqlStrategyBody),
    Postgres(SqlStrategyBody),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SqlStrategyBody {
    name: String,
    db_connection_config: SqlConnectionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vpc_configuration: Option<VpcConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    custom_sql_statements: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sql_lambda_provisioned_concurrency_config: Option<ProvisionedConcurrencyConfig>,
}

/// The backing store of one model. Serialized with a `dbType` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawStrategy", into = "RawStrategy")]
pub enum ModelDataSourceStrategy {
    /// A table provisioned with plain CloudFormation.
    #[default]
    DefaultDynamoDb,
    /// A table provisioned through the Amplify table custom resource.
    AmplifyManagedDynamoDb,
    SqlLambda(SqlModelDataSourceStrategy),
}

impl ModelDataSourceStrategy {
    pub fn is_sql(&self) -> bool {
        matches!(self, ModelDataSourceStrategy::SqlLambda(_))
    }

    pub fn is_dynamo_db(&self) -> bool {
        !self.is_sql()
    }

    pub fn as_sql(&self) -> Option<&SqlModelDataSourceStrategy> {
        match self {
            ModelDataSourceStrategy::SqlLambda(strategy) => Some(strategy),
            _ => None,
        }
    }
}

impl From<RawStrategy> for ModelDataSourceStrategy {
    fn from(raw: RawStrategy) -> Self {
        let (db_type, body) = match raw {
            RawStrategy::DynamoDb {
                provision_strategy: DynamoDbProvisionStrategy::Default,
            } => return ModelDataSourceStrategy::DefaultDynamoDb,
            RawStrategy::DynamoDb {
                provision_strategy: DynamoDbProvisionStrategy::AmplifyTable,
            } => return ModelDataSourceStrategy::AmplifyManagedDynamoDb,
            RawStrategy::Mysql(body) => (SqlDbType::Mysql, body),
            RawStrategy::Postgres(body) => (SqlDbType::Postgres, body),
        };

        ModelDataSourceStrategy::SqlLambda(SqlModelDataSourceStrategy {
            name: body.name,
            db_type,
            db_connection_config: body.db_connection_config,
            vpc_configuration: body.vpc_configuration,
            custom_sql_statements: body.custom_sql_statements,
            sql_lambda_provisioned_concurrency_config: body.sql_lambda_provisioned_concurrency_config,
        })
    }
}

impl From<ModelDataSourceStrategy> for RawStrategy {
    fn from(strategy: ModelDataSourceStrategy) -> Self {
        match strategy {
            ModelDataSourceStrategy::DefaultDynamoDb => RawStrategy::DynamoDb {
                provision_strategy: DynamoDbProvisionStrategy::Default,
            },
            ModelDataSourceStrategy::AmplifyManagedDynamoDb => RawStrategy::DynamoDb {
                provision_strategy: DynamoDbProvisionStrategy::AmplifyTable,
            },
            ModelDataSourceStrategy::SqlLambda(strategy) => {
                let body = SqlStrategyBody {
                    name: strategy.name,
                    db_connection_config: strategy.db_connection_config,
                    vpc_configuration: strategy.vpc_configuration,
                    custom_sql_statements: strategy.custom_sql_statements,
                    sql_lambda_provisioned_concurrency_config: strategy.sql_lambda_provisioned_concurrency_config,
                };
                match strategy.db_type {
                    SqlDbType::Mysql => RawStrategy::Mysql(body),
                    SqlDbType::Postgres => RawStrategy::Postgres(body),
                }
            }
        }
    }
}
