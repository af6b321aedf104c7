use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Feature flags that tune how the transformers behave.
///
/// Every key is optional when deserialized; missing keys take the documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformParameters {
    /// Merge nested directive arguments key by key with their defaults instead of replacing them.
    pub should_deep_merge_directive_config_defaults: bool,
    pub disable_resolver_deduping: bool,
    pub sandbox_mode_enabled: bool,
    pub use_sub_username_for_default_identity_claim: bool,
    pub populate_owner_field_for_static_group_auth: bool,
    pub secondary_key_as_gsi: bool,
    pub enable_auto_index_query_names: bool,
    pub respect_primary_key_attributes_on_connection_field: bool,
    pub enable_search_node_to_node_encryption: bool,
    pub subscriptions_inherit_primary_auth: bool,
    pub suppress_api_key_generation: bool,
    pub allow_destructive_graphql_schema_updates: bool,
    pub replace_table_upon_gsi_update: bool,
    /// When false, `fields` on relational directives, `@manyToMany` and `@searchable` log a
    /// deprecation warning.
    pub allow_gen1_patterns: bool,
    pub enable_transformer_cfn_outputs: bool,
    pub enable_gen2_migration: bool,
}

impl Default for TransformParameters {
    fn default() -> Self {
        TransformParameters {
            should_deep_merge_directive_config_defaults: true,
            disable_resolver_deduping: true,
            sandbox_mode_enabled: false,
            use_sub_username_for_default_identity_claim: true,
            populate_owner_field_for_static_group_auth: true,
            secondary_key_as_gsi: true,
            enable_auto_index_query_names: true,
            respect_primary_key_attributes_on_connection_field: true,
            enable_search_node_to_node_encryption: false,
            subscriptions_inherit_primary_auth: false,
            suppress_api_key_generation: false,
            allow_destructive_graphql_schema_updates: false,
            replace_table_upon_gsi_update: false,
            allow_gen1_patterns: true,
            enable_transformer_cfn_outputs: false,
            enable_gen2_migration: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationType {
    ApiKey,
    AwsIam,
    AmazonCognitoUserPools,
    OpenidConnect,
    AwsLambda,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_expiration_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPoolConfig {
    pub user_pool_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenIdConnectConfig {
    pub name: String,
    pub issuer_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat_ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_ttl: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaAuthorizerConfig {
    pub lambda_function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

/// One way clients may authenticate against the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSyncAuthProvider {
    pub authentication_type: AuthenticationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_config: Option<ApiKeyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pool_config: Option<UserPoolConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_id_connect_config: Option<OpenIdConnectConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_authorizer_config: Option<LambdaAuthorizerConfig>,
}

impl AppSyncAuthProvider {
    pub fn new(authentication_type: AuthenticationType) -> Self {
        AppSyncAuthProvider {
            authentication_type,
            api_key_config: None,
            user_pool_config: None,
            open_id_connect_config: None,
            lambda_authorizer_config: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSyncAuthConfiguration {
    pub default_authentication: AppSyncAuthProvider,
    #[serde(default)]
    pub additional_authentication_providers: Vec<AppSyncAuthProvider>,
}

impl Default for AppSyncAuthConfiguration {
    fn default() -> Self {
        AppSyncAuthConfiguration {
            default_authentication: AppSyncAuthProvider::new(AuthenticationType::ApiKey),
            additional_authentication_providers: Vec::new(),
        }
    }
}

impl AppSyncAuthConfiguration {
    pub fn with_default(authentication_type: AuthenticationType) -> Self {
        AppSyncAuthConfiguration {
            default_authentication: AppSyncAuthProvider::new(authentication_type),
            additional_authentication_providers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_additional(mut self, authentication_type: AuthenticationType) -> Self {
        self.additional_authentication_providers
            .push(AppSyncAuthProvider::new(authentication_type));
        self
    }

    pub fn default_authentication_type(&self) -> AuthenticationType {
        self.default_authentication.authentication_type
    }

    pub fn authentication_types(&self) -> impl Iterator<Item = AuthenticationType> + '_ {
        std::iter::once(&self.default_authentication)
            .chain(&self.additional_authentication_providers)
            .map(|provider| provider.authentication_type)
    }

    pub fn provider(&self, authentication_type: AuthenticationType) -> Option<&AppSyncAuthProvider> {
        std::iter::once(&self.default_authentication)
            .chain(&self.additional_authentication_providers)
            .find(|provider| provider.authentication_type == authentication_type)
    }

    pub fn is_enabled(&self, authentication_type: AuthenticationType) -> bool {
        self.authentication_types().any(|enabled| enabled == authentication_type)
    }

    pub fn has_multiple_providers(&self) -> bool {
        !self.additional_authentication_providers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictHandlerType {
    Automerge,
    OptimisticConcurrency,
    Lambda,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaConflictHandler {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_arn: Option<String>,
}

/// DataStore conflict detection for a model or the whole project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub conflict_handler: ConflictHandlerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_conflict_handler: Option<LambdaConflictHandler>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<SyncConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub models: IndexMap<String, SyncConfig>,
}

impl ResolverConfig {
    /// Model level configuration wins over the project level one.
    pub fn sync_config_for(&self, model_name: &str) -> Option<&SyncConfig> {
        self.models.get(model_name).or(self.project.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_parameters_take_their_defaults() {
        let parameters: TransformParameters =
            serde_json::from_value(json!({ "allowGen1Patterns": false })).unwrap();

        assert!(!parameters.allow_gen1_patterns);
        assert!(parameters.should_deep_merge_directive_config_defaults);
        assert!(!parameters.suppress_api_key_generation);
    }

    #[test]
    fn auth_configuration_lists_every_provider() {
        let config: AppSyncAuthConfiguration = serde_json::from_value(json!({
            "defaultAuthentication": { "authenticationType": "AMAZON_COGNITO_USER_POOLS" },
            "additionalAuthenticationProviders": [{ "authenticationType": "API_KEY" }]
        }))
        .unwrap();

        assert_eq!(
            config.authentication_types().collect::<Vec<_>>(),
            [AuthenticationType::AmazonCognitoUserPools, AuthenticationType::ApiKey]
        );
        assert!(config.has_multiple_providers());
        assert!(!config.is_enabled(AuthenticationType::AwsIam));
    }

    #[test]
    fn model_sync_config_overrides_project() {
        let config = ResolverConfig {
            project: Some(SyncConfig {
                conflict_handler: ConflictHandlerType::Automerge,
                lambda_conflict_handler: None,
            }),
            models: IndexMap::from([(
                "Post".to_owned(),
                SyncConfig {
                    conflict_handler: ConflictHandlerType::OptimisticConcurrency,
                    lambda_conflict_handler: None,
                },
            )]),
        };

        assert_eq!(
            config.sync_config_for("Post").map(|sync| sync.conflict_handler),
            Some(ConflictHandlerType::OptimisticConcurrency)
        );
        assert_eq!(
            config.sync_config_for("Comment").map(|sync| sync.conflict_handler),
            Some(ConflictHandlerType::Automerge)
        );
    }
}
