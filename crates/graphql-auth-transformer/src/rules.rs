//! `@auth` rules and the roles derived from them.

use graphql_transformer_core::{
    access_control::{ModelOperation, MODEL_OPERATIONS, READ_OPERATIONS},
    directive::DirectiveArguments,
    parameters::{AppSyncAuthConfiguration, AuthenticationType},
    TransformerError,
};
use serde::Deserialize;

pub const DEFAULT_OWNER_FIELD: &str = "owner";
pub const DEFAULT_GROUP_CLAIM: &str = "cognito:groups";
pub const DEFAULT_GROUPS_FIELD: &str = "groups";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AuthStrategy {
    Owner,
    Groups,
    Private,
    Public,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AuthProvider {
    ApiKey,
    Iam,
    IdentityPool,
    Oidc,
    UserPools,
    Function,
}

impl AuthProvider {
    pub fn authentication_type(self) -> AuthenticationType {
        match self {
            AuthProvider::ApiKey => AuthenticationType::ApiKey,
            AuthProvider::Iam | AuthProvider::IdentityPool => AuthenticationType::AwsIam,
            AuthProvider::Oidc => AuthenticationType::OpenidConnect,
            AuthProvider::UserPools => AuthenticationType::AmazonCognitoUserPools,
            AuthProvider::Function => AuthenticationType::AwsLambda,
        }
    }

    /// Value of `$util.authType()` for requests authorized by this provider.
    pub fn auth_type_name(self) -> &'static str {
        match self {
            AuthProvider::ApiKey => "API Key Authorization",
            AuthProvider::Iam | AuthProvider::IdentityPool => "IAM Authorization",
            AuthProvider::Oidc => "Open ID Connect Authorization",
            AuthProvider::UserPools => "User Pool Authorization",
            AuthProvider::Function => "Lambda Authorization",
        }
    }

    /// The AppSync directive marking a type or field as reachable through this provider.
    pub fn appsync_directive(self) -> &'static str {
        match self {
            AuthProvider::ApiKey => "aws_api_key",
            AuthProvider::Iam | AuthProvider::IdentityPool => "aws_iam",
            AuthProvider::Oidc => "aws_oidc",
            AuthProvider::UserPools => "aws_cognito_user_pools",
            AuthProvider::Function => "aws_lambda",
        }
    }

    fn description(self) -> &'static str {
        match self {
            AuthProvider::ApiKey => "API Key",
            AuthProvider::Iam | AuthProvider::IdentityPool => "IAM",
            AuthProvider::Oidc => "OpenID Connect",
            AuthProvider::UserPools => "Cognito User Pools",
            AuthProvider::Function => "Lambda",
        }
    }
}

/// Operation names accepted in `operations`. `read` covers every read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthOperation {
    Create,
    Update,
    Delete,
    Read,
    Get,
    List,
    Sync,
    Listen,
    Search,
}

impl AuthOperation {
    fn expand(self) -> &'static [ModelOperation] {
        match self {
            AuthOperation::Create => &[ModelOperation::Create],
            AuthOperation::Update => &[ModelOperation::Update],
            AuthOperation::Delete => &[ModelOperation::Delete],
            AuthOperation::Read => &READ_OPERATIONS,
            AuthOperation::Get => &[ModelOperation::Get],
            AuthOperation::List => &[ModelOperation::List],
            AuthOperation::Sync => &[ModelOperation::Sync],
            AuthOperation::Listen => &[ModelOperation::Listen],
            AuthOperation::Search => &[ModelOperation::Search],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRule {
    pub allow: AuthStrategy,
    pub provider: Option<AuthProvider>,
    pub owner_field: Option<String>,
    pub identity_claim: Option<String>,
    pub group_claim: Option<String>,
    pub groups: Option<Vec<String>>,
    pub groups_field: Option<String>,
    pub operations: Option<Vec<AuthOperation>>,
}

impl AuthRule {
    pub fn provider(&self) -> AuthProvider {
        self.provider.unwrap_or(match self.allow {
            AuthStrategy::Owner | AuthStrategy::Groups | AuthStrategy::Private => AuthProvider::UserPools,
            AuthStrategy::Public => AuthProvider::ApiKey,
            AuthStrategy::Custom => AuthProvider::Function,
        })
    }

    /// Operations granted by the rule, `read` expanded.
    pub fn model_operations(&self) -> Vec<ModelOperation> {
        match &self.operations {
            None => MODEL_OPERATIONS.to_vec(),
            Some(operations) => {
                let mut expanded: Vec<ModelOperation> = Vec::new();
                for operation in operations.iter().flat_map(|operation| operation.expand()) {
                    if !expanded.contains(operation) {
                        expanded.push(*operation);
                    }
                }
                expanded
            }
        }
    }

    /// Rules whose outcome depends on the record being read or written.
    pub fn is_record_dependent(&self) -> bool {
        self.allow == AuthStrategy::Owner || (self.allow == AuthStrategy::Groups && self.groups_field.is_some())
    }

    /// Field of the model holding owners or groups, created when the schema does not declare it.
    pub fn implicit_field(&self) -> Option<(&str, bool)> {
        match self.allow {
            AuthStrategy::Owner => Some((self.owner_field.as_deref().unwrap_or(DEFAULT_OWNER_FIELD), false)),
            AuthStrategy::Groups => self.groups_field.as_deref().map(|field| (field, true)),
            _ => None,
        }
    }

    fn check(&self) -> Result<(), String> {
        let provider = self.provider();
        let allowed: &[AuthProvider] = match self.allow {
            AuthStrategy::Owner | AuthStrategy::Groups => &[AuthProvider::UserPools, AuthProvider::Oidc],
            AuthStrategy::Private => &[AuthProvider::UserPools, AuthProvider::Oidc, AuthProvider::Iam],
            AuthStrategy::Public => &[AuthProvider::ApiKey, AuthProvider::Iam, AuthProvider::IdentityPool],
            AuthStrategy::Custom => &[AuthProvider::Function],
        };

        if !allowed.contains(&provider) {
            let allowed = allowed.iter().map(|provider| format!("'{provider}'")).collect::<Vec<_>>();
            return Err(format!(
                "@auth directive with '{}' strategy only supports {} providers, but found '{provider}' assigned.",
                self.allow,
                allowed.join(", ")
            ));
        }

        if self.allow == AuthStrategy::Groups {
            match (&self.groups, &self.groups_field) {
                (None, None) => {
                    return Err("@auth rules using groups must specify either 'groups' or 'groupsField'.".to_owned())
                }
                (Some(_), Some(_)) => {
                    return Err("@auth rules using groups cannot specify both 'groups' and 'groupsField'.".to_owned())
                }
                (Some(groups), None) if groups.is_empty() => {
                    return Err("@auth rules using static groups must list at least one group.".to_owned())
                }
                _ => (),
            }
        } else if self.groups.is_some() || self.groups_field.is_some() {
            return Err(format!(
                "'groups' and 'groupsField' can only be used with the 'groups' strategy, found '{}'.",
                self.allow
            ));
        }

        if self.allow != AuthStrategy::Owner && self.owner_field.is_some() {
            return Err(format!("'ownerField' can only be used with the 'owner' strategy, found '{}'.", self.allow));
        }

        Ok(())
    }

    /// Fails when the rule's provider is not enabled for the API.
    pub fn check_provider(&self, auth_config: &AppSyncAuthConfiguration) -> Result<(), TransformerError> {
        let provider = self.provider();
        if auth_config.is_enabled(provider.authentication_type()) {
            return Ok(());
        }
        Err(TransformerError::InvalidAuthRule(format!(
            "@auth directive with '{provider}' provider found, but the project has no {} authentication provider configured.",
            provider.description()
        )))
    }

    /// The roles the rule grants. Static group rules give one role per group.
    pub fn roles(&self, default_identity_claim: &str) -> Vec<RoleDefinition> {
        let provider = self.provider();
        let kinds = match self.allow {
            AuthStrategy::Public => vec![RoleKind::Public],
            AuthStrategy::Private => vec![RoleKind::Private],
            AuthStrategy::Custom => vec![RoleKind::Custom],
            AuthStrategy::Owner => vec![RoleKind::Owner {
                field: self.owner_field.clone().unwrap_or_else(|| DEFAULT_OWNER_FIELD.to_owned()),
                claim: self
                    .identity_claim
                    .clone()
                    .unwrap_or_else(|| default_identity_claim.to_owned()),
            }],
            AuthStrategy::Groups => {
                let claim = self.group_claim.clone().unwrap_or_else(|| DEFAULT_GROUP_CLAIM.to_owned());
                match &self.groups_field {
                    Some(field) => vec![RoleKind::DynamicGroup {
                        field: field.clone(),
                        claim,
                    }],
                    None => self
                        .groups
                        .iter()
                        .flatten()
                        .map(|group| RoleKind::StaticGroup {
                            group: group.clone(),
                            claim: claim.clone(),
                        })
                        .collect(),
                }
            }
        };

        kinds.into_iter().map(|kind| RoleDefinition::new(provider, kind)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleKind {
    Public,
    Private,
    Custom,
    Owner { field: String, claim: String },
    StaticGroup { group: String, claim: String },
    DynamicGroup { field: String, claim: String },
}

/// A role of the access control matrix together with what is needed to check it at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    pub name: String,
    pub provider: AuthProvider,
    pub kind: RoleKind,
}

impl RoleDefinition {
    pub fn new(provider: AuthProvider, kind: RoleKind) -> Self {
        let name = match &kind {
            RoleKind::Public => format!("{provider}:public"),
            RoleKind::Private => format!("{provider}:private"),
            RoleKind::Custom => format!("{provider}:custom"),
            RoleKind::Owner { field, .. } => format!("{provider}:owner:{field}"),
            RoleKind::StaticGroup { group, .. } => format!("{provider}:staticGroup:{group}"),
            RoleKind::DynamicGroup { field, claim } => format!("{provider}:dynamicGroup:{claim}:{field}"),
        };
        RoleDefinition { name, provider, kind }
    }

    /// The role every model without `@auth` is open to, derived from the API's default provider.
    pub fn default_for(authentication_type: AuthenticationType) -> Self {
        match authentication_type {
            AuthenticationType::ApiKey => RoleDefinition::new(AuthProvider::ApiKey, RoleKind::Public),
            AuthenticationType::AwsIam => RoleDefinition::new(AuthProvider::Iam, RoleKind::Private),
            AuthenticationType::AmazonCognitoUserPools => {
                RoleDefinition::new(AuthProvider::UserPools, RoleKind::Private)
            }
            AuthenticationType::OpenidConnect => RoleDefinition::new(AuthProvider::Oidc, RoleKind::Private),
            AuthenticationType::AwsLambda => RoleDefinition::new(AuthProvider::Function, RoleKind::Custom),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthArguments {
    pub rules: Vec<AuthRule>,
}

impl DirectiveArguments for AuthArguments {
    const NAME: &'static str = "auth";

    fn validate(&self) -> Result<(), String> {
        if self.rules.is_empty() {
            return Err("@auth requires at least one rule.".to_owned());
        }
        self.rules.iter().try_for_each(AuthRule::check)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn rule(value: serde_json::Value) -> AuthRule {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    #[case::api_key(json!({ "allow": "public" }), &["apiKey:public"])]
    #[case::iam_public(json!({ "allow": "public", "provider": "iam" }), &["iam:public"])]
    #[case::iam_private(json!({ "allow": "private", "provider": "iam" }), &["iam:private"])]
    #[case::owner(json!({ "allow": "owner" }), &["userPools:owner:owner"])]
    #[case::custom_owner(
        json!({ "allow": "owner", "ownerField": "editor", "provider": "oidc" }),
        &["oidc:owner:editor"]
    )]
    #[case::static_groups(
        json!({ "allow": "groups", "groups": ["Admin", "Dev"] }),
        &["userPools:staticGroup:Admin", "userPools:staticGroup:Dev"]
    )]
    #[case::dynamic_groups(
        json!({ "allow": "groups", "groupsField": "editors" }),
        &["userPools:dynamicGroup:cognito:groups:editors"]
    )]
    #[case::custom(json!({ "allow": "custom" }), &["function:custom"])]
    fn role_names(#[case] value: serde_json::Value, #[case] expected: &[&str]) {
        let roles = rule(value).roles("sub::username");
        let names: Vec<_> = roles.iter().map(|role| role.name.as_str()).collect();

        assert_eq!(names, expected);
    }

    #[test]
    fn read_expands_to_every_read_operation() {
        let rule = rule(json!({ "allow": "public", "operations": ["create", "read"] }));

        assert_eq!(
            rule.model_operations(),
            [
                ModelOperation::Create,
                ModelOperation::Get,
                ModelOperation::List,
                ModelOperation::Sync,
                ModelOperation::Listen,
                ModelOperation::Search,
            ]
        );
    }

    #[test]
    fn owner_rules_reject_api_keys() {
        let error = rule(json!({ "allow": "owner", "provider": "apiKey" })).check().unwrap_err();

        assert_eq!(
            error,
            "@auth directive with 'owner' strategy only supports 'userPools', 'oidc' providers, but found 'apiKey' assigned."
        );
    }

    #[test]
    fn groups_need_groups_or_a_field() {
        let error = rule(json!({ "allow": "groups" })).check().unwrap_err();

        assert_eq!(error, "@auth rules using groups must specify either 'groups' or 'groupsField'.");
    }

    #[test]
    fn provider_must_be_configured() {
        let error = rule(json!({ "allow": "owner" }))
            .check_provider(&AppSyncAuthConfiguration::default())
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "@auth directive with 'userPools' provider found, but the project has no Cognito User Pools authentication provider configured."
        );
    }
}
