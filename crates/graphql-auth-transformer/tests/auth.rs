#![allow(unused_crate_dependencies)]

use graphql_auth_transformer::AuthTransformer;
use graphql_model_transformer::ModelTransformer;
use graphql_transformer_core::{
    access_control::MODEL_OPERATIONS,
    context::TransformerContextOptions,
    parameters::{AppSyncAuthConfiguration, AuthenticationType},
    DeploymentResources, GraphQLTransform, TransformOptions, TransformerError, TransformerPlugin,
};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn transform_with(
    schema: &str,
    auth_config: AppSyncAuthConfiguration,
) -> Result<DeploymentResources, TransformerError> {
    let transformers: Vec<Box<dyn TransformerPlugin>> =
        vec![Box::new(ModelTransformer::new()), Box::new(AuthTransformer::new())];

    GraphQLTransform::new(TransformOptions {
        transformers,
        context: TransformerContextOptions {
            auth_config,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap()
    .transform(schema)
    .into_result()
}

fn user_pools() -> AppSyncAuthConfiguration {
    AppSyncAuthConfiguration::with_default(AuthenticationType::AmazonCognitoUserPools)
}

#[test]
fn owner_rule_grants_every_operation_to_the_owner_role() {
    let output = transform_with(
        indoc! {r"
            type Post @model @auth(rules: [{ allow: owner }]) {
              id: ID!
              title: String!
            }
        "},
        user_pools(),
    )
    .unwrap();

    let summary = &output.access_control["Post"];
    let roles: Vec<_> = summary.roles.keys().map(String::as_str).collect();
    assert_eq!(roles, ["userPools:owner:owner"]);
    assert_eq!(summary.roles["userPools:owner:owner"]["title"], MODEL_OPERATIONS.to_vec());

    // The implicit owner field is added to the model.
    assert!(output.schema.contains("  owner: String\n"));

    let list = &output.resolvers["Query.listPosts.auth.1.req.vtl"];
    assert!(list.contains("## userPools:owner:owner"));
    assert!(list.contains("$util.qr($authFilter.add({ \"owner\": { \"eq\": $ownerClaim } }))"));

    let create = &output.resolvers["Mutation.createPost.auth.1.req.vtl"];
    assert!(create.contains("$util.qr($ctx.args.input.put(\"owner\", $ownerClaim))"));

    let on_create = output
        .schema
        .lines()
        .find(|line| line.contains("onCreatePost("))
        .unwrap();
    assert!(on_create.contains("owner: String"));
}

#[test]
fn static_groups_become_one_role_per_group() {
    let output = transform_with(
        indoc! {r#"
            type Salary @model @auth(rules: [{ allow: groups, groups: ["Admin", "Accounting"] }]) {
              id: ID!
              wage: Int
            }
        "#},
        user_pools(),
    )
    .unwrap();

    let roles: Vec<_> = output.access_control["Salary"].roles.keys().map(String::as_str).collect();
    assert_eq!(roles, ["userPools:staticGroup:Admin", "userPools:staticGroup:Accounting"]);

    let get = &output.resolvers["Query.getSalary.auth.1.req.vtl"];
    assert!(get.contains("#if( $groupClaim.contains(\"Admin\") )"));
    assert!(get.contains("#if( $groupClaim.contains(\"Accounting\") )"));
}

#[test]
fn field_rules_restrict_the_field_and_deny_writes_to_others() {
    let output = transform_with(
        indoc! {r#"
            type Employee @model @auth(rules: [{ allow: private }]) {
              id: ID!
              name: String
              salary: Int @auth(rules: [{ allow: groups, groups: ["Admin"] }])
            }
        "#},
        user_pools(),
    )
    .unwrap();

    let summary = &output.access_control["Employee"];
    assert!(!summary.roles["userPools:private"].contains_key("salary"));
    assert!(summary.roles["userPools:private"].contains_key("name"));
    assert_eq!(
        summary.roles["userPools:staticGroup:Admin"].keys().collect::<Vec<_>>(),
        ["salary"]
    );

    let update = &output.resolvers["Mutation.updateEmployee.auth.1.req.vtl"];
    assert!(update.contains("#set( $deniedFields = [\"salary\"] )"));

    let salary = &output.resolvers["Employee.salary.auth.1.req.vtl"];
    assert!(salary.contains("## userPools:staticGroup:Admin"));
    assert!(!salary.contains("## userPools:private"));
}

#[test]
fn models_without_auth_are_open_to_the_default_provider() {
    let output = transform_with(
        indoc! {r"
            type Todo @model {
              id: ID!
              secret: String @auth(rules: [{ allow: owner }])
            }
        "},
        user_pools(),
    )
    .unwrap();

    let roles: Vec<_> = output.access_control["Todo"].roles.keys().map(String::as_str).collect();
    assert_eq!(roles, ["userPools:private", "userPools:owner:owner"]);
}

#[test]
fn providers_must_be_configured() {
    let error = transform_with(
        indoc! {r"
            type Post @model @auth(rules: [{ allow: owner }]) {
              id: ID!
            }
        "},
        AppSyncAuthConfiguration::default(),
    )
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "@auth directive with 'userPools' provider found, but the project has no Cognito User Pools authentication provider configured."
    );
}

#[test]
fn auth_requires_a_model() {
    let error = transform_with(
        indoc! {r"
            type Note @auth(rules: [{ allow: public }]) {
              id: ID!
            }

            type Query {
              note: Note
            }
        "},
        AppSyncAuthConfiguration::default(),
    )
    .unwrap_err();

    assert!(error
        .to_string()
        .contains("Types annotated with @auth must also be annotated with @model."));
}

#[test]
fn multiple_providers_annotate_the_schema() {
    let output = transform_with(
        indoc! {r"
            type Post @model @auth(rules: [{ allow: public }, { allow: private }]) {
              id: ID!
            }
        "},
        AppSyncAuthConfiguration::with_default(AuthenticationType::ApiKey)
            .with_additional(AuthenticationType::AmazonCognitoUserPools),
    )
    .unwrap();

    assert!(output.schema.contains("type Post @aws_api_key @aws_cognito_user_pools {"));
}
