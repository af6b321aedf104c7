//! `@auth` support.
//!
//! Rules from the model and its fields are turned into roles and recorded in an
//! [`AccessControlMatrix`] per model during `prepare`. Every resolver the other plugins generate for
//! a protected model then gets an `auth` slot built from the matrix in `after`, once the full
//! resolver set exists.

#![cfg_attr(test, allow(unused_crate_dependencies))]

pub mod rules;
mod templates;

use async_graphql_parser::{types as parser, Positioned};
use graphql_model_transformer::names::ModelNames;
use graphql_transformer_core::{
    access_control::{AccessControlMatrix, ModelOperation, MODEL_OPERATIONS},
    context::{PipelineFunction, ResolverPipeline, Slot},
    directive::get_arguments,
    document::{ast, MODEL_DIRECTIVE},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use indexmap::IndexMap;
use indoc::formatdoc;

use rules::{AuthArguments, AuthProvider, AuthRule, RoleDefinition, RoleKind};
use templates::{auth_request, AllowedRole, AUTH_RESPONSE};

pub const AUTH_DIRECTIVE_DEFINITION: &str = r"
directive @auth(rules: [AuthRule!]!) on OBJECT | FIELD_DEFINITION

input AuthRule {
  allow: AuthStrategy!
  provider: AuthProvider
  identityClaim: String
  groupClaim: String
  ownerField: String
  groupsField: String
  groups: [String]
  operations: [ModelOperation]
}

enum AuthStrategy {
  owner
  groups
  private
  public
  custom
}

enum AuthProvider {
  apiKey
  iam
  identityPool
  oidc
  userPools
  function
}

enum ModelOperation {
  create
  update
  delete
  read
  get
  list
  sync
  listen
  search
}
";

/// Rules of one model: those on the type and those on individual fields.
#[derive(Debug, Default)]
struct ModelRules {
    model: Vec<AuthRule>,
    fields: IndexMap<String, Vec<AuthRule>>,
}

#[derive(Debug, Default)]
pub struct AuthTransformer {
    models: IndexMap<String, ModelRules>,
    /// Rules on fields of non-model types such as custom queries, keyed by `(type, field)`.
    custom_fields: IndexMap<(String, String), Vec<AuthRule>>,
    /// Every role seen, by name.
    roles: IndexMap<String, RoleDefinition>,
}

impl AuthTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    fn default_identity_claim(ctx: &TransformerContext) -> &'static str {
        if ctx.parameters().use_sub_username_for_default_identity_claim {
            "sub::username"
        } else {
            "username"
        }
    }

    fn read_rules(
        &mut self,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &TransformerContext,
    ) -> Result<Vec<AuthRule>, TransformerError> {
        let arguments: AuthArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;

        let claim = Self::default_identity_claim(ctx);
        for rule in &arguments.rules {
            rule.check_provider(ctx.auth_config())?;
            for role in rule.roles(claim) {
                self.roles.entry(role.name.clone()).or_insert(role);
            }
        }
        Ok(arguments.rules)
    }

    fn roles_of(&self, rule: &AuthRule, ctx: &TransformerContext) -> Vec<String> {
        rule.roles(Self::default_identity_claim(ctx))
            .into_iter()
            .map(|role| role.name)
            .collect()
    }

    /// The matrix of a protected model. Models with field rules only stay open to the default
    /// provider on their other fields.
    fn access_control_matrix(
        &mut self,
        model_name: &str,
        rules: &ModelRules,
        ctx: &TransformerContext,
    ) -> Result<AccessControlMatrix, TransformerError> {
        let resources = ctx
            .output()
            .fields(model_name)
            .iter()
            .map(|field| field.node.name.node.to_string())
            .collect();
        let mut matrix = AccessControlMatrix::new(model_name, &MODEL_OPERATIONS, resources);

        if rules.model.is_empty() {
            let role = RoleDefinition::default_for(ctx.auth_config().default_authentication_type());
            matrix.set_role(&role.name, None, &MODEL_OPERATIONS)?;
            self.roles.entry(role.name.clone()).or_insert(role);
        }
        for rule in &rules.model {
            for role in self.roles_of(rule, ctx) {
                matrix.set_role(&role, None, &rule.model_operations())?;
            }
        }

        for (field_name, field_rules) in &rules.fields {
            matrix.reset_access_for_resource(field_name)?;
            for rule in field_rules {
                for role in self.roles_of(rule, ctx) {
                    matrix.set_role(&role, Some(field_name.as_str()), &rule.model_operations())?;
                }
            }
        }

        Ok(matrix)
    }

    fn allowed_roles<'a>(
        &'a self,
        matrix: &'a AccessControlMatrix,
        operation: ModelOperation,
        resource: Option<&str>,
    ) -> Vec<AllowedRole<'a>> {
        matrix
            .roles_per_operation(operation, resource)
            .into_iter()
            .filter_map(|role_name| self.roles.get(role_name))
            .map(|role| AllowedRole {
                role,
                denied_fields: match (operation, resource) {
                    (ModelOperation::Create | ModelOperation::Update, None) => matrix
                        .resources()
                        .iter()
                        .filter(|field| !matrix.is_allowed(&role.name, field.as_str(), operation))
                        .map(String::as_str)
                        .collect(),
                    _ => Vec::new(),
                },
            })
            .collect()
    }

    fn auth_function(
        &self,
        matrix: &AccessControlMatrix,
        operation: ModelOperation,
        resource: Option<&str>,
    ) -> PipelineFunction {
        let roles = self.allowed_roles(matrix, operation, resource);
        PipelineFunction::local(auth_request(&roles, operation), AUTH_RESPONSE)
    }

    fn providers(&self, matrix: &AccessControlMatrix) -> Vec<AuthProvider> {
        let mut providers = Vec::new();
        for role in matrix.roles().iter().filter_map(|name| self.roles.get(name)) {
            let directive = role.provider.appsync_directive();
            if !providers
                .iter()
                .any(|existing: &AuthProvider| existing.appsync_directive() == directive)
            {
                providers.push(role.provider);
            }
        }
        providers
    }
}

/// Add `field_name` to the model unless the schema already declares it.
fn add_implicit_field(ctx: &mut TransformerContext, model_name: &str, field_name: &str, is_list: bool) -> HookResult {
    let ty = if is_list {
        ast::list_of(ast::named_type("String"))
    } else {
        ast::named_type("String")
    };
    if ctx.output_mut().add_field_if_absent(model_name, ast::field(field_name, ty))? {
        tracing::debug!(model = model_name, field = field_name, "added implicit auth field");
    }
    Ok(())
}

fn add_appsync_directive(directives: &mut Vec<Positioned<parser::ConstDirective>>, directive_name: &str) {
    if !ast::has_directive(directives, directive_name) {
        directives.push(ast::directive(directive_name, Vec::new()));
    }
}

/// A field without a resolver of its own gets one that reads the value from its parent, so that
/// an auth slot can guard it.
fn field_resolver(model_name: &str, field_name: &str) -> ResolverPipeline {
    ResolverPipeline::pipeline(
        model_name,
        field_name,
        PipelineFunction::local(
            "{\n  \"version\": \"2018-05-29\",\n  \"payload\": {}\n}\n",
            formatdoc! {r"
                #if( $ctx.error )
                  $util.error($ctx.error.message, $ctx.error.type)
                #end
                $util.toJson($ctx.source.{field_name})
            "},
        ),
    )
    .in_stack(ModelNames::stack(model_name))
}

impl TransformerPlugin for AuthTransformer {
    fn name(&self) -> &str {
        "AuthTransformer"
    }

    fn directive_definitions(&self) -> &str {
        AUTH_DIRECTIVE_DEFINITION
    }

    fn object(
        &mut self,
        definition: &Positioned<parser::TypeDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let model_name = definition.node.name.node.as_str();
        if !ast::has_directive(&definition.node.directives, MODEL_DIRECTIVE) {
            return Err(TransformerError::invalid_directive_at(
                "Types annotated with @auth must also be annotated with @model.",
                directive.pos,
            ));
        }

        let rules = self.read_rules(directive, ctx)?;
        for (field_name, is_list) in rules.iter().filter_map(AuthRule::implicit_field) {
            add_implicit_field(ctx, model_name, field_name, is_list)?;
        }

        self.models.entry(model_name.to_owned()).or_default().model = rules;
        Ok(())
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let type_name = parent.node.name.node.as_str();
        let field_name = field.node.name.node.to_string();
        let rules = self.read_rules(directive, ctx)?;

        if !ast::has_directive(&parent.node.directives, MODEL_DIRECTIVE) {
            if rules.iter().any(AuthRule::is_record_dependent) {
                return Err(TransformerError::InvalidAuthRule(format!(
                    "@auth rules on {type_name}.{field_name} may not use owner or dynamic group authorization because {type_name} is not a model."
                )));
            }
            self.custom_fields.insert((type_name.to_owned(), field_name), rules);
            return Ok(());
        }

        for (implicit, is_list) in rules.iter().filter_map(AuthRule::implicit_field) {
            add_implicit_field(ctx, type_name, implicit, is_list)?;
        }
        self.models
            .entry(type_name.to_owned())
            .or_default()
            .fields
            .insert(field_name, rules);
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let models = std::mem::take(&mut self.models);
        for (model_name, rules) in &models {
            let matrix = self.access_control_matrix(model_name, rules, ctx)?;
            tracing::debug!(model = %model_name, roles = ?matrix.roles(), "built access control matrix");
            ctx.set_access_control(model_name.as_str(), matrix);
        }
        self.models = models;
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let multiple_providers = ctx.auth_config().has_multiple_providers();

        for model_name in self.models.keys() {
            let Some(matrix) = ctx.access_control(model_name).cloned() else {
                continue;
            };
            let resolver_fields = ctx.metadata().resolver_fields(model_name).to_vec();

            // Owners and group members subscribe to their own records only.
            let record_arguments: Vec<String> = matrix
                .roles_per_operation(ModelOperation::Listen, None)
                .into_iter()
                .filter_map(|name| self.roles.get(name))
                .filter_map(|role| match &role.kind {
                    RoleKind::Owner { field, .. } | RoleKind::DynamicGroup { field, .. } => Some(field.clone()),
                    _ => None,
                })
                .collect();

            for resolver_field in &resolver_fields {
                if resolver_field.operation.model_operation() != ModelOperation::Listen {
                    continue;
                }
                let Some(field) = ctx
                    .output_mut()
                    .field_mut(&resolver_field.type_name, &resolver_field.field_name)
                else {
                    continue;
                };
                for argument in &record_arguments {
                    if !field
                        .node
                        .arguments
                        .iter()
                        .any(|existing| existing.node.name.node.as_str() == argument)
                    {
                        field
                            .node
                            .arguments
                            .push(ast::input_value(argument, ast::named_type("String")));
                    }
                }
            }

            if !multiple_providers {
                continue;
            }

            let directives: Vec<_> = self
                .providers(&matrix)
                .into_iter()
                .map(AuthProvider::appsync_directive)
                .collect();
            let output = ctx.output_mut();
            for type_name in [model_name.clone(), ModelNames::connection(model_name)] {
                if let Some(definition) = output.type_definition_mut(&type_name) {
                    for directive in &directives {
                        add_appsync_directive(&mut definition.node.directives, directive);
                    }
                }
            }
            for resolver_field in &resolver_fields {
                if let Some(field) = output.field_mut(&resolver_field.type_name, &resolver_field.field_name) {
                    for directive in &directives {
                        add_appsync_directive(&mut field.node.directives, directive);
                    }
                }
            }
        }
        Ok(())
    }

    fn after(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let input = ctx.input_document();

        for (model_name, rules) in &self.models {
            let Some(matrix) = ctx.access_control(model_name).cloned() else {
                continue;
            };

            for resolver_field in ctx.metadata().resolver_fields(model_name).to_vec() {
                if !ctx
                    .resolvers()
                    .has_resolver(&resolver_field.type_name, &resolver_field.field_name)
                {
                    continue;
                }
                let operation = resolver_field.operation.model_operation();
                ctx.resolvers_mut().add_to_slot(
                    &resolver_field.type_name,
                    &resolver_field.field_name,
                    Slot::Auth,
                    self.auth_function(&matrix, operation, None),
                )?;
            }

            for field_name in rules.fields.keys() {
                if !ctx.resolvers().has_resolver(model_name, field_name) {
                    ctx.resolvers_mut().add_resolver(field_resolver(model_name, field_name))?;
                }
                ctx.resolvers_mut().add_to_slot(
                    model_name,
                    field_name,
                    Slot::Auth,
                    self.auth_function(&matrix, ModelOperation::Get, Some(field_name.as_str())),
                )?;
            }
        }

        // Relational fields inherit the read rules of the model they point at.
        for model_name in input.model_names() {
            for field_name in ctx.metadata().relational_fields(model_name).to_vec() {
                if self
                    .models
                    .get(model_name)
                    .is_some_and(|rules| rules.fields.contains_key(&field_name))
                {
                    continue;
                }
                let Some(field) = input.field(model_name, &field_name) else {
                    continue;
                };
                let related_model = ast::base_type_name(&field.node.ty.node);
                let Some(matrix) = ctx.access_control(related_model).cloned() else {
                    continue;
                };
                if !ctx.resolvers().has_resolver(model_name, &field_name) {
                    continue;
                }
                let operation = if ast::is_list_type(&field.node.ty.node) {
                    ModelOperation::List
                } else {
                    ModelOperation::Get
                };
                ctx.resolvers_mut().add_to_slot(
                    model_name,
                    &field_name,
                    Slot::Auth,
                    self.auth_function(&matrix, operation, None),
                )?;
            }
        }

        for ((type_name, field_name), rules) in &self.custom_fields {
            if !ctx.resolvers().has_resolver(type_name, field_name) {
                ctx.logger().warn(format!(
                    "@auth on {type_name}.{field_name} has no effect because the field has no resolver."
                ));
                continue;
            }

            let mut roles = Vec::new();
            for rule in rules {
                for role in self.roles_of(rule, ctx) {
                    if let Some(role) = self.roles.get(&role) {
                        roles.push(AllowedRole {
                            role,
                            denied_fields: Vec::new(),
                        });
                    }
                }
            }
            ctx.resolvers_mut().add_to_slot(
                type_name,
                field_name,
                Slot::Auth,
                PipelineFunction::local(auth_request(&roles, ModelOperation::Get), AUTH_RESPONSE),
            )?;
        }

        Ok(())
    }
}
