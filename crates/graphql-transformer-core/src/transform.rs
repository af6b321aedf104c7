//! The orchestration engine: runs every plugin through the transform phases.

use std::collections::{HashMap, HashSet};

use async_graphql_parser::{types as parser, Positioned};
use indexmap::IndexMap;
use serde_json::json;

use crate::{
    context::{DataSource, DataSourceKind, Resource, TransformerContext, TransformerContextOptions},
    directive::{DirectiveDefinitions, DirectiveLocation},
    document::{ast, SchemaDocument},
    error::SchemaLocation,
    log::TransformerLog,
    output::{DeploymentResources, Template},
    parameters::AuthenticationType,
    plugin::{HookResult, TransformerPlugin},
    TransformerError,
};

pub const GRAPHQL_API_LOGICAL_ID: &str = "GraphQLAPI";
pub const GRAPHQL_SCHEMA_LOGICAL_ID: &str = "GraphQLSchema";
pub const API_KEY_LOGICAL_ID: &str = "GraphQLAPIDefaultApiKey";
pub const NONE_DATA_SOURCE: &str = "NONE_DS";

/// Directives a SQL backed model cannot carry.
pub const SQL_UNSUPPORTED_DIRECTIVES: [&str; 6] =
    ["searchable", "predictions", "function", "manyToMany", "http", "mapsTo"];

#[derive(Debug, Clone, Copy, strum::Display)]
#[strum(serialize_all = "camelCase")]
enum Phase {
    Before,
    PreMutateSchema,
    Validate,
    Prepare,
    TransformSchema,
    GenerateResolvers,
    After,
}

#[derive(Default)]
pub struct TransformOptions {
    /// Plugins in the order their hooks run.
    pub transformers: Vec<Box<dyn TransformerPlugin>>,
    pub context: TransformerContextOptions,
    /// Explicit stack placement by logical id.
    pub stack_mapping: IndexMap<String, String>,
}

/// The result of one transform. Logs are returned whether or not the transform succeeded.
#[derive(Debug)]
pub struct TransformOutcome {
    pub result: Result<DeploymentResources, TransformerError>,
    pub logs: Vec<TransformerLog>,
}

impl TransformOutcome {
    pub fn into_result(self) -> Result<DeploymentResources, TransformerError> {
        self.result
    }
}

enum Dispatch<'a> {
    Type {
        definition: &'a Positioned<parser::TypeDefinition>,
        directive: &'a Positioned<parser::ConstDirective>,
    },
    Field {
        parent: &'a Positioned<parser::TypeDefinition>,
        field: &'a Positioned<parser::FieldDefinition>,
        directive: &'a Positioned<parser::ConstDirective>,
    },
}

pub struct GraphQLTransform {
    transformers: Vec<Box<dyn TransformerPlugin>>,
    definitions: DirectiveDefinitions,
    // directive name -> index in `transformers`
    registry: HashMap<String, usize>,
    options: TransformerContextOptions,
    stack_mapping: IndexMap<String, String>,
}

impl GraphQLTransform {
    pub fn new(options: TransformOptions) -> Result<Self, TransformerError> {
        if options.transformers.is_empty() {
            return Err(TransformerError::InvalidTransformerConfiguration(
                "Must provide at least one transformer.".to_owned(),
            ));
        }

        let mut definitions = DirectiveDefinitions::default();
        let mut registry = HashMap::new();

        for (index, transformer) in options.transformers.iter().enumerate() {
            for directive_name in definitions.add_sdl(transformer.directive_definitions())? {
                registry.insert(directive_name, index);
            }
        }

        Ok(GraphQLTransform {
            transformers: options.transformers,
            definitions,
            registry,
            options: options.context,
            stack_mapping: options.stack_mapping,
        })
    }

    pub fn transformer_names(&self) -> impl Iterator<Item = &str> {
        self.transformers.iter().map(|transformer| transformer.name())
    }

    /// Transform `schema`. A failed transform never returns deployment resources.
    pub fn transform(&mut self, schema: &str) -> TransformOutcome {
        let mut ctx = TransformerContext::new(SchemaDocument::default(), self.options.clone());

        match self.run(schema, &mut ctx) {
            Ok(()) => {
                let (resources, logs) = self.synthesize(ctx);
                TransformOutcome {
                    result: Ok(resources),
                    logs,
                }
            }
            Err(error) => {
                tracing::debug!("transform failed: {error}");
                TransformOutcome {
                    result: Err(error),
                    logs: ctx.logger().drain(),
                }
            }
        }
    }

    fn run(&mut self, schema: &str, ctx: &mut TransformerContext) -> Result<(), TransformerError> {
        let mut document = SchemaDocument::parse(schema)?;

        check_sql_unsupported_directives(&document, ctx)?;
        add_api_resources(ctx)?;
        for (logical_id, stack_name) in &self.stack_mapping {
            ctx.resources_mut().map_resource_to_stack(stack_name, logical_id);
        }

        self.run_phase(Phase::Before, ctx, |transformer, ctx| transformer.before(ctx))?;

        {
            let _span = tracing::debug_span!("phase", phase = %Phase::PreMutateSchema).entered();
            for transformer in &mut self.transformers {
                tracing::debug!(transformer = transformer.name(), "preMutateSchema");
                transformer.pre_mutate_schema(&mut document, ctx)?;
            }
        }
        ctx.reset_documents(document);

        self.visit(ctx)?;

        self.run_phase(Phase::Validate, ctx, |transformer, ctx| transformer.validate(ctx))?;
        self.run_phase(Phase::Prepare, ctx, |transformer, ctx| transformer.prepare(ctx))?;
        self.run_phase(Phase::TransformSchema, ctx, |transformer, ctx| {
            transformer.transform_schema(ctx)
        })?;
        self.run_phase(Phase::GenerateResolvers, ctx, |transformer, ctx| {
            transformer.generate_resolvers(ctx)
        })?;
        self.run_phase(Phase::After, ctx, |transformer, ctx| transformer.after(ctx))?;

        Ok(())
    }

    fn run_phase(
        &mut self,
        phase: Phase,
        ctx: &mut TransformerContext,
        hook: impl Fn(&mut Box<dyn TransformerPlugin>, &mut TransformerContext) -> HookResult,
    ) -> HookResult {
        let _span = tracing::debug_span!("phase", phase = %phase).entered();

        for transformer in &mut self.transformers {
            tracing::debug!(transformer = transformer.name(), "{phase}");
            hook(transformer, ctx)?;
        }

        Ok(())
    }

    /// Walk the schema once, validating every directive application against its declaration, then
    /// invoke the hooks grouped by plugin so each plugin sees all its directives before the next.
    fn visit(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let _span = tracing::debug_span!("phase", phase = "visit").entered();

        let document = ctx.input_document();
        let mut dispatches = Vec::new();

        for definition in document.types() {
            let location = match &definition.node.kind {
                parser::TypeKind::Scalar => DirectiveLocation::Scalar,
                parser::TypeKind::Object(_) => DirectiveLocation::Object,
                parser::TypeKind::Interface(_) => DirectiveLocation::Interface,
                parser::TypeKind::Union(_) => DirectiveLocation::Union,
                parser::TypeKind::Enum(_) => DirectiveLocation::Enum,
                parser::TypeKind::InputObject(_) => DirectiveLocation::InputObject,
            };

            for (index, directive) in self.applied_directives(&definition.node.directives, location)? {
                dispatches.push((index, Dispatch::Type { definition, directive }));
            }

            match &definition.node.kind {
                parser::TypeKind::Object(_) | parser::TypeKind::Interface(_) => {
                    for field in ast::object_fields(&definition.node) {
                        for (index, directive) in
                            self.applied_directives(&field.node.directives, DirectiveLocation::FieldDefinition)?
                        {
                            dispatches.push((
                                index,
                                Dispatch::Field {
                                    parent: definition,
                                    field,
                                    directive,
                                },
                            ));
                        }

                        for argument in &field.node.arguments {
                            self.applied_directives(&argument.node.directives, DirectiveLocation::ArgumentDefinition)?;
                        }
                    }
                }
                parser::TypeKind::InputObject(input) => {
                    for field in &input.fields {
                        self.applied_directives(&field.node.directives, DirectiveLocation::InputFieldDefinition)?;
                    }
                }
                parser::TypeKind::Enum(enum_type) => {
                    for value in &enum_type.values {
                        self.applied_directives(&value.node.directives, DirectiveLocation::EnumValue)?;
                    }
                }
                parser::TypeKind::Scalar | parser::TypeKind::Union(_) => {}
            }
        }

        dispatches.sort_by_key(|(index, _)| *index);

        for (index, dispatch) in dispatches {
            let transformer = &mut self.transformers[index];
            match dispatch {
                Dispatch::Type { definition, directive } => {
                    tracing::debug!(
                        transformer = transformer.name(),
                        "@{} on {}",
                        directive.node.name.node,
                        definition.node.name.node
                    );
                    match &definition.node.kind {
                        parser::TypeKind::Object(_) => transformer.object(definition, directive, ctx)?,
                        parser::TypeKind::Interface(_) => transformer.interface(definition, directive, ctx)?,
                        parser::TypeKind::InputObject(_) => transformer.input_object(definition, directive, ctx)?,
                        parser::TypeKind::Enum(_) => transformer.enum_type(definition, directive, ctx)?,
                        parser::TypeKind::Scalar | parser::TypeKind::Union(_) => {}
                    }
                }
                Dispatch::Field {
                    parent,
                    field,
                    directive,
                } => {
                    tracing::debug!(
                        transformer = transformer.name(),
                        "@{} on {}.{}",
                        directive.node.name.node,
                        parent.node.name.node,
                        field.node.name.node
                    );
                    transformer.field(parent, field, directive, ctx)?;
                }
            }
        }

        Ok(())
    }

    /// The registered plugin of every transformer directive in `directives`, after validating the
    /// application. AppSync directives are skipped.
    fn applied_directives<'a>(
        &self,
        directives: &'a [Positioned<parser::ConstDirective>],
        location: DirectiveLocation,
    ) -> Result<Vec<(usize, &'a Positioned<parser::ConstDirective>)>, TransformerError> {
        let mut seen = HashSet::new();
        let mut applied = Vec::new();

        for directive in directives {
            let name = directive.node.name.node.as_str();
            if is_appsync_directive(name) {
                continue;
            }

            let Some(index) = self.registry.get(name).copied() else {
                return Err(TransformerError::schema_validation_at(
                    format!("Unknown directive \"@{name}\"."),
                    directive.pos,
                ));
            };

            self.definitions.validate(directive, location)?;

            if !seen.insert(name) && !self.definitions.is_repeatable(name) {
                return Err(TransformerError::invalid_directive_at(
                    format!("The directive \"@{name}\" can only be used once at this location."),
                    directive.pos,
                ));
            }

            applied.push((index, directive));
        }

        Ok(applied)
    }

    fn synthesize(&self, ctx: TransformerContext) -> (DeploymentResources, Vec<TransformerLog>) {
        let mut parts = ctx.into_parts();

        let schema = parts.output.to_sdl(|name| !self.definitions.contains(name));

        let mut root_stack = Template::default();
        let mut stacks: IndexMap<String, Template> = IndexMap::new();
        let mut stack_mapping = IndexMap::new();

        let mut place = |logical_id: String, resource: Resource, stack: Option<String>| match stack {
            Some(stack) => {
                stack_mapping.insert(logical_id.clone(), stack.clone());
                stacks.entry(stack).or_default().resources.insert(logical_id, resource);
            }
            None => {
                root_stack.resources.insert(logical_id, resource);
            }
        };

        let explicit_stack = |logical_id: &str| parts.resources.stack_mapping().get(logical_id).cloned();

        for (logical_id, resource) in parts.resources.resources() {
            let stack = parts.resources.stack_for(logical_id).map(str::to_owned);
            place(logical_id.to_owned(), resource.clone(), stack);
        }

        let needs_none_data_source = parts.resolvers.resolvers().any(|resolver| {
            resolver
                .functions()
                .iter()
                .any(|(_, function)| function.data_source.is_none())
        });
        if needs_none_data_source {
            parts
                .data_sources
                .add_if_absent(DataSource::new(NONE_DATA_SOURCE, DataSourceKind::None, json!({})));
        }

        for data_source in parts.data_sources.iter() {
            let logical_id = format!("{}DataSource", data_source.name);
            let resource = Resource::new(
                "AWS::AppSync::DataSource",
                json!({
                    "ApiId": { "Fn::GetAtt": [GRAPHQL_API_LOGICAL_ID, "ApiId"] },
                    "Name": data_source.name,
                    "Type": data_source.kind.to_string(),
                    "Config": data_source.config,
                }),
            );
            let stack = explicit_stack(&logical_id).or_else(|| data_source.stack.clone());
            place(logical_id, resource, stack);
        }

        let mut resolvers = IndexMap::new();

        for resolver in parts.resolvers.resolvers() {
            let functions: Vec<_> = resolver
                .functions()
                .into_iter()
                .map(|(stem, function)| {
                    json!({
                        "DataSourceName": function.data_source.as_deref().unwrap_or(NONE_DATA_SOURCE),
                        "RequestMappingTemplateS3Location": format!("resolvers/{stem}.req.vtl"),
                        "ResponseMappingTemplateS3Location": format!("resolvers/{stem}.res.vtl"),
                    })
                })
                .collect();

            let logical_id = format!(
                "{}{}Resolver",
                resolver.type_name(),
                ast::upper_first(resolver.field_name())
            );
            let resource = Resource::new(
                "AWS::AppSync::Resolver",
                json!({
                    "ApiId": { "Fn::GetAtt": [GRAPHQL_API_LOGICAL_ID, "ApiId"] },
                    "TypeName": resolver.type_name(),
                    "FieldName": resolver.field_name(),
                    "Kind": resolver.kind(),
                    "Functions": functions,
                }),
            )
            .depends_on(GRAPHQL_SCHEMA_LOGICAL_ID);
            let stack = explicit_stack(&logical_id).or_else(|| resolver.stack().map(str::to_owned));
            place(logical_id, resource, stack);

            for (key, template) in resolver.templates() {
                resolvers.insert(key, template.as_str().to_owned());
            }
        }

        for stack_name in stacks.keys() {
            root_stack.resources.insert(
                stack_name.clone(),
                Resource::new(
                    "AWS::CloudFormation::Stack",
                    json!({
                        "TemplateURL": format!("stacks/{stack_name}.json"),
                        "Parameters": { "AppSyncApiId": { "Fn::GetAtt": [GRAPHQL_API_LOGICAL_ID, "ApiId"] } },
                    }),
                )
                .depends_on(GRAPHQL_SCHEMA_LOGICAL_ID),
            );
        }

        root_stack.parameters.insert(
            "AppSyncApiName".to_owned(),
            json!({ "Type": "String", "Default": "AppSyncSimpleTransform" }),
        );
        if self.options.parameters.enable_transformer_cfn_outputs {
            root_stack.outputs.insert(
                "GraphQLAPIIdOutput".to_owned(),
                json!({ "Value": { "Fn::GetAtt": [GRAPHQL_API_LOGICAL_ID, "ApiId"] } }),
            );
            root_stack.outputs.insert(
                "GraphQLAPIEndpointOutput".to_owned(),
                json!({ "Value": { "Fn::GetAtt": [GRAPHQL_API_LOGICAL_ID, "GraphQLUrl"] } }),
            );
        }

        let access_control = parts
            .access_control
            .iter()
            .map(|(model_name, matrix)| (model_name.clone(), matrix.summary()))
            .collect();

        let resources = DeploymentResources {
            schema,
            root_stack,
            stacks,
            resolvers,
            functions: parts.functions,
            stack_mapping,
            access_control,
        };

        (resources, parts.logger.drain())
    }
}

/// AppSync's own directives pass through the transform untouched.
pub fn is_appsync_directive(directive_name: &str) -> bool {
    directive_name == "deprecated" || directive_name.starts_with("aws_")
}

fn check_sql_unsupported_directives(document: &SchemaDocument, ctx: &TransformerContext) -> HookResult {
    let unsupported = |directives: &[Positioned<parser::ConstDirective>]| {
        directives
            .iter()
            .map(|directive| directive.node.name.node.as_str())
            .find(|name| SQL_UNSUPPORTED_DIRECTIVES.contains(name))
            .map(str::to_owned)
    };

    for definition in document.types() {
        let type_name = definition.node.name.node.as_str();
        if !document.is_model(type_name) || !ctx.is_sql_model(type_name) {
            continue;
        }

        let violation = unsupported(&definition.node.directives)
            .map(|directive| {
                (
                    directive,
                    SchemaLocation::Type {
                        name: type_name.to_owned(),
                    },
                )
            })
            .or_else(|| {
                ast::object_fields(&definition.node).iter().find_map(|field| {
                    unsupported(&field.node.directives).map(|directive| {
                        (
                            directive,
                            SchemaLocation::Field {
                                type_name: type_name.to_owned(),
                                field_name: field.node.name.node.to_string(),
                            },
                        )
                    })
                })
            });

        if let Some((directive, location)) = violation {
            return Err(TransformerError::UnsupportedDirectiveOnSql {
                directive,
                location,
                disallowed: SQL_UNSUPPORTED_DIRECTIVES.to_vec(),
            });
        }
    }

    Ok(())
}

fn add_api_resources(ctx: &mut TransformerContext) -> HookResult {
    let auth_config = ctx.auth_config().clone();
    let suppress_api_key = ctx.parameters().suppress_api_key_generation;

    let additional_providers: Vec<_> = auth_config
        .additional_authentication_providers
        .iter()
        .map(|provider| json!({ "AuthenticationType": provider.authentication_type.to_string() }))
        .collect();

    ctx.resources_mut().set_resource(
        GRAPHQL_API_LOGICAL_ID,
        Resource::new(
            "AWS::AppSync::GraphQLApi",
            json!({
                "Name": { "Ref": "AppSyncApiName" },
                "AuthenticationType": auth_config.default_authentication_type().to_string(),
                "AdditionalAuthenticationProviders": additional_providers,
            }),
        ),
    )?;

    ctx.resources_mut().set_resource(
        GRAPHQL_SCHEMA_LOGICAL_ID,
        Resource::new(
            "AWS::AppSync::GraphQLSchema",
            json!({
                "ApiId": { "Fn::GetAtt": [GRAPHQL_API_LOGICAL_ID, "ApiId"] },
                "DefinitionS3Location": "schema.graphql",
            }),
        ),
    )?;

    if auth_config.is_enabled(AuthenticationType::ApiKey) && !suppress_api_key {
        let expiration_days = auth_config
            .provider(AuthenticationType::ApiKey)
            .and_then(|provider| provider.api_key_config.as_ref())
            .and_then(|config| config.api_key_expiration_days)
            .unwrap_or(7);

        ctx.resources_mut().set_resource(
            API_KEY_LOGICAL_ID,
            Resource::new(
                "AWS::AppSync::ApiKey",
                json!({
                    "ApiId": { "Fn::GetAtt": [GRAPHQL_API_LOGICAL_ID, "ApiId"] },
                    "ExpiresInDays": expiration_days,
                }),
            ),
        )?;
    }

    Ok(())
}
