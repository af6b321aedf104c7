use async_graphql_parser::{types as parser, Positioned};
use graphql_model_transformer::{
    connection_arguments, generator_for,
    names::{ModelNames, INPUT_ARG_SORT_DIRECTION, SORT_DIRECTION_TYPE},
    resources::SQL_STACK,
    OperationConfig, RelationLookup,
};
use graphql_transformer_core::{
    context::{ForeignKeyField, KeyDefinition, PipelineFunction, ResolverPipeline, SecondaryIndex},
    directive::get_arguments,
    document::ast,
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};

use crate::{
    arguments::{BelongsToArguments, HasManyArguments, HasOneArguments, RelationArguments},
    implicit_foreign_key, implicit_index_name, RelationKind,
};

/// Stack holding the resolvers of relational fields on DynamoDB models.
pub const CONNECTION_STACK: &str = "ConnectionStack";

const HAS_ONE_DIRECTIVE_DEFINITION: &str = r"
directive @hasOne(fields: [String!], references: [String!]) on FIELD_DEFINITION
";

const HAS_MANY_DIRECTIVE_DEFINITION: &str = r"
directive @hasMany(indexName: String, fields: [String!], references: [String!], limit: Int = 100) on FIELD_DEFINITION
";

const BELONGS_TO_DIRECTIVE_DEFINITION: &str = r"
directive @belongsTo(fields: [String!], references: [String!], overrideIndexName: String) on FIELD_DEFINITION
";

#[derive(Debug)]
struct Relation {
    model_name: String,
    field_name: String,
    related_model: String,
    arguments: RelationArguments,
    pos: async_graphql_parser::Pos,
    lookup: Option<RelationLookup>,
}

/// Handles one of the three relational directives. The chain holds one instance per directive.
#[derive(Debug)]
pub struct RelationTransformer {
    kind: RelationKind,
    relations: Vec<Relation>,
}

impl RelationTransformer {
    pub fn new(kind: RelationKind) -> Self {
        RelationTransformer {
            kind,
            relations: Vec::new(),
        }
    }

    pub fn has_one() -> Self {
        Self::new(RelationKind::HasOne)
    }

    pub fn has_many() -> Self {
        Self::new(RelationKind::HasMany)
    }

    pub fn belongs_to() -> Self {
        Self::new(RelationKind::BelongsTo)
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    fn arguments(
        &self,
        directive: &Positioned<parser::ConstDirective>,
        deep_merge: bool,
    ) -> Result<RelationArguments, TransformerError> {
        Ok(match self.kind {
            RelationKind::HasOne => get_arguments::<HasOneArguments>(directive, deep_merge)?.0,
            RelationKind::HasMany => get_arguments::<HasManyArguments>(directive, deep_merge)?.0,
            RelationKind::BelongsTo => get_arguments::<BelongsToArguments>(directive, deep_merge)?.0,
        })
    }

    /// Work out how `relation` reaches its related records, adding implicit foreign keys and
    /// indexes on the way.
    fn resolve_lookup(
        &self,
        relation: &Relation,
        ctx: &mut TransformerContext,
    ) -> Result<RelationLookup, TransformerError> {
        let kind = self.kind;
        let model_name = relation.model_name.as_str();
        let related_model = relation.related_model.as_str();
        let parent_key = ctx.keys().primary_key(model_name);
        let related_key = ctx.keys().primary_key(related_model);
        let related_is_sql = ctx.is_sql_model(related_model);

        let mismatch = |expected: &KeyDefinition, target: &str, provided: usize| {
            let expected = expected.fields().count();
            (expected != provided).then(|| {
                TransformerError::invalid_directive_at(
                    format!(
                        "The number of fields provided to @{kind} on {model_name}.{} ({provided}) must match the number of primary key fields on {target} ({expected}).",
                        relation.field_name
                    ),
                    relation.pos,
                )
            })
        };

        let lookup = match (kind, &relation.arguments.fields, &relation.arguments.references) {
            (RelationKind::HasOne | RelationKind::HasMany, None, Some(references)) => {
                if let Some(err) = mismatch(&parent_key, model_name, references.len()) {
                    return Err(err);
                }
                for reference in references {
                    if ctx.output().field(related_model, reference).is_none() {
                        return Err(TransformerError::invalid_directive_at(
                            format!("Reference field '{reference}' must exist on the related model {related_model}."),
                            relation.pos,
                        ));
                    }
                }

                let many = kind == RelationKind::HasMany;
                let index_name = match (&relation.arguments.index_name, related_is_sql) {
                    (_, true) => None,
                    (Some(index_name), false) => {
                        Some(existing_index(ctx, related_model, index_name, relation)?.name.clone())
                    }
                    (None, false) if !many && references.iter().map(String::as_str).eq(related_key.fields()) => None,
                    (None, false) => {
                        let key = KeyDefinition::new(references[0].as_str(), references[1..].to_vec());
                        let index_name = implicit_index_name(model_name, &relation.field_name);
                        Some(ensure_index(ctx, related_model, index_name, key)?)
                    }
                };

                RelationLookup {
                    index_name,
                    key_bindings: references
                        .iter()
                        .cloned()
                        .zip(parent_key.fields().map(str::to_owned))
                        .collect(),
                    many,
                }
            }
            (RelationKind::BelongsTo, None, Some(references)) => {
                if let Some(err) = mismatch(&related_key, related_model, references.len()) {
                    return Err(err);
                }
                for reference in references {
                    if ctx.output().field(model_name, reference).is_none() {
                        return Err(TransformerError::invalid_directive_at(
                            format!("Reference field '{reference}' must exist on {model_name}."),
                            relation.pos,
                        ));
                    }
                }
                RelationLookup {
                    index_name: None,
                    key_bindings: related_key.fields().map(str::to_owned).zip(references.iter().cloned()).collect(),
                    many: false,
                }
            }
            (RelationKind::HasOne | RelationKind::BelongsTo, Some(fields), None) => {
                if let Some(err) = mismatch(&related_key, related_model, fields.len()) {
                    return Err(err);
                }
                check_fields_exist(ctx, relation, fields)?;
                RelationLookup {
                    index_name: None,
                    key_bindings: related_key.fields().map(str::to_owned).zip(fields.iter().cloned()).collect(),
                    many: false,
                }
            }
            (RelationKind::HasMany, Some(fields), None) => {
                check_fields_exist(ctx, relation, fields)?;
                let (index_name, key) = match &relation.arguments.index_name {
                    Some(index_name) => {
                        let index = existing_index(ctx, related_model, index_name, relation)?;
                        (Some(index.name.clone()), index.key.clone())
                    }
                    None => (None, related_key),
                };
                if fields.len() > key.fields().count() {
                    return Err(TransformerError::invalid_directive_at(
                        format!(
                            "Too many fields provided to @hasMany on {model_name}.{}: the key of {related_model} has {} fields.",
                            relation.field_name,
                            key.fields().count()
                        ),
                        relation.pos,
                    ));
                }
                RelationLookup {
                    index_name,
                    key_bindings: key.fields().map(str::to_owned).zip(fields.iter().cloned()).collect(),
                    many: true,
                }
            }
            (RelationKind::HasOne, None, None) => {
                let foreign_key = implicit_foreign_key(model_name, &relation.field_name);
                add_foreign_key_field(ctx, model_name, &foreign_key, related_model, &relation.field_name)?;
                RelationLookup {
                    index_name: None,
                    key_bindings: vec![(related_key.partition_key.clone(), foreign_key)],
                    many: false,
                }
            }
            (RelationKind::BelongsTo, None, None) => {
                // Reuse the key written by a `@hasMany` or `@hasOne` pointing back at us.
                let foreign_key = ctx
                    .metadata()
                    .implicit_foreign_keys(model_name)
                    .iter()
                    .find(|foreign_key| foreign_key.related_model == related_model)
                    .map(|foreign_key| foreign_key.field_name.clone());
                let foreign_key = match foreign_key {
                    Some(foreign_key) => foreign_key,
                    None => {
                        let foreign_key = implicit_foreign_key(model_name, &relation.field_name);
                        add_foreign_key_field(ctx, model_name, &foreign_key, related_model, &relation.field_name)?;
                        foreign_key
                    }
                };
                RelationLookup {
                    index_name: None,
                    key_bindings: vec![(related_key.partition_key.clone(), foreign_key)],
                    many: false,
                }
            }
            (RelationKind::HasMany, None, None) => {
                let foreign_key = implicit_foreign_key(model_name, &relation.field_name);
                add_foreign_key_field(ctx, related_model, &foreign_key, model_name, &relation.field_name)?;
                let index_name = if related_is_sql {
                    None
                } else {
                    Some(ensure_index(
                        ctx,
                        related_model,
                        implicit_index_name(model_name, &relation.field_name),
                        KeyDefinition::new(foreign_key.as_str(), Vec::new()),
                    )?)
                };
                RelationLookup {
                    index_name,
                    key_bindings: vec![(foreign_key, parent_key.partition_key.clone())],
                    many: true,
                }
            }
            (_, Some(_), Some(_)) => {
                return Err(TransformerError::invalid_directive_at(
                    format!("'fields' and 'references' cannot be used together on @{kind}."),
                    relation.pos,
                ))
            }
        };

        Ok(lookup)
    }
}

fn check_fields_exist(ctx: &TransformerContext, relation: &Relation, fields: &[String]) -> HookResult {
    match fields
        .iter()
        .find(|field| ctx.output().field(&relation.model_name, field).is_none())
    {
        Some(missing) => Err(TransformerError::invalid_directive_at(
            format!("{missing} is not a field in {}.", relation.model_name),
            relation.pos,
        )),
        None => Ok(()),
    }
}

fn existing_index<'a>(
    ctx: &'a TransformerContext,
    model_name: &str,
    index_name: &str,
    relation: &Relation,
) -> Result<&'a SecondaryIndex, TransformerError> {
    ctx.keys().find_index(model_name, index_name).ok_or_else(|| {
        TransformerError::invalid_directive_at(
            format!("Index {index_name} does not exist for model {model_name}."),
            relation.pos,
        )
    })
}

fn ensure_index(
    ctx: &mut TransformerContext,
    model_name: &str,
    index_name: String,
    key: KeyDefinition,
) -> Result<String, TransformerError> {
    if ctx.keys().find_index(model_name, &index_name).is_none() {
        ctx.keys_mut().add_index(
            model_name,
            SecondaryIndex {
                name: index_name.clone(),
                key,
                query_field: None,
            },
        )?;
    }
    Ok(index_name)
}

/// Add a nullable `ID` field on `model_name` and remember it belongs to the relation.
fn add_foreign_key_field(
    ctx: &mut TransformerContext,
    model_name: &str,
    foreign_key: &str,
    related_model: &str,
    relation_field: &str,
) -> HookResult {
    ctx.output_mut()
        .add_field_if_absent(model_name, ast::field(foreign_key, ast::named_type("ID")))?;
    ctx.metadata_mut().add_implicit_foreign_key(
        model_name,
        ForeignKeyField {
            field_name: foreign_key.to_owned(),
            related_model: related_model.to_owned(),
            relation_field: relation_field.to_owned(),
        },
    );
    Ok(())
}

impl TransformerPlugin for RelationTransformer {
    fn name(&self) -> &str {
        match self.kind {
            RelationKind::HasOne => "HasOneTransformer",
            RelationKind::HasMany => "HasManyTransformer",
            RelationKind::BelongsTo => "BelongsToTransformer",
        }
    }

    fn directive_definitions(&self) -> &str {
        match self.kind {
            RelationKind::HasOne => HAS_ONE_DIRECTIVE_DEFINITION,
            RelationKind::HasMany => HAS_MANY_DIRECTIVE_DEFINITION,
            RelationKind::BelongsTo => BELONGS_TO_DIRECTIVE_DEFINITION,
        }
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let kind = self.kind;
        let model_name = parent.node.name.node.as_str();
        let field_name = field.node.name.node.as_str();
        let arguments = self.arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;

        if !ast::has_directive(&parent.node.directives, "model") {
            return Err(TransformerError::invalid_directive_at(
                format!("@{kind} must be on an @model object type field."),
                directive.pos,
            ));
        }

        let related_model = ast::base_type_name(&field.node.ty.node).to_owned();
        if !ctx.input_document().is_model(&related_model) {
            return Err(TransformerError::invalid_directive_at(
                format!("Object type {related_model} must be annotated with @model."),
                directive.pos,
            ));
        }

        let is_list = ast::is_list_type(&field.node.ty.node);
        match (kind, is_list) {
            (RelationKind::HasMany, false) => {
                return Err(TransformerError::invalid_directive_at(
                    "@hasMany must be used with a list. Use @hasOne for non-list types.",
                    directive.pos,
                ))
            }
            (RelationKind::HasOne | RelationKind::BelongsTo, true) => {
                return Err(TransformerError::invalid_directive_at(
                    format!("@{kind} cannot be used with lists. Use @hasMany instead."),
                    directive.pos,
                ))
            }
            _ => (),
        }

        let is_sql = ctx.is_sql_model(model_name) || ctx.is_sql_model(&related_model);
        if is_sql && arguments.references.is_none() {
            return Err(TransformerError::invalid_directive_at(
                format!("@{kind} on {model_name}.{field_name} requires 'references' when either model is backed by SQL."),
                directive.pos,
            ));
        }

        let involves_join_model = ctx.metadata().join_model_of(model_name).is_some()
            || ctx.metadata().join_model_of(&related_model).is_some();
        if arguments.fields.is_some() && !involves_join_model && !ctx.parameters().allow_gen1_patterns {
            ctx.logger().warn(format!(
                "fields argument on @{kind} is deprecated. Modify {model_name}.{field_name} to use references instead. This functionality will be removed in the next major release."
            ));
        }

        self.relations.push(Relation {
            model_name: model_name.to_owned(),
            field_name: field_name.to_owned(),
            related_model,
            arguments,
            pos: directive.pos,
            lookup: None,
        });
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let mut lookups = Vec::with_capacity(self.relations.len());
        for relation in &self.relations {
            lookups.push(self.resolve_lookup(relation, ctx)?);
            ctx.metadata_mut()
                .add_relational_field(&relation.model_name, relation.field_name.as_str());
        }
        for (relation, lookup) in self.relations.iter_mut().zip(lookups) {
            relation.lookup = Some(lookup);
        }
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        if self.kind != RelationKind::HasMany {
            return Ok(());
        }

        for relation in &self.relations {
            let mut arguments = vec![ast::input_value(INPUT_ARG_SORT_DIRECTION, ast::named_type(SORT_DIRECTION_TYPE))];
            arguments.extend(connection_arguments(&relation.related_model));

            let field = ctx
                .output_mut()
                .field_mut(&relation.model_name, &relation.field_name)
                .ok_or_else(|| {
                    TransformerError::schema_validation(format!(
                        "Field {}.{} disappeared from the schema.",
                        relation.model_name, relation.field_name
                    ))
                })?;
            field.node.arguments = arguments;
            field.node.ty = ast::positioned(ast::named_type(&ModelNames::connection(&relation.related_model)));
        }
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for relation in &self.relations {
            let Some(lookup) = &relation.lookup else {
                continue;
            };

            let strategy = ctx.strategy_for(&relation.related_model).clone();
            let generator = generator_for(&strategy);
            let config = OperationConfig::new(ctx, &relation.related_model);
            let templates = generator.relation(&config, lookup);
            let stack = if strategy.is_sql() { SQL_STACK } else { CONNECTION_STACK };

            tracing::debug!(
                model = %relation.model_name,
                field = %relation.field_name,
                related = %relation.related_model,
                index = ?lookup.index_name,
                "generated relation resolver"
            );

            ctx.resolvers_mut().add_resolver(
                ResolverPipeline::pipeline(
                    relation.model_name.as_str(),
                    relation.field_name.as_str(),
                    PipelineFunction::new(
                        Some(generator.data_source_name(&relation.related_model)),
                        templates.request,
                        templates.response,
                    ),
                )
                .in_stack(stack),
            )?;
        }
        Ok(())
    }
}
