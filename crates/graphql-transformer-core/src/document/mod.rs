//! The mutable, in-memory GraphQL SDL document plugins read and rewrite.

pub mod ast;
mod printer;

use async_graphql_parser::{types as parser, Positioned};
use indexmap::IndexMap;

use crate::TransformerError;

pub use printer::print_document;

pub const MODEL_DIRECTIVE: &str = "model";

const DEFAULT_QUERY_TYPE: &str = "Query";
const DEFAULT_MUTATION_TYPE: &str = "Mutation";
const DEFAULT_SUBSCRIPTION_TYPE: &str = "Subscription";

/// A GraphQL schema keyed by type name.
///
/// Type extensions are folded into their base definition when the document is parsed, so every
/// type appears exactly once.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    schema: Option<Positioned<parser::SchemaDefinition>>,
    types: IndexMap<String, Positioned<parser::TypeDefinition>>,
}

impl SchemaDocument {
    pub fn parse(sdl: &str) -> Result<Self, TransformerError> {
        let document = async_graphql_parser::parse_schema(sdl)
            .map_err(|err| TransformerError::schema_validation(format!("Syntax error: {err}")))?;

        let mut schema = SchemaDocument::default();

        for definition in document.definitions {
            match definition {
                parser::TypeSystemDefinition::Type(definition) => schema.merge_definition(definition)?,
                parser::TypeSystemDefinition::Schema(definition) => {
                    if schema.schema.is_some() && !definition.node.extend {
                        return Err(TransformerError::schema_validation_at(
                            "Duplicate schema definition",
                            definition.pos,
                        ));
                    }
                    schema.schema = Some(definition);
                }
                // Directive definitions come from the registered plugins, not from user input.
                parser::TypeSystemDefinition::Directive(_) => (),
            }
        }

        Ok(schema)
    }

    fn merge_definition(&mut self, mut definition: Positioned<parser::TypeDefinition>) -> Result<(), TransformerError> {
        let type_name = definition.node.name.node.to_string();

        let Some(existing) = self.types.get_mut(&type_name) else {
            definition.node.extend = false;
            self.types.insert(type_name, definition);
            return Ok(());
        };

        if !definition.node.extend {
            return Err(TransformerError::schema_validation_at(
                format!("Schema validation failed. There can be only one type named \"{type_name}\"."),
                definition.pos,
            ));
        }

        existing.node.directives.append(&mut definition.node.directives);
        match (&mut existing.node.kind, definition.node.kind) {
            (parser::TypeKind::Object(existing), parser::TypeKind::Object(mut extension)) => {
                existing.implements.append(&mut extension.implements);
                existing.fields.append(&mut extension.fields);
            }
            (parser::TypeKind::Interface(existing), parser::TypeKind::Interface(mut extension)) => {
                existing.fields.append(&mut extension.fields);
            }
            (parser::TypeKind::InputObject(existing), parser::TypeKind::InputObject(mut extension)) => {
                existing.fields.append(&mut extension.fields);
            }
            (parser::TypeKind::Enum(existing), parser::TypeKind::Enum(mut extension)) => {
                existing.values.append(&mut extension.values);
            }
            (parser::TypeKind::Union(existing), parser::TypeKind::Union(mut extension)) => {
                existing.members.append(&mut extension.members);
            }
            (parser::TypeKind::Scalar, parser::TypeKind::Scalar) => {}
            _ => {
                return Err(TransformerError::schema_validation_at(
                    format!("Cannot extend \"{type_name}\" with a definition of a different kind."),
                    definition.pos,
                ))
            }
        }

        Ok(())
    }

    pub fn types(&self) -> impl Iterator<Item = &Positioned<parser::TypeDefinition>> {
        self.types.values()
    }

    pub fn schema_definition(&self) -> Option<&Positioned<parser::SchemaDefinition>> {
        self.schema.as_ref()
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn type_definition(&self, type_name: &str) -> Option<&Positioned<parser::TypeDefinition>> {
        self.types.get(type_name)
    }

    pub fn type_definition_mut(&mut self, type_name: &str) -> Option<&mut Positioned<parser::TypeDefinition>> {
        self.types.get_mut(type_name)
    }

    /// The object or interface fields of a type, if it has any.
    pub fn fields(&self, type_name: &str) -> &[Positioned<parser::FieldDefinition>] {
        self.types
            .get(type_name)
            .map(|definition| ast::object_fields(&definition.node))
            .unwrap_or(&[])
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&Positioned<parser::FieldDefinition>> {
        self.fields(type_name)
            .iter()
            .find(|field| field.node.name.node == field_name)
    }

    pub fn field_mut(&mut self, type_name: &str, field_name: &str) -> Option<&mut Positioned<parser::FieldDefinition>> {
        self.types
            .get_mut(type_name)
            .and_then(|definition| ast::object_fields_mut(&mut definition.node))
            .and_then(|fields| fields.iter_mut().find(|field| field.node.name.node == field_name))
    }

    pub fn is_object(&self, type_name: &str) -> bool {
        matches!(
            self.types.get(type_name).map(|definition| &definition.node.kind),
            Some(parser::TypeKind::Object(_))
        )
    }

    pub fn is_enum(&self, type_name: &str) -> bool {
        matches!(
            self.types.get(type_name).map(|definition| &definition.node.kind),
            Some(parser::TypeKind::Enum(_))
        )
    }

    pub fn enum_values(&self, type_name: &str) -> Vec<&str> {
        match self.types.get(type_name).map(|definition| &definition.node.kind) {
            Some(parser::TypeKind::Enum(enum_type)) => enum_type
                .values
                .iter()
                .map(|value| value.node.value.node.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether the type carries an `@model` directive.
    pub fn is_model(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|definition| ast::has_directive(&definition.node.directives, MODEL_DIRECTIVE))
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.types
            .values()
            .filter(|definition| ast::has_directive(&definition.node.directives, MODEL_DIRECTIVE))
            .map(|definition| definition.node.name.node.as_str())
    }

    /// Add a new type. Fails when a type with the same name already exists.
    pub fn add_type(&mut self, definition: Positioned<parser::TypeDefinition>) -> Result<(), TransformerError> {
        let type_name = definition.node.name.node.to_string();
        if self.types.contains_key(&type_name) {
            return Err(TransformerError::resource_conflict(format!(
                "Conflicting type '{type_name}' found."
            )));
        }
        self.types.insert(type_name, definition);
        Ok(())
    }

    /// Add a type unless one with the same name is already present. Used for shared input types
    /// such as `ModelStringInput` that several models generate.
    pub fn add_type_if_absent(&mut self, definition: Positioned<parser::TypeDefinition>) {
        let type_name = definition.node.name.node.to_string();
        self.types.entry(type_name).or_insert(definition);
    }

    /// Replace a type definition, inserting it if absent.
    pub fn put_type(&mut self, definition: Positioned<parser::TypeDefinition>) {
        let type_name = definition.node.name.node.to_string();
        self.types.insert(type_name, definition);
    }

    pub fn remove_type(&mut self, type_name: &str) -> Option<Positioned<parser::TypeDefinition>> {
        self.types.shift_remove(type_name)
    }

    /// Append a field to an object or interface type. Fails if the field already exists.
    pub fn add_field(
        &mut self,
        type_name: &str,
        field: Positioned<parser::FieldDefinition>,
    ) -> Result<(), TransformerError> {
        let definition = self
            .types
            .get_mut(type_name)
            .ok_or_else(|| TransformerError::schema_validation(format!("Type {type_name} does not exist.")))?;

        let fields = ast::object_fields_mut(&mut definition.node)
            .ok_or_else(|| TransformerError::schema_validation(format!("Type {type_name} has no fields.")))?;

        if fields.iter().any(|existing| existing.node.name.node == field.node.name.node) {
            return Err(TransformerError::resource_conflict(format!(
                "Object type {type_name} already has a field named {}.",
                field.node.name.node
            )));
        }

        fields.push(field);
        Ok(())
    }

    /// Append a field unless one with the same name is already present.
    pub fn add_field_if_absent(
        &mut self,
        type_name: &str,
        field: Positioned<parser::FieldDefinition>,
    ) -> Result<bool, TransformerError> {
        if self.field(type_name, &field.node.name.node).is_some() {
            return Ok(false);
        }
        self.add_field(type_name, field).map(|()| true)
    }

    pub fn input_field_mut(
        &mut self,
        type_name: &str,
        field_name: &str,
    ) -> Option<&mut Positioned<parser::InputValueDefinition>> {
        self.types
            .get_mut(type_name)
            .and_then(|definition| ast::input_fields_mut(&mut definition.node))
            .and_then(|fields| fields.iter_mut().find(|field| field.node.name.node == field_name))
    }

    /// Append an input field unless one with the same name is already present.
    pub fn add_input_field_if_absent(
        &mut self,
        type_name: &str,
        field: Positioned<parser::InputValueDefinition>,
    ) -> Result<bool, TransformerError> {
        let definition = self
            .types
            .get_mut(type_name)
            .ok_or_else(|| TransformerError::schema_validation(format!("Input {type_name} does not exist.")))?;

        let fields = ast::input_fields_mut(&mut definition.node)
            .ok_or_else(|| TransformerError::schema_validation(format!("Type {type_name} is not an input type.")))?;

        if fields.iter().any(|existing| existing.node.name.node == field.node.name.node) {
            return Ok(false);
        }

        fields.push(field);
        Ok(true)
    }

    pub fn query_type_name(&self) -> &str {
        self.schema
            .as_ref()
            .and_then(|schema| schema.node.query.as_ref())
            .map_or(DEFAULT_QUERY_TYPE, |name| name.node.as_str())
    }

    pub fn mutation_type_name(&self) -> &str {
        self.schema
            .as_ref()
            .and_then(|schema| schema.node.mutation.as_ref())
            .map_or(DEFAULT_MUTATION_TYPE, |name| name.node.as_str())
    }

    pub fn subscription_type_name(&self) -> &str {
        self.schema
            .as_ref()
            .and_then(|schema| schema.node.subscription.as_ref())
            .map_or(DEFAULT_SUBSCRIPTION_TYPE, |name| name.node.as_str())
    }

    pub fn add_query_field(&mut self, field: Positioned<parser::FieldDefinition>) -> Result<(), TransformerError> {
        let type_name = self.query_type_name().to_owned();
        self.add_root_field(&type_name, field)
    }

    pub fn add_mutation_field(&mut self, field: Positioned<parser::FieldDefinition>) -> Result<(), TransformerError> {
        let type_name = self.mutation_type_name().to_owned();
        self.add_root_field(&type_name, field)
    }

    pub fn add_subscription_field(
        &mut self,
        field: Positioned<parser::FieldDefinition>,
    ) -> Result<(), TransformerError> {
        let type_name = self.subscription_type_name().to_owned();
        self.add_root_field(&type_name, field)
    }

    fn add_root_field(
        &mut self,
        type_name: &str,
        field: Positioned<parser::FieldDefinition>,
    ) -> Result<(), TransformerError> {
        if !self.types.contains_key(type_name) {
            self.types
                .insert(type_name.to_owned(), ast::object_type(type_name, Vec::new()));
        }
        self.add_field(type_name, field)
    }

    /// Render the document as SDL, leaving out every directive for which `keep_directive` is false.
    pub fn to_sdl(&self, keep_directive: impl Fn(&str) -> bool) -> String {
        print_document(self, &keep_directive)
    }
}
