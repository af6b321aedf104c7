//! Input, filter and connection types generated for every model.

use async_graphql_parser::{types as parser, Positioned};
use async_graphql_value::Name;
use graphql_transformer_core::{
    context::KeyDefinition,
    document::{ast, SchemaDocument},
    TransformerError,
};
use indoc::indoc;

use crate::names::*;

const SHARED_TYPES: &str = indoc! {r"
    input ModelSizeInput {
      ne: Int
      eq: Int
      le: Int
      lt: Int
      ge: Int
      gt: Int
      between: [Int]
    }

    input ModelStringInput {
      ne: String
      eq: String
      le: String
      lt: String
      ge: String
      gt: String
      contains: String
      notContains: String
      between: [String]
      beginsWith: String
      attributeExists: Boolean
      attributeType: ModelAttributeTypes
      size: ModelSizeInput
    }

    input ModelIDInput {
      ne: ID
      eq: ID
      le: ID
      lt: ID
      ge: ID
      gt: ID
      contains: ID
      notContains: ID
      between: [ID]
      beginsWith: ID
      attributeExists: Boolean
      attributeType: ModelAttributeTypes
      size: ModelSizeInput
    }

    input ModelIntInput {
      ne: Int
      eq: Int
      le: Int
      lt: Int
      ge: Int
      gt: Int
      between: [Int]
      attributeExists: Boolean
      attributeType: ModelAttributeTypes
    }

    input ModelFloatInput {
      ne: Float
      eq: Float
      le: Float
      lt: Float
      ge: Float
      gt: Float
      between: [Float]
      attributeExists: Boolean
      attributeType: ModelAttributeTypes
    }

    input ModelBooleanInput {
      ne: Boolean
      eq: Boolean
      attributeExists: Boolean
      attributeType: ModelAttributeTypes
    }

    input ModelStringKeyConditionInput {
      eq: String
      le: String
      lt: String
      ge: String
      gt: String
      between: [String]
      beginsWith: String
    }

    input ModelIDKeyConditionInput {
      eq: ID
      le: ID
      lt: ID
      ge: ID
      gt: ID
      between: [ID]
      beginsWith: ID
    }

    input ModelIntKeyConditionInput {
      eq: Int
      le: Int
      lt: Int
      ge: Int
      gt: Int
      between: [Int]
    }

    input ModelFloatKeyConditionInput {
      eq: Float
      le: Float
      lt: Float
      ge: Float
      gt: Float
      between: [Float]
    }

    enum ModelAttributeTypes {
      binary
      binarySet
      bool
      list
      map
      number
      numberSet
      string
      stringSet
      _null
    }

    enum ModelSortDirection {
      ASC
      DESC
    }
"};

/// How a model field is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind<'a> {
    Scalar(&'a str),
    Enum(&'a str),
    /// A non-model object type stored inline.
    Embedded(&'a str),
    /// A field resolved through another model or an abstract type, never stored.
    Relation,
}

pub fn field_kind<'a>(document: &SchemaDocument, ty: &'a parser::Type) -> FieldKind<'a> {
    let type_name = ast::base_type_name(ty);

    if ast::is_scalar(type_name) {
        return FieldKind::Scalar(type_name);
    }

    match document.type_definition(type_name).map(|definition| &definition.node.kind) {
        Some(parser::TypeKind::Scalar) => FieldKind::Scalar(type_name),
        Some(parser::TypeKind::Enum(_)) => FieldKind::Enum(type_name),
        Some(parser::TypeKind::Object(_)) if !document.is_model(type_name) => FieldKind::Embedded(type_name),
        _ => FieldKind::Relation,
    }
}

/// What the type generation needs to know about one model.
#[derive(Debug, Clone)]
pub struct ModelShape<'a> {
    pub model_name: &'a str,
    pub fields: Vec<Positioned<parser::FieldDefinition>>,
    pub key: &'a KeyDefinition,
    pub sync_enabled: bool,
    pub timestamps: [Option<&'a str>; 2],
}

impl ModelShape<'_> {
    fn is_key_field(&self, field_name: &str) -> bool {
        self.key.fields().any(|key_field| key_field == field_name)
    }

    fn is_timestamp(&self, field_name: &str) -> bool {
        self.timestamps.iter().flatten().any(|timestamp| *timestamp == field_name)
    }

    /// Stored fields, leaving out relations and the conflict detection bookkeeping.
    fn stored_fields<'b>(
        &'b self,
        document: &'b SchemaDocument,
    ) -> impl Iterator<Item = (&'b parser::FieldDefinition, FieldKind<'b>)> + 'b {
        self.fields
            .iter()
            .map(|field| (&field.node, field_kind(document, &field.node.ty.node)))
            .filter(|(field, kind)| *kind != FieldKind::Relation && !field.name.node.starts_with('_'))
    }

    pub fn key_field_type(&self, field_name: &str) -> parser::Type {
        self.fields
            .iter()
            .find(|field| field.node.name.node == field_name)
            .map(|field| ast::non_null(field.node.ty.node.clone()))
            .unwrap_or_else(|| ast::non_null(ast::named_type("ID")))
    }
}

pub fn add_shared_types(document: &mut SchemaDocument) -> Result<(), TransformerError> {
    let shared = SchemaDocument::parse(SHARED_TYPES)?;
    for definition in shared.types() {
        document.add_type_if_absent(definition.clone());
    }
    Ok(())
}

/// Add the filter, condition, mutation input and connection types of a model.
pub fn add_model_types(document: &mut SchemaDocument, model: &ModelShape<'_>) -> Result<(), TransformerError> {
    add_shared_types(document)?;

    let snapshot = document.clone();
    let stored: Vec<_> = model.stored_fields(&snapshot).collect();

    for (_, kind) in &stored {
        match kind {
            FieldKind::Enum(enum_name) => add_enum_filter_input(document, enum_name),
            FieldKind::Embedded(type_name) => add_embedded_input(document, type_name)?,
            FieldKind::Scalar(_) | FieldKind::Relation => (),
        }
    }

    let model_name = model.model_name;

    let filter_fields = |type_name: &str, include_keys: bool| {
        let mut fields: Vec<_> = stored
            .iter()
            .filter(|(field, _)| include_keys || !model.is_key_field(&field.name.node))
            .filter_map(|(field, kind)| {
                let filter = match kind {
                    FieldKind::Enum(enum_name) => ModelNames::scalar_filter_input(enum_name, true),
                    FieldKind::Scalar(scalar) => ModelNames::scalar_filter_input(scalar, false),
                    FieldKind::Embedded(_) | FieldKind::Relation => return None,
                };
                Some(ast::input_value(&field.name.node, ast::named_type(&filter)))
            })
            .collect();

        if model.sync_enabled {
            fields.push(ast::input_value(SYNC_FIELD_DELETED, ast::named_type("ModelBooleanInput")));
        }
        fields.push(ast::input_value("and", ast::list_of(ast::named_type(type_name))));
        fields.push(ast::input_value("or", ast::list_of(ast::named_type(type_name))));
        fields.push(ast::input_value("not", ast::named_type(type_name)));
        fields
    };

    let filter_name = ModelNames::filter_input(model_name);
    document.add_type(ast::input_object_type(&filter_name, filter_fields(&filter_name, true)))?;

    let condition_name = ModelNames::condition_input(model_name);
    document.add_type(ast::input_object_type(&condition_name, filter_fields(&condition_name, false)))?;

    let mut create_fields: Vec<_> = stored
        .iter()
        .map(|(field, kind)| {
            let mut ty = input_type(&field.ty.node, *kind);
            let generated_id = field.name.node == "id" && model.key.partition_key == "id";
            if generated_id || model.is_timestamp(&field.name.node) {
                ty = ast::nullable(ty);
            }
            ast::input_value(&field.name.node, ty)
        })
        .collect();
    if model.sync_enabled {
        create_fields.push(ast::input_value(SYNC_FIELD_VERSION, ast::named_type("Int")));
    }
    document.add_type(ast::input_object_type(&ModelNames::create_input(model_name), create_fields))?;

    let mut update_fields: Vec<_> = stored
        .iter()
        .map(|(field, kind)| {
            let ty = input_type(&field.ty.node, *kind);
            let ty = if model.is_key_field(&field.name.node) {
                ast::non_null(ty)
            } else {
                ast::nullable(ty)
            };
            ast::input_value(&field.name.node, ty)
        })
        .collect();
    if model.sync_enabled {
        update_fields.push(ast::input_value(SYNC_FIELD_VERSION, ast::named_type("Int")));
    }
    document.add_type(ast::input_object_type(&ModelNames::update_input(model_name), update_fields))?;

    let mut delete_fields: Vec<_> = model
        .key
        .fields()
        .map(|field_name| ast::input_value(field_name, model.key_field_type(field_name)))
        .collect();
    if model.sync_enabled {
        delete_fields.push(ast::input_value(SYNC_FIELD_VERSION, ast::named_type("Int")));
    }
    document.add_type(ast::input_object_type(&ModelNames::delete_input(model_name), delete_fields))?;

    let mut connection_fields = vec![
        ast::field(
            CONNECTION_FIELD_ITEMS,
            ast::non_null(ast::list_of(ast::named_type(model_name))),
        ),
        ast::field(CONNECTION_FIELD_NEXT_TOKEN, ast::named_type("String")),
    ];
    if model.sync_enabled {
        connection_fields.push(ast::field(CONNECTION_FIELD_STARTED_AT, ast::named_type("AWSTimestamp")));
    }
    document.add_type_if_absent(ast::object_type(&ModelNames::connection(model_name), connection_fields));

    Ok(())
}

/// The argument and input type querying a sort key, generating composite key inputs when the
/// key has several sort fields.
pub fn add_sort_key_condition(
    document: &mut SchemaDocument,
    model: &ModelShape<'_>,
    key: &KeyDefinition,
) -> Option<Positioned<parser::InputValueDefinition>> {
    let argument = ModelNames::sort_key_argument(key)?;

    if let [sort_field] = key.sort_key_fields.as_slice() {
        let field_type = model.key_field_type(sort_field);
        let input = ModelNames::key_condition_input(ast::base_type_name(&field_type));
        return Some(ast::input_value(&argument, ast::named_type(&input)));
    }

    let key_input = ModelNames::composite_key_input(model.model_name, key);
    let condition_input = ModelNames::composite_key_condition_input(model.model_name, key);

    document.add_type_if_absent(ast::input_object_type(
        &key_input,
        key.sort_key_fields
            .iter()
            .map(|field_name| ast::input_value(field_name, ast::nullable(model.key_field_type(field_name))))
            .collect(),
    ));

    let mut operators: Vec<_> = ["eq", "le", "lt", "ge", "gt", "beginsWith"]
        .into_iter()
        .map(|operator| ast::input_value(operator, ast::named_type(&key_input)))
        .collect();
    operators.push(ast::input_value("between", ast::list_of(ast::named_type(&key_input))));
    document.add_type_if_absent(ast::input_object_type(&condition_input, operators));

    Some(ast::input_value(&argument, ast::named_type(&condition_input)))
}

fn input_type(ty: &parser::Type, kind: FieldKind<'_>) -> parser::Type {
    match kind {
        FieldKind::Embedded(type_name) => rename_base(ty, &ModelNames::embedded_input(type_name)),
        _ => ty.clone(),
    }
}

fn rename_base(ty: &parser::Type, type_name: &str) -> parser::Type {
    let base = match &ty.base {
        parser::BaseType::Named(_) => parser::BaseType::Named(Name::new(type_name)),
        parser::BaseType::List(inner) => parser::BaseType::List(Box::new(rename_base(inner, type_name))),
    };
    parser::Type {
        base,
        nullable: ty.nullable,
    }
}

fn add_enum_filter_input(document: &mut SchemaDocument, enum_name: &str) {
    document.add_type_if_absent(ast::input_object_type(
        &ModelNames::scalar_filter_input(enum_name, true),
        vec![
            ast::input_value("eq", ast::named_type(enum_name)),
            ast::input_value("ne", ast::named_type(enum_name)),
        ],
    ));
}

fn add_embedded_input(document: &mut SchemaDocument, type_name: &str) -> Result<(), TransformerError> {
    let input_name = ModelNames::embedded_input(type_name);
    if document.has_type(&input_name) {
        return Ok(());
    }

    let fields = document.fields(type_name).to_vec();
    // Registered before recursing so self-referencing types terminate.
    document.add_type(ast::input_object_type(&input_name, Vec::new()))?;

    let snapshot = document.clone();
    let mut input_fields = Vec::new();
    for field in &fields {
        let kind = field_kind(&snapshot, &field.node.ty.node);
        match kind {
            FieldKind::Relation => continue,
            FieldKind::Embedded(nested) => add_embedded_input(document, nested)?,
            FieldKind::Scalar(_) | FieldKind::Enum(_) => (),
        }
        input_fields.push(ast::input_value(&field.node.name.node, input_type(&field.node.ty.node, kind)));
    }

    document.put_type(ast::input_object_type(&input_name, input_fields));
    Ok(())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn shape<'a>(document: &SchemaDocument, model_name: &'a str, key: &'a KeyDefinition) -> ModelShape<'a> {
        ModelShape {
            model_name,
            fields: document.fields(model_name).to_vec(),
            key,
            sync_enabled: false,
            timestamps: [Some("createdAt"), Some("updatedAt")],
        }
    }

    #[test]
    fn inputs_follow_the_model_fields() {
        let mut document = SchemaDocument::parse(indoc! {r"
            type Todo @model {
              id: ID!
              content: String!
              status: Status
              location: Location
              comments: [Comment]
            }

            type Comment @model {
              id: ID!
            }

            type Location {
              lat: Float
              lng: Float
            }

            enum Status {
              OPEN
              DONE
            }
        "})
        .unwrap();
        let key = KeyDefinition::new("id", Vec::new());
        let model = shape(&document, "Todo", &key);

        add_model_types(&mut document, &model).unwrap();

        let sdl = document.to_sdl(|_| true);
        let create_input = "input CreateTodoInput {\n  id: ID\n  content: String!\n  status: Status\n  location: LocationInput\n}";
        assert!(sdl.contains(create_input));
        assert!(sdl.contains("input UpdateTodoInput {\n  id: ID!\n  content: String\n"));
        assert!(sdl.contains("input DeleteTodoInput {\n  id: ID!\n}"));
        assert!(sdl.contains("input LocationInput {\n  lat: Float\n  lng: Float\n}"));
        assert!(sdl.contains("input ModelStatusInput {\n  eq: Status\n  ne: Status\n}"));
        assert!(sdl.contains("type ModelTodoConnection {\n  items: [Todo]!\n  nextToken: String\n}"));
        assert!(!sdl.contains("comments: ModelCommentFilterInput"));
    }

    #[test]
    fn composite_sort_keys_get_their_own_inputs() {
        let mut document = SchemaDocument::parse(indoc! {r"
            type Order @model {
              customerId: ID!
              status: String!
              createdAt: AWSDateTime!
            }
        "})
        .unwrap();
        let key = KeyDefinition::new("customerId", vec!["status".to_owned(), "createdAt".to_owned()]);
        let model = shape(&document, "Order", &key);

        let argument = add_sort_key_condition(&mut document, &model, &key).unwrap();

        assert_eq!(argument.node.name.node, "statusCreatedAt");
        assert_eq!(
            argument.node.ty.node.to_string(),
            "ModelOrderStatusCreatedAtCompositeKeyConditionInput"
        );
        assert!(document.has_type("ModelOrderStatusCreatedAtCompositeKeyInput"));
    }
}
