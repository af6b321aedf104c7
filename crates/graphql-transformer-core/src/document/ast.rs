//! Small constructors and accessors over the parser's AST types.
//!
//! Plugins build new definitions for the output schema with these rather than spelling out the
//! parser structs, which carry positions that are meaningless for generated nodes.

use async_graphql_parser::{types as ast, Pos, Positioned};
use async_graphql_value::{ConstValue, Name};

pub const SCALAR_TYPES: [&str; 15] = [
    "String",
    "Int",
    "Float",
    "Boolean",
    "ID",
    "AWSDate",
    "AWSTime",
    "AWSDateTime",
    "AWSTimestamp",
    "AWSEmail",
    "AWSJSON",
    "AWSURL",
    "AWSPhone",
    "AWSIPAddress",
    "BigInt",
];

pub fn positioned<T>(node: T) -> Positioned<T> {
    Positioned::new(node, Pos { line: 0, column: 0 })
}

pub fn name(value: &str) -> Positioned<Name> {
    positioned(Name::new(value))
}

/// A nullable named type.
pub fn named_type(type_name: &str) -> ast::Type {
    ast::Type {
        base: ast::BaseType::Named(Name::new(type_name)),
        nullable: true,
    }
}

pub fn non_null(mut ty: ast::Type) -> ast::Type {
    ty.nullable = false;
    ty
}

pub fn nullable(mut ty: ast::Type) -> ast::Type {
    ty.nullable = true;
    ty
}

pub fn list_of(ty: ast::Type) -> ast::Type {
    ast::Type {
        base: ast::BaseType::List(Box::new(ty)),
        nullable: true,
    }
}

/// Strip every list and non-null wrapper: `[Post!]!` becomes `Post`.
pub fn base_type_name(ty: &ast::Type) -> &str {
    match &ty.base {
        ast::BaseType::Named(name) => name.as_str(),
        ast::BaseType::List(inner) => base_type_name(inner),
    }
}

pub fn is_list_type(ty: &ast::Type) -> bool {
    matches!(ty.base, ast::BaseType::List(_))
}

pub fn is_non_null_type(ty: &ast::Type) -> bool {
    !ty.nullable
}

pub fn is_scalar(type_name: &str) -> bool {
    SCALAR_TYPES.contains(&type_name)
}

pub fn field(field_name: &str, ty: ast::Type) -> Positioned<ast::FieldDefinition> {
    field_with_arguments(field_name, Vec::new(), ty)
}

pub fn field_with_arguments(
    field_name: &str,
    arguments: Vec<Positioned<ast::InputValueDefinition>>,
    ty: ast::Type,
) -> Positioned<ast::FieldDefinition> {
    positioned(ast::FieldDefinition {
        description: None,
        name: name(field_name),
        arguments,
        ty: positioned(ty),
        directives: Vec::new(),
    })
}

pub fn input_value(value_name: &str, ty: ast::Type) -> Positioned<ast::InputValueDefinition> {
    positioned(ast::InputValueDefinition {
        description: None,
        name: name(value_name),
        ty: positioned(ty),
        default_value: None,
        directives: Vec::new(),
    })
}

pub fn object_type(
    type_name: &str,
    fields: Vec<Positioned<ast::FieldDefinition>>,
) -> Positioned<ast::TypeDefinition> {
    positioned(ast::TypeDefinition {
        extend: false,
        description: None,
        name: name(type_name),
        directives: Vec::new(),
        kind: ast::TypeKind::Object(ast::ObjectType {
            implements: Vec::new(),
            fields,
        }),
    })
}

pub fn input_object_type(
    type_name: &str,
    fields: Vec<Positioned<ast::InputValueDefinition>>,
) -> Positioned<ast::TypeDefinition> {
    positioned(ast::TypeDefinition {
        extend: false,
        description: None,
        name: name(type_name),
        directives: Vec::new(),
        kind: ast::TypeKind::InputObject(ast::InputObjectType { fields }),
    })
}

pub fn enum_type(type_name: &str, values: &[&str]) -> Positioned<ast::TypeDefinition> {
    positioned(ast::TypeDefinition {
        extend: false,
        description: None,
        name: name(type_name),
        directives: Vec::new(),
        kind: ast::TypeKind::Enum(ast::EnumType {
            values: values
                .iter()
                .map(|value| {
                    positioned(ast::EnumValueDefinition {
                        description: None,
                        value: name(value),
                        directives: Vec::new(),
                    })
                })
                .collect(),
        }),
    })
}

pub fn scalar_type(type_name: &str) -> Positioned<ast::TypeDefinition> {
    positioned(ast::TypeDefinition {
        extend: false,
        description: None,
        name: name(type_name),
        directives: Vec::new(),
        kind: ast::TypeKind::Scalar,
    })
}

pub fn directive(directive_name: &str, arguments: Vec<(&str, ConstValue)>) -> Positioned<ast::ConstDirective> {
    positioned(ast::ConstDirective {
        name: name(directive_name),
        arguments: arguments
            .into_iter()
            .map(|(argument, value)| (name(argument), positioned(value)))
            .collect(),
    })
}

pub fn string_list(values: &[&str]) -> ConstValue {
    ConstValue::List(values.iter().map(|value| ConstValue::String((*value).to_owned())).collect())
}

pub fn has_directive(directives: &[Positioned<ast::ConstDirective>], directive_name: &str) -> bool {
    find_directive(directives, directive_name).is_some()
}

pub fn find_directive<'a>(
    directives: &'a [Positioned<ast::ConstDirective>],
    directive_name: &str,
) -> Option<&'a Positioned<ast::ConstDirective>> {
    directives
        .iter()
        .find(|directive| directive.node.name.node == directive_name)
}

pub fn object_fields(definition: &ast::TypeDefinition) -> &[Positioned<ast::FieldDefinition>] {
    match &definition.kind {
        ast::TypeKind::Object(object) => &object.fields,
        ast::TypeKind::Interface(interface) => &interface.fields,
        _ => &[],
    }
}

pub fn object_fields_mut(definition: &mut ast::TypeDefinition) -> Option<&mut Vec<Positioned<ast::FieldDefinition>>> {
    match &mut definition.kind {
        ast::TypeKind::Object(object) => Some(&mut object.fields),
        ast::TypeKind::Interface(interface) => Some(&mut interface.fields),
        _ => None,
    }
}

pub fn find_field<'a>(
    definition: &'a ast::TypeDefinition,
    field_name: &str,
) -> Option<&'a Positioned<ast::FieldDefinition>> {
    object_fields(definition)
        .iter()
        .find(|field| field.node.name.node == field_name)
}

pub fn input_fields_mut(
    definition: &mut ast::TypeDefinition,
) -> Option<&mut Vec<Positioned<ast::InputValueDefinition>>> {
    match &mut definition.kind {
        ast::TypeKind::InputObject(input) => Some(&mut input.fields),
        _ => None,
    }
}

/// Lower-case the first character: `Todo` becomes `todo`.
pub fn lower_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-case the first character: `comments` becomes `Comments`.
pub fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
