use async_graphql_parser::{types as ast, Pos, Positioned};
use async_graphql_value::ConstValue;
use indexmap::IndexMap;

use crate::TransformerError;

/// Where a directive was applied. Named as in the GraphQL `DirectiveLocation` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectiveLocation {
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
}

impl DirectiveLocation {
    fn from_parser(location: &ast::DirectiveLocation) -> Option<Self> {
        Some(match location {
            ast::DirectiveLocation::Schema => DirectiveLocation::Schema,
            ast::DirectiveLocation::Scalar => DirectiveLocation::Scalar,
            ast::DirectiveLocation::Object => DirectiveLocation::Object,
            ast::DirectiveLocation::FieldDefinition => DirectiveLocation::FieldDefinition,
            ast::DirectiveLocation::ArgumentDefinition => DirectiveLocation::ArgumentDefinition,
            ast::DirectiveLocation::Interface => DirectiveLocation::Interface,
            ast::DirectiveLocation::Union => DirectiveLocation::Union,
            ast::DirectiveLocation::Enum => DirectiveLocation::Enum,
            ast::DirectiveLocation::EnumValue => DirectiveLocation::EnumValue,
            ast::DirectiveLocation::InputObject => DirectiveLocation::InputObject,
            ast::DirectiveLocation::InputFieldDefinition => DirectiveLocation::InputFieldDefinition,
            _ => return None,
        })
    }
}

/// The byte offset of a parser position in `text`.
fn byte_offset(text: &str, pos: Pos) -> Option<usize> {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(pos.line.checked_sub(1)?)
        .map(str::len)
        .sum();
    let line = text.get(line_start..)?;
    line.char_indices()
        .nth(pos.column.checked_sub(1)?)
        .map(|(index, _)| line_start + index)
}

/// Whether the declaration starting at `start` carries the `repeatable` keyword, which sits right
/// before `on` and the first location. The parser does not report it reliably.
fn declares_repeatable(sdl: &str, start: Pos, first_location: Pos) -> bool {
    byte_offset(sdl, start)
        .zip(byte_offset(sdl, first_location))
        .and_then(|(start, end)| sdl.get(start..end))
        .map(|head| head.trim_end().trim_end_matches('|').trim_end())
        .and_then(|head| head.strip_suffix("on"))
        .and_then(|head| head.trim_end().strip_suffix("repeatable"))
        .is_some_and(|head| head.ends_with(|c: char| c.is_whitespace() || c == ')'))
}

#[derive(Debug, Clone)]
struct DirectiveDefinition {
    arguments: Vec<ast::InputValueDefinition>,
    locations: Vec<DirectiveLocation>,
    repeatable: bool,
}

/// Directive signatures declared by the registered plugins, with the input types and enums their
/// arguments refer to.
#[derive(Debug, Clone, Default)]
pub struct DirectiveDefinitions {
    directives: IndexMap<String, DirectiveDefinition>,
    types: IndexMap<String, ast::TypeKind>,
}

impl DirectiveDefinitions {
    /// Register every directive and supporting type in `sdl`, returning the declared directive names.
    pub fn add_sdl(&mut self, sdl: &str) -> Result<Vec<String>, TransformerError> {
        let document = async_graphql_parser::parse_schema(sdl).map_err(|err| {
            TransformerError::InvalidTransformerConfiguration(format!("Invalid directive definition: {err}"))
        })?;

        let mut declared = Vec::new();

        for definition in document.definitions {
            match definition {
                ast::TypeSystemDefinition::Directive(Positioned { node: directive, pos }) => {
                    let name = directive.name.node.to_string();
                    if self.directives.contains_key(&name) {
                        return Err(TransformerError::InvalidTransformerConfiguration(format!(
                            "Directive @{name} is declared by more than one transformer."
                        )));
                    }

                    let repeatable = directive
                        .locations
                        .first()
                        .is_some_and(|location| declares_repeatable(sdl, pos, location.pos));

                    self.directives.insert(
                        name.clone(),
                        DirectiveDefinition {
                            arguments: directive.arguments.into_iter().map(|argument| argument.node).collect(),
                            locations: directive
                                .locations
                                .iter()
                                .filter_map(|location| DirectiveLocation::from_parser(&location.node))
                                .collect(),
                            repeatable,
                        },
                    );
                    declared.push(name);
                }
                // Supporting types may be shared between directives, the first declaration wins.
                ast::TypeSystemDefinition::Type(Positioned { node: definition, .. }) => {
                    self.types
                        .entry(definition.name.node.to_string())
                        .or_insert(definition.kind);
                }
                ast::TypeSystemDefinition::Schema(_) => (),
            }
        }

        Ok(declared)
    }

    pub fn contains(&self, directive_name: &str) -> bool {
        self.directives.contains_key(directive_name)
    }

    pub fn is_repeatable(&self, directive_name: &str) -> bool {
        self.directives
            .get(directive_name)
            .is_some_and(|definition| definition.repeatable)
    }

    /// Check an application against its declared signature: location, known arguments, required
    /// arguments, and the shape of every argument value.
    pub fn validate(
        &self,
        directive: &Positioned<ast::ConstDirective>,
        location: DirectiveLocation,
    ) -> Result<(), TransformerError> {
        let name = directive.node.name.node.as_str();
        let Some(definition) = self.directives.get(name) else {
            return Err(TransformerError::schema_validation_at(
                format!("Unknown directive \"@{name}\"."),
                directive.pos,
            ));
        };

        if !definition.locations.contains(&location) {
            return Err(TransformerError::invalid_directive_at(
                format!("Directive \"@{name}\" may not be used on {location}."),
                directive.pos,
            ));
        }

        for (argument_name, value) in &directive.node.arguments {
            let Some(argument) = definition
                .arguments
                .iter()
                .find(|argument| argument.name.node == argument_name.node)
            else {
                return Err(TransformerError::invalid_directive_at(
                    format!("Unknown argument \"{}\" on directive \"@{name}\".", argument_name.node),
                    argument_name.pos,
                ));
            };

            if !self.is_valid_value(&value.node, &argument.ty.node) {
                return Err(TransformerError::invalid_directive_at(
                    format!(
                        "Directive \"@{name}\" argument \"{}\" has invalid value {}. Expected type \"{}\".",
                        argument_name.node, value.node, argument.ty.node
                    ),
                    value.pos,
                ));
            }
        }

        for argument in &definition.arguments {
            let provided = directive.node.get_argument(&argument.name.node).is_some();
            if !provided && !argument.ty.node.nullable && argument.default_value.is_none() {
                return Err(TransformerError::invalid_directive_at(
                    format!(
                        "Directive \"@{name}\" argument \"{}\" of type \"{}\" is required, but it was not provided.",
                        argument.name.node, argument.ty.node
                    ),
                    directive.pos,
                ));
            }
        }

        Ok(())
    }

    fn is_valid_value(&self, value: &ConstValue, ty: &ast::Type) -> bool {
        if let ConstValue::Null = value {
            return ty.nullable;
        }

        match &ty.base {
            ast::BaseType::List(item_type) => match value {
                ConstValue::List(items) => items.iter().all(|item| self.is_valid_value(item, item_type)),
                // Input coercion accepts a single item where a list is expected.
                single => self.is_valid_value(single, item_type),
            },
            ast::BaseType::Named(type_name) => self.is_valid_named_value(value, type_name.as_str()),
        }
    }

    fn is_valid_named_value(&self, value: &ConstValue, type_name: &str) -> bool {
        match type_name {
            "String" => matches!(value, ConstValue::String(_)),
            "ID" => matches!(value, ConstValue::String(_) | ConstValue::Number(_)),
            "Int" => matches!(value, ConstValue::Number(number) if number.is_i64() || number.is_u64()),
            "Float" => matches!(value, ConstValue::Number(_)),
            "Boolean" => matches!(value, ConstValue::Boolean(_)),
            _ => match self.types.get(type_name) {
                Some(ast::TypeKind::Enum(enum_type)) => match value {
                    ConstValue::Enum(name) => enum_type.values.iter().any(|value| value.node.value.node == *name),
                    _ => false,
                },
                Some(ast::TypeKind::InputObject(input)) => match value {
                    ConstValue::Object(fields) => {
                        let known = fields.iter().all(|(field_name, field_value)| {
                            input
                                .fields
                                .iter()
                                .find(|field| field.node.name.node == *field_name)
                                .is_some_and(|field| self.is_valid_value(field_value, &field.node.ty.node))
                        });
                        let complete = input.fields.iter().all(|field| {
                            field.node.ty.node.nullable
                                || field.node.default_value.is_some()
                                || fields.contains_key(&field.node.name.node)
                        });
                        known && complete
                    }
                    _ => false,
                },
                // Custom scalars such as AWSJSON accept any literal.
                _ => true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::document::SchemaDocument;

    const DEFINITIONS: &str = indoc! {r#"
        directive @function(name: String!, region: String, accountId: String) repeatable on FIELD_DEFINITION
        directive @auth(rules: [AuthRule!]!) on OBJECT | FIELD_DEFINITION

        input AuthRule {
          allow: AuthStrategy!
          ownerField: String
        }

        enum AuthStrategy {
          owner
          groups
          public
        }
    "#};

    fn definitions() -> DirectiveDefinitions {
        let mut definitions = DirectiveDefinitions::default();
        definitions.add_sdl(DEFINITIONS).unwrap();
        definitions
    }

    fn first_field_directive(sdl: &str) -> Positioned<ast::ConstDirective> {
        let document = SchemaDocument::parse(sdl).unwrap();
        let field = document.fields("Query")[0].clone();
        field.node.directives[0].clone()
    }

    #[rstest]
    #[case::valid(r#"type Query { a: String @function(name: "fn") }"#, None)]
    #[case::missing_required(
        r#"type Query { a: String @function(region: "us-east-1") }"#,
        Some(r#"Directive "@function" argument "name" of type "String!" is required, but it was not provided."#)
    )]
    #[case::unknown_argument(
        r#"type Query { a: String @function(name: "fn", memory: 128) }"#,
        Some(r#"Unknown argument "memory" on directive "@function"."#)
    )]
    #[case::wrong_type(
        r#"type Query { a: String @function(name: 12) }"#,
        Some(r#"Directive "@function" argument "name" has invalid value 12. Expected type "String!"."#)
    )]
    #[case::valid_input_object(r#"type Query { a: String @auth(rules: [{ allow: owner }]) }"#, None)]
    #[case::unknown_enum_value(
        r#"type Query { a: String @auth(rules: [{ allow: everyone }]) }"#,
        Some(r#"Directive "@auth" argument "rules" has invalid value [{allow: everyone}]. Expected type "[AuthRule!]!"."#)
    )]
    fn field_applications(#[case] sdl: &str, #[case] expected_error: Option<&str>) {
        let directive = first_field_directive(sdl);

        let result = definitions().validate(&directive, DirectiveLocation::FieldDefinition);

        assert_eq!(result.err().map(|error| error.to_string()).as_deref(), expected_error);
    }

    #[test]
    fn wrong_location_is_rejected() {
        let directive = first_field_directive(r#"type Query { a: String @function(name: "fn") }"#);

        let error = definitions().validate(&directive, DirectiveLocation::Object).unwrap_err();

        assert_eq!(error.to_string(), r#"Directive "@function" may not be used on OBJECT."#);
    }

    #[test]
    fn duplicate_declarations_are_a_configuration_error() {
        let mut definitions = definitions();

        let error = definitions
            .add_sdl("directive @function(name: String!) on FIELD_DEFINITION")
            .unwrap_err();

        assert_eq!(
            error,
            TransformerError::InvalidTransformerConfiguration(
                "Directive @function is declared by more than one transformer.".to_owned()
            )
        );
        assert!(definitions.is_repeatable("function"));
    }

    #[test]
    fn repeatable_is_read_from_the_declaration() {
        let definitions = definitions();
        assert!(definitions.is_repeatable("function"));
        assert!(!definitions.is_repeatable("auth"));

        let mut definitions = DirectiveDefinitions::default();
        definitions
            .add_sdl(indoc! {r#"
                "Declared on several lines."
                directive @index(
                  name: String = "repeatable"
                  sortKeyFields: [String]
                ) repeatable on
                  FIELD_DEFINITION

                directive @repeatable on OBJECT
                directive @primaryKey(sortKeyFields: [String]) on FIELD_DEFINITION
                directive @hasMany(fields: [String]) repeatable on FIELD_DEFINITION | OBJECT
            "#})
            .unwrap();

        assert!(definitions.is_repeatable("index"));
        assert!(!definitions.is_repeatable("repeatable"));
        assert!(!definitions.is_repeatable("primaryKey"));
        assert!(definitions.is_repeatable("hasMany"));
    }
}
