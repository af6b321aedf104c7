use std::fmt::{self, Write};

use async_graphql_parser::{types as ast, Positioned};
use itertools::Itertools;

use super::SchemaDocument;

pub fn print_document(document: &SchemaDocument, keep_directive: &dyn Fn(&str) -> bool) -> String {
    DocumentPrinter {
        document,
        keep_directive,
    }
    .to_string()
}

struct DocumentPrinter<'a> {
    document: &'a SchemaDocument,
    keep_directive: &'a dyn Fn(&str) -> bool,
}

impl fmt::Display for DocumentPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = self.document.schema_definition() {
            print_schema_definition(f, &schema.node)?;
        }

        for definition in self.document.types() {
            print_type_definition(f, &definition.node, self.keep_directive)?;
        }

        Ok(())
    }
}

fn print_schema_definition(f: &mut fmt::Formatter<'_>, schema: &ast::SchemaDefinition) -> fmt::Result {
    f.write_str("schema {\n")?;
    for (operation, name) in [
        ("query", &schema.query),
        ("mutation", &schema.mutation),
        ("subscription", &schema.subscription),
    ] {
        if let Some(name) = name {
            writeln!(f, "  {operation}: {}", name.node)?;
        }
    }
    f.write_str("}\n\n")
}

fn print_type_definition(
    f: &mut fmt::Formatter<'_>,
    definition: &ast::TypeDefinition,
    keep_directive: &dyn Fn(&str) -> bool,
) -> fmt::Result {
    print_description(f, definition.description.as_ref(), "")?;

    let directives = print_directives(&definition.directives, keep_directive);
    let name = &definition.name.node;

    match &definition.kind {
        ast::TypeKind::Scalar => writeln!(f, "scalar {name}{directives}")?,
        ast::TypeKind::Object(object) => {
            let implements = print_implements(&object.implements);
            writeln!(f, "type {name}{implements}{directives} {{")?;
            print_fields(f, &object.fields, keep_directive)?;
            f.write_str("}\n")?;
        }
        ast::TypeKind::Interface(interface) => {
            let implements = print_implements(&interface.implements);
            writeln!(f, "interface {name}{implements}{directives} {{")?;
            print_fields(f, &interface.fields, keep_directive)?;
            f.write_str("}\n")?;
        }
        ast::TypeKind::Union(union) => {
            let members = union.members.iter().map(|member| member.node.as_str()).join(" | ");
            writeln!(f, "union {name}{directives} = {members}")?;
        }
        ast::TypeKind::Enum(enum_type) => {
            writeln!(f, "enum {name}{directives} {{")?;
            for value in &enum_type.values {
                print_description(f, value.node.description.as_ref(), "  ")?;
                let directives = print_directives(&value.node.directives, keep_directive);
                writeln!(f, "  {}{directives}", value.node.value.node)?;
            }
            f.write_str("}\n")?;
        }
        ast::TypeKind::InputObject(input) => {
            writeln!(f, "input {name}{directives} {{")?;
            for field in &input.fields {
                print_description(f, field.node.description.as_ref(), "  ")?;
                writeln!(f, "  {}", print_input_value(&field.node, keep_directive))?;
            }
            f.write_str("}\n")?;
        }
    }

    f.write_char('\n')
}

fn print_fields(
    f: &mut fmt::Formatter<'_>,
    fields: &[Positioned<ast::FieldDefinition>],
    keep_directive: &dyn Fn(&str) -> bool,
) -> fmt::Result {
    for field in fields {
        let field = &field.node;
        print_description(f, field.description.as_ref(), "  ")?;

        let arguments = if field.arguments.is_empty() {
            String::new()
        } else {
            format!(
                "({})",
                field
                    .arguments
                    .iter()
                    .map(|argument| print_input_value(&argument.node, keep_directive))
                    .join(", ")
            )
        };

        let directives = print_directives(&field.directives, keep_directive);
        writeln!(f, "  {}{arguments}: {}{directives}", field.name.node, field.ty.node)?;
    }
    Ok(())
}

fn print_input_value(value: &ast::InputValueDefinition, keep_directive: &dyn Fn(&str) -> bool) -> String {
    let mut printed = format!("{}: {}", value.name.node, value.ty.node);
    if let Some(default_value) = &value.default_value {
        printed.push_str(&format!(" = {}", default_value.node));
    }
    printed.push_str(&print_directives(&value.directives, keep_directive));
    printed
}

fn print_implements(implements: &[Positioned<async_graphql_value::Name>]) -> String {
    if implements.is_empty() {
        return String::new();
    }
    format!(
        " implements {}",
        implements.iter().map(|name| name.node.as_str()).join(" & ")
    )
}

fn print_directives(
    directives: &[Positioned<ast::ConstDirective>],
    keep_directive: &dyn Fn(&str) -> bool,
) -> String {
    directives
        .iter()
        .filter(|directive| keep_directive(directive.node.name.node.as_str()))
        .map(|directive| {
            let directive = &directive.node;
            if directive.arguments.is_empty() {
                format!(" @{}", directive.name.node)
            } else {
                format!(
                    " @{}({})",
                    directive.name.node,
                    directive
                        .arguments
                        .iter()
                        .map(|(name, value)| format!("{}: {}", name.node, value.node))
                        .join(", ")
                )
            }
        })
        .collect()
}

fn print_description(
    f: &mut fmt::Formatter<'_>,
    description: Option<&Positioned<String>>,
    indent: &str,
) -> fmt::Result {
    match description {
        Some(description) => writeln!(f, "{indent}\"\"\"{}\"\"\"", description.node.replace("\"\"\"", "\\\"\"\"")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::document::SchemaDocument;

    #[test]
    fn transformer_directives_are_stripped() {
        let document = SchemaDocument::parse(indoc! {r#"
            """
            A todo item
            """
            type Todo @model @aws_iam {
              id: ID!
              content(format: String = "plain"): String @deprecated(reason: "use body")
            }
        "#})
        .unwrap();

        let sdl = document.to_sdl(|name| name != "model");

        insta::assert_snapshot!(sdl.trim_end(), @r###"
        """A todo item"""
        type Todo @aws_iam {
          id: ID!
          content(format: String = "plain"): String @deprecated(reason: "use body")
        }
        "###);
    }
}
