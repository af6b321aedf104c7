use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer_core::{document::ast, strategy::SqlDbType, TransformerContext, TransformerError};

pub(crate) const SEQUENCE_DIRECTIVE: &str = "sequence";

/// A sequence is a Postgres feature, and always yields integers.
pub(crate) fn check_sequence_field(
    model_name: &str,
    field: &Positioned<parser::FieldDefinition>,
    directive: &Positioned<parser::ConstDirective>,
    ctx: &TransformerContext,
) -> Result<(), TransformerError> {
    let field_name = field.node.name.node.as_str();

    let is_postgres = ctx
        .strategy_for(model_name)
        .as_sql()
        .is_some_and(|strategy| strategy.db_type == SqlDbType::Postgres);
    if !is_postgres {
        return Err(TransformerError::invalid_directive_at(
            format!("@sequence on {model_name}.{field_name} is only supported on PostgreSQL data sources."),
            directive.pos,
        ));
    }

    let ty = &field.node.ty.node;
    if ast::is_list_type(ty) || ast::base_type_name(ty) != "Int" {
        return Err(TransformerError::invalid_directive_at(
            format!("@sequence can only be used on Int fields. {model_name}.{field_name} is {ty}."),
            directive.pos,
        ));
    }

    Ok(())
}
