//! `@sql(statement | reference)` binds a query or mutation field to a hand-written SQL statement,
//! run by the same Lambda that serves SQL models. A `reference` names a statement from the custom
//! statements of the SQL strategy, so long queries can live in their own files.

#![cfg_attr(test, allow(unused_crate_dependencies))]

use async_graphql_parser::{types as parser, Positioned};
use graphql_model_transformer::resources::{add_sql_lambda, SQL_STACK};
use graphql_transformer_core::{
    context::{PipelineFunction, ResolverPipeline},
    directive::{get_arguments, DirectiveArguments},
    document::ast,
    strategy::{SqlDbType, SqlModelDataSourceStrategy},
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use indoc::{formatdoc, indoc};
use serde::Deserialize;

const SQL_DIRECTIVE_DEFINITION: &str = r"
directive @sql(statement: String, reference: String) on FIELD_DEFINITION
";

const LIST_RESPONSE: &str = indoc! {r"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    $util.toJson($ctx.result)
"};

const SINGLE_RESPONSE: &str = indoc! {r"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    #if( $ctx.result.isEmpty() )
      #return
    #end
    $util.toJson($ctx.result[0])
"};

#[derive(Debug, Deserialize)]
struct SqlArguments {
    statement: Option<String>,
    reference: Option<String>,
}

impl DirectiveArguments for SqlArguments {
    const NAME: &'static str = "sql";

    fn validate(&self) -> Result<(), String> {
        match (&self.statement, &self.reference) {
            (Some(_), Some(_)) => {
                Err("@sql can have either a 'statement' or a 'reference' argument, but not both.".to_owned())
            }
            (None, None) => Err("@sql requires either a 'statement' or a 'reference' argument.".to_owned()),
            (Some(statement), None) if statement.trim().is_empty() => {
                Err("@sql statement must not be empty.".to_owned())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
struct SqlField {
    type_name: String,
    field_name: String,
    arguments: SqlArguments,
    returns_list: bool,
    pos: async_graphql_parser::Pos,
}

#[derive(Debug, Default)]
pub struct SqlTransformer {
    fields: Vec<SqlField>,
}

impl SqlTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The strategy running custom statements: the one configured for them, or the only SQL strategy
/// of the schema.
fn statement_strategy(ctx: &TransformerContext) -> Result<SqlModelDataSourceStrategy, TransformerError> {
    if let Some(strategy) = ctx.sql_directive_strategy() {
        return Ok(strategy.clone());
    }

    let strategies = ctx.sql_strategies();
    match strategies.values().collect::<Vec<_>>().as_slice() {
        [strategy] => Ok((**strategy).clone()),
        [] => Err(TransformerError::InvalidTransformerConfiguration(
            "The @sql directive requires a SQL data source strategy.".to_owned(),
        )),
        _ => Err(TransformerError::InvalidTransformerConfiguration(
            "The schema uses several SQL strategies, so the strategy of @sql fields must be configured explicitly."
                .to_owned(),
        )),
    }
}

/// A VTL expression evaluating to `statement`. Single quoted VTL strings don't interpolate.
fn statement_expression(statement: &str) -> String {
    let json = serde_json::Value::String(statement.to_owned()).to_string();
    format!("$util.parseJson('{}')", json.replace('\'', "''"))
}

fn statement_request(statement: &str, db_type: SqlDbType) -> String {
    formatdoc! {r#"
        #set( $lambdaInput = {{}} )
        #set( $lambdaInput.statement = {statement} )
        #set( $lambdaInput.args = $util.defaultIfNull($ctx.args, {{}}) )
        #set( $lambdaInput.operation = "RAW_SQL" )
        #set( $lambdaInput.engine = "{db_type}" )
        #set( $lambdaInput.operationName = $ctx.info.fieldName )
        {{
          "version": "2018-05-29",
          "operation": "Invoke",
          "payload": $util.toJson($lambdaInput)
        }}
    "#, statement = statement_expression(statement)}
}

impl TransformerPlugin for SqlTransformer {
    fn name(&self) -> &str {
        "SqlTransformer"
    }

    fn directive_definitions(&self) -> &str {
        SQL_DIRECTIVE_DEFINITION
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let type_name = parent.node.name.node.as_str();
        let input = ctx.input_document();
        if type_name != input.query_type_name() && type_name != input.mutation_type_name() {
            return Err(TransformerError::invalid_directive_at(
                format!(
                    "@sql can only be used on Query or Mutation fields. {type_name}.{} is not one.",
                    field.node.name.node
                ),
                directive.pos,
            ));
        }

        let arguments: SqlArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;

        self.fields.push(SqlField {
            type_name: type_name.to_owned(),
            field_name: field.node.name.node.to_string(),
            arguments,
            returns_list: ast::is_list_type(&field.node.ty.node),
            pos: directive.pos,
        });
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        if self.fields.is_empty() {
            return Ok(());
        }

        let strategy = statement_strategy(ctx)?;
        add_sql_lambda(ctx, &strategy)?;

        for field in &self.fields {
            let statement = match (&field.arguments.statement, &field.arguments.reference) {
                (Some(statement), _) => statement.clone(),
                (None, Some(reference)) => strategy.custom_sql_statements.get(reference).cloned().ok_or_else(|| {
                    TransformerError::invalid_directive_at(
                        format!(
                            "The \"{reference}\" reference of @sql on {}.{} was not found \
                             in the custom SQL statements.",
                            field.type_name, field.field_name
                        ),
                        field.pos,
                    )
                })?,
                (None, None) => continue,
            };

            let response = if field.returns_list { LIST_RESPONSE } else { SINGLE_RESPONSE };
            ctx.resolvers_mut().add_resolver(
                ResolverPipeline::pipeline(
                    field.type_name.as_str(),
                    field.field_name.as_str(),
                    PipelineFunction::new(
                        Some(strategy.lambda_data_source_name()),
                        statement_request(&statement, strategy.db_type),
                        response,
                    ),
                )
                .in_stack(SQL_STACK),
            )?;
            tracing::debug!(type_name = %field.type_name, field_name = %field.field_name, "added custom SQL resolver");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_are_embedded_as_json() {
        insta::assert_snapshot!(
            statement_expression("SELECT * FROM posts WHERE title = 'it''s' AND id = :id"),
            @r###"$util.parseJson('"SELECT * FROM posts WHERE title = ''it''''s'' AND id = :id"')"###
        );
    }
}
