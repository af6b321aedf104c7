use graphql_transformer_core::{
    context::SecondaryIndex,
    strategy::{SqlDbType, SqlModelDataSourceStrategy},
};
use indoc::formatdoc;
use serde_json::json;

use super::{timestamp_lines, ModelVtlGenerator, OperationConfig, RelationLookup, ResolverTemplates};

/// Templates invoking the SQL Lambda of a strategy. The Lambda translates the operation to SQL.
#[derive(Debug, Clone)]
pub struct SqlLambdaGenerator {
    data_source: String,
    db_type: SqlDbType,
}

impl SqlLambdaGenerator {
    pub fn new(strategy: &SqlModelDataSourceStrategy) -> Self {
        SqlLambdaGenerator {
            data_source: strategy.lambda_data_source_name(),
            db_type: strategy.db_type,
        }
    }
}

const LAMBDA_RESPONSE_TEMPLATE: &str = indoc::indoc! {r"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    $util.toJson($ctx.result)
"};

const LAMBDA_INVOKE: &str = indoc::indoc! {r#"
    {
      "version": "2018-05-29",
      "operation": "Invoke",
      "payload": $util.toJson($lambdaInput)
    }
"#};

/// The `metadata` block of a request: which columns identify a row and how fields map to columns.
fn metadata(config: &OperationConfig, keys: Vec<&str>) -> String {
    let column_mapping: serde_json::Map<_, _> = config
        .field_mappings
        .iter()
        .map(|(field, column)| (field.clone(), json!(column)))
        .collect();

    json!({
        "keys": keys,
        "nonScalarFields": [],
        "columnMapping": column_mapping,
    })
    .to_string()
}

/// The lambda input of one operation. `args` is a VTL expression.
fn lambda_input(
    config: &OperationConfig,
    db_type: SqlDbType,
    operation: &str,
    args: &str,
    keys: Vec<&str>,
) -> String {
    formatdoc! {r#"
        #set( $lambdaInput = {{}} )
        #set( $lambdaInput.table = "{table}" )
        #set( $lambdaInput.args = {args} )
        #set( $lambdaInput.operation = "{operation}" )
        #set( $lambdaInput.engine = "{db_type}" )
        #set( $lambdaInput.operationName = $ctx.info.fieldName )
        #set( $lambdaInput.metadata = $util.parseJson('{metadata}') )
        #set( $lambdaInput.args.metadata = $lambdaInput.metadata )
        {LAMBDA_INVOKE}"#,
        table = config.table_name,
        metadata = metadata(config, keys),
    }
}

impl SqlLambdaGenerator {
    fn request(&self, config: &OperationConfig, operation: &str, args: &str) -> ResolverTemplates {
        ResolverTemplates::new(
            lambda_input(config, self.db_type, operation, args, config.key.fields().collect()),
            LAMBDA_RESPONSE_TEMPLATE,
        )
    }

    fn mutation(&self, config: &OperationConfig, operation: &str, creating: bool) -> ResolverTemplates {
        let mut request = String::from("#set( $args = $util.defaultIfNull($ctx.stash.transformedArgs, $ctx.args) )\n");
        if operation != "DELETE" {
            request.push_str("#set( $input = $args.input )\n");
            request.push_str(&timestamp_lines(config, creating).replace("$args.", "$input."));
        }
        request.push_str(&lambda_input(config, self.db_type, operation, "$args", config.key.fields().collect()));

        ResolverTemplates::new(request, LAMBDA_RESPONSE_TEMPLATE)
    }
}

impl ModelVtlGenerator for SqlLambdaGenerator {
    fn data_source_name(&self, _model_name: &str) -> String {
        self.data_source.clone()
    }

    fn get(&self, config: &OperationConfig) -> ResolverTemplates {
        self.request(config, "GET", "$ctx.args")
    }

    fn list(&self, config: &OperationConfig) -> ResolverTemplates {
        self.request(config, "LIST", "$ctx.args")
    }

    fn sync(&self, config: &OperationConfig) -> ResolverTemplates {
        self.request(config, "SYNC", "$ctx.args")
    }

    fn create(&self, config: &OperationConfig) -> ResolverTemplates {
        self.mutation(config, "CREATE", true)
    }

    fn update(&self, config: &OperationConfig) -> ResolverTemplates {
        self.mutation(config, "UPDATE", false)
    }

    fn delete(&self, config: &OperationConfig) -> ResolverTemplates {
        self.mutation(config, "DELETE", false)
    }

    fn index_query(&self, config: &OperationConfig, index: &SecondaryIndex) -> ResolverTemplates {
        let mut templates = self.request(config, "INDEX", "$ctx.args");
        let request = templates.request.as_str().replace(
            "#set( $lambdaInput.operationName",
            &format!("#set( $lambdaInput.indexName = \"{}\" )\n#set( $lambdaInput.operationName", index.name),
        );
        templates.request = request.into();
        templates
    }

    fn relation(&self, config: &OperationConfig, lookup: &RelationLookup) -> ResolverTemplates {
        let mut request = String::new();
        let empty = if lookup.many { "{ \"items\": [] }" } else { "null" };
        for (_, source_field) in &lookup.key_bindings {
            request.push_str(&format!(
                "#if( $util.isNull($ctx.source.{source_field}) )\n  #return({empty})\n#end\n"
            ));
        }

        request.push_str("#set( $filter = {} )\n");
        for (related_field, source_field) in &lookup.key_bindings {
            request.push_str(&format!(
                "$util.qr($filter.put(\"{related_field}\", {{ \"eq\": $ctx.source.{source_field} }}))\n"
            ));
        }
        request.push_str(concat!(
            "#set( $args = { \"filter\": $filter, \"limit\": $util.defaultIfNull($ctx.args.limit, 100), ",
            "\"nextToken\": $ctx.args.nextToken } )\n"
        ));

        let operation = if lookup.many { "LIST" } else { "GET_FIRST" };
        request.push_str(&lambda_input(config, self.db_type, operation, "$args", config.key.fields().collect()));

        ResolverTemplates::new(request, LAMBDA_RESPONSE_TEMPLATE)
    }
}
