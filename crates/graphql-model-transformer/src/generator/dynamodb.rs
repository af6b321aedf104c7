use graphql_transformer_core::context::{KeyDefinition, SecondaryIndex};
use indoc::{formatdoc, indoc};

use super::{timestamp_lines, ModelVtlGenerator, OperationConfig, RelationLookup, ResolverTemplates, RESPONSE_TEMPLATE};
use crate::names::{ModelNames, SYNC_FIELD_VERSION};

const DEFAULT_PAGE_SIZE: u32 = 100;

/// Templates talking to a DynamoDB table directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamoDbGenerator;

impl ModelVtlGenerator for DynamoDbGenerator {
    fn data_source_name(&self, model_name: &str) -> String {
        ModelNames::data_source(model_name)
    }

    fn get(&self, config: &OperationConfig) -> ResolverTemplates {
        let request = formatdoc! {r#"
            {{
              "version": "2018-05-29",
              "operation": "GetItem",
              "key": {key}
            }}
        "#, key = key_json(&config.key, "ctx.args")};

        ResolverTemplates::new(request, RESPONSE_TEMPLATE)
    }

    fn list(&self, config: &OperationConfig) -> ResolverTemplates {
        let mut request = list_request_header();

        match sort_key_query(&config.key, "ctx.args") {
            Some(query) => {
                request.push_str(&formatdoc! {r#"
                        #if( !$util.isNull($ctx.args.{partition}) )
                        {query}
                          #set( $ListRequest.scanIndexForward = $util.defaultIfNull($ctx.args.sortDirection, "ASC") == "ASC" )
                        #else
                          #set( $ListRequest.operation = "Scan" )
                        #end
                    "#, partition = config.key.partition_key, query = indent(&query)});
            }
            None => request.push_str("#set( $ListRequest.operation = \"Scan\" )\n"),
        }

        request.push_str("$util.toJson($ListRequest)\n");
        ResolverTemplates::new(request, RESPONSE_TEMPLATE)
    }

    fn sync(&self, _config: &OperationConfig) -> ResolverTemplates {
        let request = formatdoc! {r#"
            #set( $filter = $util.defaultIfNull($ctx.args.filter, {{}}) )
            #if( $ctx.stash.authFilter )
              #set( $filter = {{ "and": [$filter, $ctx.stash.authFilter] }} )
            #end
            {{
              "version": "2018-05-29",
              "operation": "Sync",
              "limit": $util.defaultIfNull($ctx.args.limit, {DEFAULT_PAGE_SIZE}),
              "nextToken": $util.toJson($util.defaultIfNull($ctx.args.nextToken, null)),
              "lastSync": $util.toJson($util.defaultIfNull($ctx.args.lastSync, null)),
              #if( $filter.isEmpty() )
              "filter": null
              #else
              "filter": $util.transform.toDynamoDBFilterExpression($filter)
              #end
            }}
        "#};

        ResolverTemplates::new(request, RESPONSE_TEMPLATE)
    }

    fn create(&self, config: &OperationConfig) -> ResolverTemplates {
        let mut request = String::from("#set( $args = $util.defaultIfNull($ctx.stash.transformedArgs, $ctx.args.input) )\n");
        request.push_str(&timestamp_lines(config, true));
        request.push_str(&format!("$util.qr($args.put(\"__typename\", \"{}\"))\n", config.model_name));
        if config.key.partition_key == "id" {
            request.push_str("$util.qr($args.put(\"id\", $util.defaultIfNull($args.id, $util.autoId())))\n");
        }
        if let (Some(attribute), true) = (config.key.sort_key_attribute(), config.key.sort_key_fields.len() > 1) {
            request.push_str(&format!(
                "$util.qr($args.put(\"{attribute}\", {}))\n",
                composite_value("args", &config.key.sort_key_fields)
            ));
        }
        request.push_str(&condition_block(&config.key, "attribute_not_exists"));
        request.push_str(&formatdoc! {r#"
                {{
                  "version": "2018-05-29",
                  "operation": "PutItem",
                  "key": {key},
                  "attributeValues": $util.dynamodb.toMapValuesJson($args),
                  "condition": $util.toJson($condition)
                }}
            "#, key = key_json(&config.key, "args")});

        ResolverTemplates::new(request, RESPONSE_TEMPLATE)
    }

    fn update(&self, config: &OperationConfig) -> ResolverTemplates {
        let mut request = String::from("#set( $args = $util.defaultIfNull($ctx.stash.transformedArgs, $ctx.args.input) )\n");
        request.push_str(&timestamp_lines(config, false));
        request.push_str(&format!("$util.qr($args.put(\"__typename\", \"{}\"))\n", config.model_name));

        let ignored = config
            .key
            .fields()
            .chain(std::iter::once(SYNC_FIELD_VERSION))
            .map(|field| format!("\"{field}\""))
            .collect::<Vec<_>>()
            .join(", ");

        request.push_str(&formatdoc! {r##"
                #set( $keyFields = [{ignored}] )
                #set( $expNames = {{}} )
                #set( $expValues = {{}} )
                #set( $expSet = {{}} )
                #set( $expRemove = [] )
                #foreach( $entry in $args.entrySet() )
                  #if( !$keyFields.contains($entry.key) )
                    $util.qr($expNames.put("#$entry.key", "$entry.key"))
                    #if( $util.isNull($entry.value) )
                      $util.qr($expRemove.add("#$entry.key"))
                    #else
                      $util.qr($expSet.put("#$entry.key", ":$entry.key"))
                      $util.qr($expValues.put(":$entry.key", $util.dynamodb.toDynamoDB($entry.value)))
                    #end
                  #end
                #end
                #set( $expression = "" )
                #if( !$expSet.isEmpty() )
                  #set( $expression = "SET" )
                  #foreach( $entry in $expSet.entrySet() )
                    #set( $expression = "$expression $entry.key = $entry.value" )
                    #if( $foreach.hasNext() )
                      #set( $expression = "$expression," )
                    #end
                  #end
                #end
                #if( !$expRemove.isEmpty() )
                  #set( $expression = "$expression REMOVE" )
                  #foreach( $entry in $expRemove )
                    #set( $expression = "$expression $entry" )
                    #if( $foreach.hasNext() )
                      #set( $expression = "$expression," )
                    #end
                  #end
                #end
                #set( $update = {{ "expression": $expression, "expressionNames": $expNames }} )
                #if( !$expValues.isEmpty() )
                  #set( $update.expressionValues = $expValues )
                #end
            "##});
        request.push_str(&condition_block(&config.key, "attribute_exists"));

        let version = if config.sync_enabled {
            format!(",\n  \"_version\": $util.defaultIfNull($args.{SYNC_FIELD_VERSION}, 0)")
        } else {
            String::new()
        };
        request.push_str(&formatdoc! {r#"
                {{
                  "version": "2018-05-29",
                  "operation": "UpdateItem",
                  "key": {key},
                  "update": $util.toJson($update),
                  "condition": $util.toJson($condition){version}
                }}
            "#, key = key_json(&config.key, "args")});

        ResolverTemplates::new(request, RESPONSE_TEMPLATE)
    }

    fn delete(&self, config: &OperationConfig) -> ResolverTemplates {
        let mut request = String::from("#set( $args = $util.defaultIfNull($ctx.stash.transformedArgs, $ctx.args.input) )\n");
        request.push_str(&condition_block(&config.key, "attribute_exists"));

        let version = if config.sync_enabled {
            format!(",\n  \"_version\": $util.defaultIfNull($args.{SYNC_FIELD_VERSION}, 0)")
        } else {
            String::new()
        };
        request.push_str(&formatdoc! {r#"
                {{
                  "version": "2018-05-29",
                  "operation": "DeleteItem",
                  "key": {key},
                  "condition": $util.toJson($condition){version}
                }}
            "#, key = key_json(&config.key, "args")});

        ResolverTemplates::new(request, RESPONSE_TEMPLATE)
    }

    fn index_query(&self, _config: &OperationConfig, index: &SecondaryIndex) -> ResolverTemplates {
        let mut request = list_request_header();
        request.push_str("#set( $ListRequest.operation = \"Query\" )\n");
        request.push_str(&format!("#set( $ListRequest.index = \"{}\" )\n", index.name));
        request.push_str(&partition_query(&index.key.partition_key, &format!("$ctx.args.{}", index.key.partition_key)));
        if let Some(query) = sort_key_query(&index.key, "ctx.args") {
            request.push_str(&query);
        }
        request.push_str("#set( $ListRequest.scanIndexForward = $util.defaultIfNull($ctx.args.sortDirection, \"ASC\") == \"ASC\" )\n");
        request.push_str("$util.toJson($ListRequest)\n");

        ResolverTemplates::new(request, RESPONSE_TEMPLATE)
    }

    fn relation(&self, config: &OperationConfig, lookup: &RelationLookup) -> ResolverTemplates {
        let mut request = String::new();
        for (_, source_field) in &lookup.key_bindings {
            let empty = if lookup.many { "{ \"items\": [] }" } else { "null" };
            request.push_str(&format!(
                "#if( $util.isNull($ctx.source.{source_field}) )\n  #return({empty})\n#end\n"
            ));
        }

        let reads_primary_key = lookup.index_name.is_none()
            && !lookup.many
            && lookup
                .key_bindings
                .iter()
                .map(|(related, _)| related.as_str())
                .eq(config.key.fields());

        if reads_primary_key {
            let key = lookup
                .key_bindings
                .iter()
                .map(|(related, source)| format!("\"{related}\": $util.dynamodb.toDynamoDBJson($ctx.source.{source})"))
                .collect::<Vec<_>>()
                .join(", ");
            request.push_str(&formatdoc! {r#"
                    {{
                      "version": "2018-05-29",
                      "operation": "GetItem",
                      "key": {{ {key} }}
                    }}
                "#});
            return ResolverTemplates::new(request, RESPONSE_TEMPLATE);
        }

        request.push_str(&list_request_header());
        request.push_str("#set( $ListRequest.operation = \"Query\" )\n");
        if let Some(index_name) = &lookup.index_name {
            request.push_str(&format!("#set( $ListRequest.index = \"{index_name}\" )\n"));
        }
        if let Some(((partition, partition_source), rest)) = lookup.key_bindings.split_first() {
            request.push_str(&partition_query(partition, &format!("$ctx.source.{partition_source}")));
            if !rest.is_empty() {
                let attribute = rest.iter().map(|(related, _)| related.as_str()).collect::<Vec<_>>().join("#");
                let sources: Vec<_> = rest.iter().map(|(_, source)| source.clone()).collect();
                request.push_str(&formatdoc! {r##"
                        #set( $ListRequest.query.expression = "$ListRequest.query.expression AND #sortKey = :sortKey" )
                        $util.qr($ListRequest.query.expressionNames.put("#sortKey", "{attribute}"))
                        $util.qr($ListRequest.query.expressionValues.put(":sortKey", $util.dynamodb.toDynamoDB({value})))
                    "##, value = composite_value("ctx.source", &sources)});
            }
        }

        if lookup.many {
            request.push_str("#set( $ListRequest.scanIndexForward = $util.defaultIfNull($ctx.args.sortDirection, \"ASC\") == \"ASC\" )\n");
            request.push_str("$util.toJson($ListRequest)\n");
            return ResolverTemplates::new(request, RESPONSE_TEMPLATE);
        }

        request.push_str("$util.toJson($ListRequest)\n");
        let response = indoc! {r"
            #if( $ctx.error )
              $util.error($ctx.error.message, $ctx.error.type)
            #end
            #if( $ctx.result.items.isEmpty() )
              $util.toJson(null)
            #else
              $util.toJson($ctx.result.items[0])
            #end
        "};
        ResolverTemplates::new(request, response)
    }
}

fn indent(text: &str) -> String {
    text.lines().map(|line| format!("  {line}\n")).collect::<String>().trim_end().to_owned()
}

fn list_request_header() -> String {
    formatdoc! {r#"
        #set( $limit = $util.defaultIfNull($ctx.args.limit, {DEFAULT_PAGE_SIZE}) )
        #set( $ListRequest = {{
          "version": "2018-05-29",
          "limit": $limit
        }} )
        #if( $ctx.args.nextToken )
          #set( $ListRequest.nextToken = $ctx.args.nextToken )
        #end
        #set( $filter = $util.defaultIfNull($ctx.args.filter, {{}}) )
        #if( $ctx.stash.authFilter )
          #if( $filter.isEmpty() )
            #set( $filter = $ctx.stash.authFilter )
          #else
            #set( $filter = {{ "and": [$filter, $ctx.stash.authFilter] }} )
          #end
        #end
        #if( !$filter.isEmpty() )
          #set( $ListRequest.filter = $util.parseJson($util.transform.toDynamoDBFilterExpression($filter)) )
        #end
    "#}
}

fn partition_query(attribute: &str, value: &str) -> String {
    formatdoc! {r##"
        #set( $ListRequest.query = {{
          "expression": "#partitionKey = :partitionKey",
          "expressionNames": {{ "#partitionKey": "{attribute}" }},
          "expressionValues": {{ ":partitionKey": $util.dynamodb.toDynamoDB({value}) }}
        }} )
    "##}
}

/// A `Query` on the partition key of `key`, narrowed by the sort key condition argument when the
/// caller passes one.
fn sort_key_query(key: &KeyDefinition, source: &str) -> Option<String> {
    let argument = ModelNames::sort_key_argument(key)?;
    let attribute = key.sort_key_attribute()?;
    let operand = |expression: &str| {
        if key.sort_key_fields.len() > 1 {
            composite_value(expression, &key.sort_key_fields)
        } else {
            format!("${expression}")
        }
    };

    let mut query = String::from("#set( $ListRequest.operation = \"Query\" )\n");
    query.push_str(&partition_query(
        &key.partition_key,
        &format!("${source}.{}", key.partition_key),
    ));
    query.push_str(&formatdoc! {r##"
            #set( $sortKeyCondition = ${source}.{argument} )
            #if( !$util.isNull($sortKeyCondition) )
              $util.qr($ListRequest.query.expressionNames.put("#sortKey", "{attribute}"))
              #set( $comparators = {{ "eq": "=", "le": "<=", "lt": "<", "ge": ">=", "gt": ">" }} )
              #foreach( $operator in $sortKeyCondition.keySet() )
                #if( $operator == "between" )
                  #set( $ListRequest.query.expression = "$ListRequest.query.expression AND #sortKey BETWEEN :sortKey0 AND :sortKey1" )
                  $util.qr($ListRequest.query.expressionValues.put(":sortKey0", $util.dynamodb.toDynamoDB({lower})))
                  $util.qr($ListRequest.query.expressionValues.put(":sortKey1", $util.dynamodb.toDynamoDB({upper})))
                #elseif( $operator == "beginsWith" )
                  #set( $ListRequest.query.expression = "$ListRequest.query.expression AND begins_with(#sortKey, :sortKey)" )
                  $util.qr($ListRequest.query.expressionValues.put(":sortKey", $util.dynamodb.toDynamoDB({begins_with})))
                #else
                  #set( $operand = $sortKeyCondition.get($operator) )
                  #set( $ListRequest.query.expression = "$ListRequest.query.expression AND #sortKey $comparators.get($operator) :sortKey" )
                  $util.qr($ListRequest.query.expressionValues.put(":sortKey", $util.dynamodb.toDynamoDB({operand})))
                #end
              #end
            #end
        "##,
            lower = operand("sortKeyCondition.between[0]"),
            upper = operand("sortKeyCondition.between[1]"),
            begins_with = operand("sortKeyCondition.beginsWith"),
            operand = operand("operand"),
        });

    Some(query)
}

/// The key object of an item, read from `source`.
fn key_json(key: &KeyDefinition, source: &str) -> String {
    let mut entries = vec![format!(
        "\"{partition}\": $util.dynamodb.toDynamoDBJson(${source}.{partition})",
        partition = key.partition_key
    )];

    match key.sort_key_fields.as_slice() {
        [] => (),
        [sort] => entries.push(format!("\"{sort}\": $util.dynamodb.toDynamoDBJson(${source}.{sort})")),
        fields => entries.push(format!(
            "\"{}\": $util.dynamodb.toDynamoDBJson({})",
            fields.join("#"),
            composite_value(source, fields)
        )),
    }

    format!("{{ {} }}", entries.join(", "))
}

/// A string template joining `fields` of `source` with `#`, the storage format of composite keys.
fn composite_value(source: &str, fields: &[String]) -> String {
    let parts: Vec<_> = fields.iter().map(|field| format!("${{{source}.{field}}}")).collect();
    format!("\"{}\"", parts.join("#"))
}

/// Builds `$condition`, requiring the item to exist or not, merged with the `condition` argument.
fn condition_block(key: &KeyDefinition, existence: &str) -> String {
    formatdoc! {r##"
        #set( $condition = {{
          "expression": "{existence}(#keyField)",
          "expressionNames": {{ "#keyField": "{partition}" }}
        }} )
        #if( $ctx.args.condition )
          #set( $conditionFilter = $util.parseJson($util.transform.toDynamoDBConditionExpression($ctx.args.condition)) )
          #set( $condition.expression = "($condition.expression) AND $conditionFilter.expression" )
          $util.qr($condition.expressionNames.putAll($conditionFilter.expressionNames))
          #if( $conditionFilter.expressionValues )
            #set( $condition.expressionValues = $conditionFilter.expressionValues )
          #end
        #end
        #if( $ctx.stash.authCondition )
          #set( $authFilter = $util.parseJson($util.transform.toDynamoDBConditionExpression($ctx.stash.authCondition)) )
          #set( $condition.expression = "($condition.expression) AND $authFilter.expression" )
          $util.qr($condition.expressionNames.putAll($authFilter.expressionNames))
          #if( $authFilter.expressionValues )
            #if( $condition.expressionValues )
              $util.qr($condition.expressionValues.putAll($authFilter.expressionValues))
            #else
              #set( $condition.expressionValues = $authFilter.expressionValues )
            #end
          #end
        #end
    "##, partition = key.partition_key}
}
