use graphql_transformer_core::{
    context::{PipelineFunction, Slot},
    TransformerContext, TransformerError,
};
use indoc::formatdoc;
use serde_json::{Map, Value};

const EMPTY_PAYLOAD: &str = "{\n  \"version\": \"2018-05-29\",\n  \"payload\": {}\n}\n";

fn field_map(mappings: &[(String, String)]) -> String {
    let map: Map<String, Value> = mappings
        .iter()
        .map(|(field, attribute)| (field.clone(), Value::String(attribute.clone())))
        .collect();
    Value::Object(map).to_string()
}

/// Renames mutation input keys to stored attribute names before the data load.
fn input_mapping(mappings: &[(String, String)]) -> PipelineFunction {
    let request = formatdoc! {r#"
        $util.qr($ctx.stash.put("fieldMap", $util.parseJson('{map}')))
        #set( $input = $util.defaultIfNull($ctx.stash.transformedArgs, $util.defaultIfNull($ctx.args.input, {{}})) )
        #foreach( $entry in $ctx.stash.fieldMap.entrySet() )
          #if( $input.containsKey($entry.key) )
            $util.qr($input.put($entry.value, $input.get($entry.key)))
            $util.qr($input.remove($entry.key))
          #end
        #end
        $util.qr($ctx.stash.put("transformedArgs", $input))
        $util.toJson({{}})
    "#, map = field_map(mappings)};

    PipelineFunction::local(request, "$util.toJson({})\n")
}

/// Renames stored attributes back to GraphQL fields on the loaded record or page of records.
fn output_mapping(mappings: &[(String, String)]) -> PipelineFunction {
    let response = formatdoc! {r#"
        #set( $fieldMap = $util.parseJson('{map}') )
        #set( $result = $ctx.prev.result )
        #if( !$util.isNull($result) && $util.isList($result.items) )
          #set( $records = $result.items )
        #else
          #set( $records = [$result] )
        #end
        #foreach( $record in $records )
          #if( !$util.isNull($record) )
            #foreach( $entry in $fieldMap.entrySet() )
              #if( $record.containsKey($entry.value) )
                $util.qr($record.put($entry.key, $record.get($entry.value)))
                $util.qr($record.remove($entry.value))
              #end
            #end
          #end
        #end
        $util.toJson($result)
    "#, map = field_map(mappings)};

    PipelineFunction::local(EMPTY_PAYLOAD, response)
}

/// Guard the resolver of `type_name.field_name` with field name translation: inputs are renamed in
/// `init` when `map_input` is set, results are always renamed in `postDataLoad`.
pub fn attach_field_mapping_slots(
    ctx: &mut TransformerContext,
    type_name: &str,
    field_name: &str,
    mappings: &[(String, String)],
    map_input: bool,
) -> Result<(), TransformerError> {
    if mappings.is_empty() {
        return Ok(());
    }

    let resolvers = ctx.resolvers_mut();
    if map_input {
        resolvers.add_to_slot(type_name, field_name, Slot::Init, input_mapping(mappings))?;
    }
    resolvers.add_to_slot(type_name, field_name, Slot::PostDataLoad, output_mapping(mappings))?;

    tracing::debug!(type_name, field_name, "attached field mapping slots");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_maps_are_json_objects() {
        let mappings = vec![("postCommentsId".to_owned(), "articleCommentsId".to_owned())];

        insta::assert_snapshot!(field_map(&mappings), @r###"{"postCommentsId":"articleCommentsId"}"###);
    }

    #[test]
    fn input_mapping_renames_before_the_data_load() {
        let mappings = vec![("title".to_owned(), "headline".to_owned())];
        let function = input_mapping(&mappings);

        assert!(function.data_source.is_none());
        assert!(function
            .request
            .as_str()
            .contains("$util.qr($ctx.stash.put(\"transformedArgs\", $input))"));
    }
}
