use indoc::{formatdoc, indoc};

const DEFAULT_SEARCH_LIMIT: u32 = 100;

pub const SEARCH_RESPONSE: &str = indoc! {r#"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    #set( $items = [] )
    #set( $nextToken = $util.toJson(null) )
    #foreach( $entry in $ctx.result.hits.hits )
      #if( !$foreach.hasNext )
        #set( $nextToken = $util.base64Encode($util.toJson($entry.get("sort"))) )
      #end
      $util.qr($items.add($entry.get("_source")))
    #end
    #set( $aggregateItems = [] )
    #foreach( $name in $util.defaultIfNull($ctx.result.aggregations, {}).keySet() )
      #set( $aggregation = $ctx.result.aggregations.get($name) )
      #set( $result = {} )
      #if( !$util.isNullOrEmpty($aggregation.buckets) )
        $util.qr($result.put("__typename", "SearchableAggregateBucketResult"))
        $util.qr($result.put("buckets", $aggregation.buckets))
      #elseif( !$util.isNull($aggregation.value) )
        $util.qr($result.put("__typename", "SearchableAggregateScalarResult"))
        $util.qr($result.put("value", $aggregation.value))
      #end
      $util.qr($aggregateItems.add({ "name": $name, "result": $result }))
    #end
    $util.toJson({
      "items": $items,
      "total": $ctx.result.hits.total.value,
      "nextToken": $nextToken,
      "aggregateItems": $aggregateItems
    })
"#};

/// The OpenSearch query of a `search` field against `index`, sorting on `sort_field` by default.
pub fn search_request(index: &str, sort_field: &str) -> String {
    formatdoc! {r#"
        #set( $sortValues = [] )
        #foreach( $sortItem in $util.defaultIfNull($ctx.args.sort, []) )
          #set( $sortField = $util.defaultIfNull($sortItem.field, "{sort_field}") )
          $util.qr($sortValues.add({{ "${{sortField}}.keyword": {{ "order": $util.defaultIfNull($sortItem.direction, "desc") }} }}))
        #end
        #if( $sortValues.isEmpty() )
          $util.qr($sortValues.add({{ "{sort_field}.keyword": {{ "order": "desc" }} }}))
        #end
        #set( $aggregates = {{}} )
        #foreach( $aggregate in $util.defaultIfNull($ctx.args.aggregates, []) )
          #if( $aggregate.type == "terms" )
            $util.qr($aggregates.put($aggregate.name, {{ "terms": {{ "field": "${{aggregate.field}}.keyword" }} }}))
          #else
            $util.qr($aggregates.put($aggregate.name, {{ "$aggregate.type": {{ "field": $aggregate.field }} }}))
          #end
        #end
        #if( $util.isNullOrEmpty($ctx.args.filter) )
          #set( $query = {{ "match_all": {{}} }} )
        #else
          #set( $query = $util.parseJson($util.transform.toElasticsearchQueryDSL($ctx.args.filter)) )
        #end
        #if( $ctx.stash.authFilter )
          #set( $authQuery = $util.parseJson($util.transform.toElasticsearchQueryDSL($ctx.stash.authFilter)) )
          #set( $query = {{ "bool": {{ "must": [$query, $authQuery] }} }} )
        #end
        {{
          "version": "2018-05-29",
          "operation": "GET",
          "path": "/{index}/_doc/_search",
          "params": {{
            "body": {{
              #if( $ctx.args.nextToken )
              "search_after": $util.base64Decode($ctx.args.nextToken),
              #end
              #if( $ctx.args.from )
              "from": $ctx.args.from,
              #end
              "size": $util.defaultIfNull($ctx.args.limit, {DEFAULT_SEARCH_LIMIT}),
              "sort": $util.toJson($sortValues),
              "version": false,
              "query": $util.toJson($query),
              "aggs": $util.toJson($aggregates)
            }}
          }}
        }}
    "#}
}
