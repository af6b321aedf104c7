//! Filter, sort and aggregation inputs of the `search` queries.

use graphql_model_transformer::definitions::{field_kind, FieldKind};
use graphql_transformer_core::{
    document::{ast, SchemaDocument},
    TransformerError,
};
use indoc::{formatdoc, indoc};

const SHARED_TYPES: &str = indoc! {r"
    enum SearchableSortDirection {
      asc
      desc
    }

    enum SearchableAggregateType {
      terms
      avg
      min
      max
      sum
    }

    type SearchableAggregateScalarResult {
      value: Float!
    }

    type SearchableAggregateBucketResultItem {
      key: String!
      doc_count: Int!
    }

    type SearchableAggregateBucketResult {
      buckets: [SearchableAggregateBucketResultItem]
    }

    union SearchableAggregateGenericResult = SearchableAggregateScalarResult | SearchableAggregateBucketResult

    type SearchableAggregateResult {
      name: String!
      result: SearchableAggregateGenericResult
    }

    input SearchableStringFilterInput {
      ne: String
      gt: String
      lt: String
      gte: String
      lte: String
      eq: String
      match: String
      matchPhrase: String
      matchPhrasePrefix: String
      multiMatch: String
      exists: Boolean
      wildcard: String
      regexp: String
      range: [String]
    }

    input SearchableIDFilterInput {
      ne: ID
      gt: ID
      lt: ID
      gte: ID
      lte: ID
      eq: ID
      match: ID
      matchPhrase: ID
      matchPhrasePrefix: ID
      multiMatch: ID
      exists: Boolean
      wildcard: ID
      regexp: ID
      range: [ID]
    }

    input SearchableIntFilterInput {
      ne: Int
      gt: Int
      lt: Int
      gte: Int
      lte: Int
      eq: Int
      range: [Int]
    }

    input SearchableFloatFilterInput {
      ne: Float
      gt: Float
      lt: Float
      gte: Float
      lte: Float
      eq: Float
      range: [Float]
    }

    input SearchableBooleanFilterInput {
      eq: Boolean
      ne: Boolean
    }
"};

/// The filter input used for a scalar, `None` for types OpenSearch cannot filter on.
fn scalar_filter_input(type_name: &str) -> Option<&'static str> {
    match type_name {
        "ID" => Some("SearchableIDFilterInput"),
        "Int" | "AWSTimestamp" => Some("SearchableIntFilterInput"),
        "Float" => Some("SearchableFloatFilterInput"),
        "Boolean" => Some("SearchableBooleanFilterInput"),
        "String" | "AWSDate" | "AWSTime" | "AWSDateTime" | "AWSEmail" | "AWSURL" | "AWSPhone" | "AWSIPAddress" => {
            Some("SearchableStringFilterInput")
        }
        _ => None,
    }
}

pub fn filter_input(model_name: &str) -> String {
    format!("Searchable{model_name}FilterInput")
}

pub fn sort_input(model_name: &str) -> String {
    format!("Searchable{model_name}SortInput")
}

pub fn aggregation_input(model_name: &str) -> String {
    format!("Searchable{model_name}AggregationInput")
}

pub fn connection(model_name: &str) -> String {
    format!("Searchable{model_name}Connection")
}

/// Filterable fields of `model_name` with their filter input. Enums filter as strings.
fn searchable_fields(document: &SchemaDocument, model_name: &str) -> Vec<(String, String)> {
    document
        .fields(model_name)
        .iter()
        .filter(|field| !ast::is_list_type(&field.node.ty.node))
        .filter_map(|field| {
            let filter = match field_kind(document, &field.node.ty.node) {
                FieldKind::Scalar(type_name) => scalar_filter_input(type_name)?.to_owned(),
                FieldKind::Enum(_) => "SearchableStringFilterInput".to_owned(),
                FieldKind::Embedded(_) | FieldKind::Relation => return None,
            };
            Some((field.node.name.node.to_string(), filter))
        })
        .collect()
}

/// Add the inputs and the connection type of `model_name`'s search query.
pub fn add_search_types(document: &mut SchemaDocument, model_name: &str) -> Result<(), TransformerError> {
    let fields = searchable_fields(document, model_name);
    let filter = filter_input(model_name);

    let mut sdl = String::from(SHARED_TYPES);
    sdl.push_str(&format!("\ninput {filter} {{\n"));
    for (field_name, input) in &fields {
        sdl.push_str(&format!("  {field_name}: {input}\n"));
    }
    sdl.push_str(&format!("  and: [{filter}]\n  or: [{filter}]\n  not: {filter}\n}}\n"));

    let field_values: Vec<&str> = fields.iter().map(|(field_name, _)| field_name.as_str()).collect();
    let values = field_values.join("\n  ");
    sdl.push_str(&formatdoc!(
        r"
            enum Searchable{model}SortableFields {{
              {values}
            }}

            input {sort} {{
              field: Searchable{model}SortableFields
              direction: SearchableSortDirection
            }}

            enum Searchable{model}AggregateField {{
              {values}
            }}

            input {aggregation} {{
              name: String!
              type: SearchableAggregateType!
              field: Searchable{model}AggregateField!
            }}

            type {connection} {{
              items: [{model}]!
              nextToken: String
              total: Int
              aggregateItems: [SearchableAggregateResult]!
            }}
        ",
        model = model_name,
        values = values,
        sort = sort_input(model_name),
        aggregation = aggregation_input(model_name),
        connection = connection(model_name),
    ));

    for definition in SchemaDocument::parse(&sdl)?.types() {
        document.add_type_if_absent(definition.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("String", Some("SearchableStringFilterInput"))]
    #[case("AWSDateTime", Some("SearchableStringFilterInput"))]
    #[case("AWSTimestamp", Some("SearchableIntFilterInput"))]
    #[case("AWSJSON", None)]
    fn scalar_filters(#[case] type_name: &str, #[case] expected: Option<&str>) {
        assert_eq!(scalar_filter_input(type_name), expected);
    }
}
