use graphql_transformer_core::{context::KeyDefinition, document::ast};
use inflector::Inflector;

pub const INPUT_ARG_INPUT: &str = "input";
pub const INPUT_ARG_CONDITION: &str = "condition";
pub const INPUT_ARG_FILTER: &str = "filter";
pub const INPUT_ARG_LIMIT: &str = "limit";
pub const INPUT_ARG_NEXT_TOKEN: &str = "nextToken";
pub const INPUT_ARG_SORT_DIRECTION: &str = "sortDirection";
pub const INPUT_ARG_LAST_SYNC: &str = "lastSync";

pub const CONNECTION_FIELD_ITEMS: &str = "items";
pub const CONNECTION_FIELD_NEXT_TOKEN: &str = "nextToken";
pub const CONNECTION_FIELD_STARTED_AT: &str = "startedAt";

pub const SYNC_FIELD_VERSION: &str = "_version";
pub const SYNC_FIELD_DELETED: &str = "_deleted";
pub const SYNC_FIELD_LAST_CHANGED_AT: &str = "_lastChangedAt";

pub const SORT_DIRECTION_TYPE: &str = "ModelSortDirection";
pub const ATTRIBUTE_TYPES_TYPE: &str = "ModelAttributeTypes";

pub struct ModelNames;

/// CONVENTIONS:
///     - Inputs are suffixed by "Input"
///     - Generated types are prefixed by "Model" unless they are mutation inputs
///     - Operation names are the lower camel case operation followed by the model name
impl ModelNames {
    pub fn plural(model_name: &str) -> String {
        model_name.to_plural()
    }

    pub fn get_query(model_name: &str) -> String {
        format!("get{model_name}")
    }

    pub fn list_query(model_name: &str) -> String {
        format!("list{}", Self::plural(model_name))
    }

    pub fn sync_query(model_name: &str) -> String {
        format!("sync{}", Self::plural(model_name))
    }

    pub fn create_mutation(model_name: &str) -> String {
        format!("create{model_name}")
    }

    pub fn update_mutation(model_name: &str) -> String {
        format!("update{model_name}")
    }

    pub fn delete_mutation(model_name: &str) -> String {
        format!("delete{model_name}")
    }

    pub fn on_create_subscription(model_name: &str) -> String {
        format!("onCreate{model_name}")
    }

    pub fn on_update_subscription(model_name: &str) -> String {
        format!("onUpdate{model_name}")
    }

    pub fn on_delete_subscription(model_name: &str) -> String {
        format!("onDelete{model_name}")
    }

    pub fn create_input(model_name: &str) -> String {
        format!("Create{model_name}Input")
    }

    pub fn update_input(model_name: &str) -> String {
        format!("Update{model_name}Input")
    }

    pub fn delete_input(model_name: &str) -> String {
        format!("Delete{model_name}Input")
    }

    pub fn filter_input(model_name: &str) -> String {
        format!("Model{model_name}FilterInput")
    }

    pub fn condition_input(model_name: &str) -> String {
        format!("Model{model_name}ConditionInput")
    }

    pub fn connection(model_name: &str) -> String {
        format!("Model{model_name}Connection")
    }

    /// Input of a non-model object type embedded in a model.
    pub fn embedded_input(type_name: &str) -> String {
        format!("{type_name}Input")
    }

    /// The filter input of a scalar or enum field.
    pub fn scalar_filter_input(type_name: &str, is_enum: bool) -> String {
        if is_enum {
            return format!("Model{type_name}Input");
        }

        let filter_scalar = match type_name {
            "ID" => "ID",
            "Int" | "AWSTimestamp" | "BigInt" => "Int",
            "Float" => "Float",
            "Boolean" => "Boolean",
            _ => "String",
        };
        format!("Model{filter_scalar}Input")
    }

    pub fn key_condition_input(type_name: &str) -> String {
        let key_scalar = match type_name {
            "ID" => "ID",
            "Int" | "AWSTimestamp" | "BigInt" => "Int",
            "Float" => "Float",
            _ => "String",
        };
        format!("Model{key_scalar}KeyConditionInput")
    }

    /// Argument name of a sort key: the field itself, or its fields joined in camel case when composite.
    pub fn sort_key_argument(key: &KeyDefinition) -> Option<String> {
        let (first, rest) = key.sort_key_fields.split_first()?;
        Some(
            std::iter::once(first.clone())
                .chain(rest.iter().map(|field| ast::upper_first(field)))
                .collect(),
        )
    }

    pub fn composite_key_condition_input(model_name: &str, key: &KeyDefinition) -> String {
        let fields: String = key.sort_key_fields.iter().map(|field| ast::upper_first(field)).collect();
        format!("Model{model_name}{}CompositeKeyConditionInput", fields)
    }

    pub fn composite_key_input(model_name: &str, key: &KeyDefinition) -> String {
        let fields: String = key.sort_key_fields.iter().map(|field| ast::upper_first(field)).collect();
        format!("Model{model_name}{}CompositeKeyInput", fields)
    }

    /// The nested stack every resource of a model goes to.
    pub fn stack(model_name: &str) -> String {
        model_name.to_owned()
    }

    pub fn data_source(model_name: &str) -> String {
        format!("{model_name}Table")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::todo("Todo", "listTodos")]
    #[case::post("Post", "listPosts")]
    #[case::category("Category", "listCategories")]
    fn list_query_uses_the_plural(#[case] model_name: &str, #[case] expected: &str) {
        assert_eq!(ModelNames::list_query(model_name), expected);
    }

    #[test]
    fn composite_sort_keys() {
        let key = KeyDefinition::new("id", vec!["status".to_owned(), "createdAt".to_owned()]);

        assert_eq!(ModelNames::sort_key_argument(&key).as_deref(), Some("statusCreatedAt"));
        assert_eq!(
            ModelNames::composite_key_condition_input("Order", &key),
            "ModelOrderStatusCreatedAtCompositeKeyConditionInput"
        );
        assert_eq!(ModelNames::sort_key_argument(&KeyDefinition::new("id", Vec::new())), None);
    }

    #[test]
    fn scalar_filters() {
        assert_eq!(ModelNames::scalar_filter_input("AWSDateTime", false), "ModelStringInput");
        assert_eq!(ModelNames::scalar_filter_input("AWSTimestamp", false), "ModelIntInput");
        assert_eq!(ModelNames::scalar_filter_input("Status", true), "ModelStatusInput");
    }
}
