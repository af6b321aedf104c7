use std::collections::HashMap;

use indexmap::IndexMap;

/// GraphQL names mapped to the names of their backing table and columns.
///
/// Lookups of names that were never mapped return the name itself.
#[derive(Debug, Default)]
pub struct ResourceNames {
    models: HashMap<String, String>,
    fields: IndexMap<String, IndexMap<String, String>>,
}

impl ResourceNames {
    pub fn set_model_name_mapping(&mut self, model_name: impl Into<String>, original_name: impl Into<String>) {
        self.models.insert(model_name.into(), original_name.into());
    }

    /// The backing name of `model_name`.
    pub fn get_model_name_mapping<'a>(&'a self, model_name: &'a str) -> &'a str {
        self.models.get(model_name).map_or(model_name, String::as_str)
    }

    pub fn is_model_renamed(&self, model_name: &str) -> bool {
        self.models
            .get(model_name)
            .is_some_and(|original| original != model_name)
    }

    /// The GraphQL model backed by `original_name`, if any model maps to it.
    pub fn model_for_original_name(&self, original_name: &str) -> Option<&str> {
        self.models
            .iter()
            .find(|(_, original)| original.as_str() == original_name)
            .map(|(model, _)| model.as_str())
    }

    pub fn set_field_name_mapping(
        &mut self,
        model_name: impl Into<String>,
        field_name: impl Into<String>,
        original_name: impl Into<String>,
    ) {
        self.fields
            .entry(model_name.into())
            .or_default()
            .insert(field_name.into(), original_name.into());
    }

    pub fn get_field_name_mapping<'a>(&'a self, model_name: &str, field_name: &'a str) -> &'a str {
        self.fields
            .get(model_name)
            .and_then(|fields| fields.get(field_name))
            .map_or(field_name, String::as_str)
    }

    /// Every `(graphql field, backing column)` pair registered for `model_name`.
    pub fn field_mappings(&self, model_name: &str) -> Vec<(&str, &str)> {
        self.fields
            .get(model_name)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(field, original)| (field.as_str(), original.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Table logical id for a model, derived from its backing name.
    pub fn table_logical_id(&self, model_name: &str) -> String {
        format!("{}Table", self.get_model_name_mapping(model_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_names_resolve_to_themselves() {
        let names = ResourceNames::default();

        assert_eq!(names.get_model_name_mapping("Todo"), "Todo");
        assert_eq!(names.get_field_name_mapping("Todo", "content"), "content");
        assert_eq!(names.table_logical_id("Todo"), "TodoTable");
    }

    #[test]
    fn renamed_models_and_fields() {
        let mut names = ResourceNames::default();
        names.set_model_name_mapping("Article", "Post");
        names.set_field_name_mapping("Article", "headline", "title");

        assert!(names.is_model_renamed("Article"));
        assert_eq!(names.table_logical_id("Article"), "PostTable");
        assert_eq!(names.model_for_original_name("Post"), Some("Article"));
        assert_eq!(names.field_mappings("Article"), [("headline", "title")]);
    }
}
