use graphql_transformer_core::directive::DirectiveArguments;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::names::ModelNames;

pub const MODEL_DIRECTIVE_DEFINITION: &str = r"
directive @model(
  queries: ModelQueryMap
  mutations: ModelMutationMap
  subscriptions: ModelSubscriptionMap
  timestamps: TimestampConfiguration
) on OBJECT

input ModelMutationMap {
  create: String
  update: String
  delete: String
}

input ModelQueryMap {
  get: String
  list: String
}

input ModelSubscriptionMap {
  onCreate: [String]
  onUpdate: [String]
  onDelete: [String]
  level: ModelSubscriptionLevel
}

enum ModelSubscriptionLevel {
  off
  public
  on
}

input TimestampConfiguration {
  createdAt: String
  updatedAt: String
}
";

/// Arguments of `@model`. A section explicitly set to `null` disables it entirely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelArguments {
    pub queries: Option<QueryNames>,
    pub mutations: Option<MutationNames>,
    pub subscriptions: Option<SubscriptionConfig>,
    pub timestamps: Option<TimestampNames>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryNames {
    pub get: Option<String>,
    pub list: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MutationNames {
    pub create: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionConfig {
    #[serde(default)]
    pub on_create: Option<Vec<String>>,
    #[serde(default)]
    pub on_update: Option<Vec<String>>,
    #[serde(default)]
    pub on_delete: Option<Vec<String>>,
    #[serde(default)]
    pub level: SubscriptionLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionLevel {
    Off,
    /// Subscriptions exist but are not protected by `@auth`.
    Public,
    #[default]
    On,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampNames {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl DirectiveArguments for ModelArguments {
    const NAME: &'static str = "model";

    fn validate(&self) -> Result<(), String> {
        let names = self
            .queries
            .iter()
            .flat_map(|queries| [&queries.get, &queries.list])
            .chain(
                self.mutations
                    .iter()
                    .flat_map(|mutations| [&mutations.create, &mutations.update, &mutations.delete]),
            )
            .flatten();

        for name in names {
            if name.is_empty() {
                return Err("@model operation names must not be empty.".to_owned());
            }
        }

        Ok(())
    }
}

impl ModelArguments {
    /// Operation names derived from the model name, used for every name left out of the directive.
    pub fn defaults_for(model_name: &str) -> Map<String, Value> {
        let Value::Object(defaults) = json!({
            "queries": {
                "get": ModelNames::get_query(model_name),
                "list": ModelNames::list_query(model_name),
            },
            "mutations": {
                "create": ModelNames::create_mutation(model_name),
                "update": ModelNames::update_mutation(model_name),
                "delete": ModelNames::delete_mutation(model_name),
            },
            "subscriptions": {
                "level": "on",
                "onCreate": [ModelNames::on_create_subscription(model_name)],
                "onUpdate": [ModelNames::on_update_subscription(model_name)],
                "onDelete": [ModelNames::on_delete_subscription(model_name)],
            },
            "timestamps": {
                "createdAt": "createdAt",
                "updatedAt": "updatedAt",
            },
        }) else {
            return Map::new();
        };
        defaults
    }

    pub fn get_query(&self) -> Option<&str> {
        self.queries.as_ref().and_then(|queries| queries.get.as_deref())
    }

    pub fn list_query(&self) -> Option<&str> {
        self.queries.as_ref().and_then(|queries| queries.list.as_deref())
    }

    pub fn create_mutation(&self) -> Option<&str> {
        self.mutations.as_ref().and_then(|mutations| mutations.create.as_deref())
    }

    pub fn update_mutation(&self) -> Option<&str> {
        self.mutations.as_ref().and_then(|mutations| mutations.update.as_deref())
    }

    pub fn delete_mutation(&self) -> Option<&str> {
        self.mutations.as_ref().and_then(|mutations| mutations.delete.as_deref())
    }

    pub fn subscription_level(&self) -> SubscriptionLevel {
        self.subscriptions
            .as_ref()
            .map_or(SubscriptionLevel::Off, |subscriptions| subscriptions.level)
    }

    pub fn created_at(&self) -> Option<&str> {
        self.timestamps
            .as_ref()
            .and_then(|timestamps| timestamps.created_at.as_deref())
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.timestamps
            .as_ref()
            .and_then(|timestamps| timestamps.updated_at.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use graphql_transformer_core::{directive::get_arguments_with_defaults, document::SchemaDocument};
    use pretty_assertions::assert_eq;

    use super::*;

    fn arguments(sdl: &str, deep_merge: bool) -> ModelArguments {
        let document = SchemaDocument::parse(sdl).unwrap();
        let definition = document.type_definition("Todo").unwrap();
        get_arguments_with_defaults(
            &definition.node.directives[0],
            ModelArguments::defaults_for("Todo"),
            deep_merge,
        )
        .unwrap()
    }

    #[test]
    fn names_default_to_the_model_name() {
        let arguments = arguments("type Todo @model { id: ID! }", true);

        assert_eq!(arguments.get_query(), Some("getTodo"));
        assert_eq!(arguments.list_query(), Some("listTodos"));
        assert_eq!(arguments.delete_mutation(), Some("deleteTodo"));
        assert_eq!(arguments.subscription_level(), SubscriptionLevel::On);
        assert_eq!(arguments.created_at(), Some("createdAt"));
    }

    #[test]
    fn null_disables_a_section() {
        let arguments = arguments("type Todo @model(queries: null, subscriptions: null) { id: ID! }", true);

        assert_eq!(arguments.get_query(), None);
        assert_eq!(arguments.subscription_level(), SubscriptionLevel::Off);
        assert_eq!(arguments.create_mutation(), Some("createTodo"));
    }

    #[test]
    fn partial_names_keep_the_other_defaults_when_deep_merging() {
        let sdl = r#"type Todo @model(mutations: { create: "addTodo" }, timestamps: { createdAt: "createdOn" }) { id: ID! }"#;

        let deep = arguments(sdl, true);
        assert_eq!(deep.create_mutation(), Some("addTodo"));
        assert_eq!(deep.update_mutation(), Some("updateTodo"));
        assert_eq!(deep.updated_at(), Some("updatedAt"));

        let shallow = arguments(sdl, false);
        assert_eq!(shallow.create_mutation(), Some("addTodo"));
        assert_eq!(shallow.update_mutation(), None);
        assert_eq!(shallow.updated_at(), None);
    }
}
