use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::TransformerError;

/// One generated infrastructure artifact, shaped like a CloudFormation resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Resource {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }
}

/// Generated resources keyed by logical id, and the stack each one lands in.
#[derive(Debug, Default)]
pub struct ResourceContext {
    resources: IndexMap<String, Resource>,
    default_stacks: IndexMap<String, String>,
    stack_mapping: IndexMap<String, String>,
}

impl ResourceContext {
    /// Register a resource in the root stack unless it gets mapped elsewhere.
    pub fn set_resource(&mut self, logical_id: impl Into<String>, resource: Resource) -> Result<(), TransformerError> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(TransformerError::resource_conflict(format!(
                "A resource with the logical id {logical_id} already exists."
            )));
        }
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    /// Register a resource whose stack, absent an explicit mapping, is `default_stack`.
    pub fn set_resource_in_stack(
        &mut self,
        logical_id: impl Into<String>,
        resource: Resource,
        default_stack: impl Into<String>,
    ) -> Result<(), TransformerError> {
        let logical_id = logical_id.into();
        self.set_resource(logical_id.clone(), resource)?;
        self.default_stacks.insert(logical_id, default_stack.into());
        Ok(())
    }

    pub fn has_resource(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    pub fn get_resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn get_resource_mut(&mut self, logical_id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(logical_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(logical_id, resource)| (logical_id.as_str(), resource))
    }

    /// Place `logical_id` in `stack_name`. The resource does not need to exist yet.
    pub fn map_resource_to_stack(&mut self, stack_name: impl Into<String>, logical_id: impl Into<String>) {
        self.stack_mapping.insert(logical_id.into(), stack_name.into());
    }

    pub fn stack_mapping(&self) -> &IndexMap<String, String> {
        &self.stack_mapping
    }

    /// The stack `logical_id` belongs to, `None` meaning the root stack.
    ///
    /// An explicit mapping wins over the default the resource was registered with.
    pub fn stack_for(&self, logical_id: &str) -> Option<&str> {
        self.stack_mapping
            .get(logical_id)
            .or_else(|| self.default_stacks.get(logical_id))
            .map(String::as_str)
    }
}
