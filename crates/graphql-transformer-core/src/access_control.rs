//! Per-model grid of which roles may perform which operation on which resource.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::TransformerError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ModelOperation {
    Create,
    Update,
    Delete,
    Get,
    List,
    Sync,
    Listen,
    Search,
}

/// Every operation a model supports. `read` in an `@auth` rule stands for the last five.
pub const MODEL_OPERATIONS: [ModelOperation; 8] = [
    ModelOperation::Create,
    ModelOperation::Update,
    ModelOperation::Delete,
    ModelOperation::Get,
    ModelOperation::List,
    ModelOperation::Sync,
    ModelOperation::Listen,
    ModelOperation::Search,
];

pub const READ_OPERATIONS: [ModelOperation; 5] = [
    ModelOperation::Get,
    ModelOperation::List,
    ModelOperation::Sync,
    ModelOperation::Listen,
    ModelOperation::Search,
];

/// Access is denied unless a role was explicitly granted it with [`AccessControlMatrix::set_role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControlMatrix {
    name: String,
    operations: Vec<ModelOperation>,
    resources: Vec<String>,
    roles: Vec<String>,
    // roles x resources x operations
    matrix: Vec<Vec<Vec<bool>>>,
}

impl AccessControlMatrix {
    pub fn new(name: impl Into<String>, operations: &[ModelOperation], resources: Vec<String>) -> Self {
        AccessControlMatrix {
            name: name.into(),
            operations: operations.to_vec(),
            resources,
            roles: Vec::new(),
            matrix: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grant `operations` to `role`, either on one resource or on every resource when `resource`
    /// is `None`. Grants add up: nothing previously allowed is revoked.
    pub fn set_role(
        &mut self,
        role: &str,
        resource: Option<&str>,
        operations: &[ModelOperation],
    ) -> Result<(), TransformerError> {
        let resource_indexes = match resource {
            Some(resource) => vec![self.resource_index(resource)?],
            None => (0..self.resources.len()).collect(),
        };
        let operation_indexes = operations
            .iter()
            .map(|operation| self.operation_index(*operation))
            .collect::<Result<Vec<_>, _>>()?;

        let role_index = match self.roles.iter().position(|existing| existing == role) {
            Some(index) => index,
            None => {
                self.roles.push(role.to_owned());
                self.matrix
                    .push(vec![vec![false; self.operations.len()]; self.resources.len()]);
                self.roles.len() - 1
            }
        };

        for resource_index in resource_indexes {
            for operation_index in &operation_indexes {
                self.matrix[role_index][resource_index][*operation_index] = true;
            }
        }

        Ok(())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|existing| existing == role)
    }

    pub fn has_resource(&self, resource: &str) -> bool {
        self.resources.iter().any(|existing| existing == resource)
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn is_allowed(&self, role: &str, resource: &str, operation: ModelOperation) -> bool {
        let (Some(role_index), Some(resource_index), Some(operation_index)) = (
            self.roles.iter().position(|existing| existing == role),
            self.resources.iter().position(|existing| existing == resource),
            self.operations.iter().position(|existing| *existing == operation),
        ) else {
            return false;
        };

        self.matrix[role_index][resource_index][operation_index]
    }

    /// Roles allowed to perform `operation` on `resource`, or on at least one resource when
    /// `resource` is `None`.
    pub fn roles_per_operation(&self, operation: ModelOperation, resource: Option<&str>) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|role| match resource {
                Some(resource) => self.is_allowed(role, resource, operation),
                None => self
                    .resources
                    .iter()
                    .any(|resource| self.is_allowed(role, resource, operation)),
            })
            .map(String::as_str)
            .collect()
    }

    /// Whether `role` may perform `operation` on every resource of the model.
    pub fn is_allowed_on_all_resources(&self, role: &str, operation: ModelOperation) -> bool {
        self.resources
            .iter()
            .all(|resource| self.is_allowed(role, resource, operation))
    }

    /// Revoke every grant on `resource` for every role.
    pub fn reset_access_for_resource(&mut self, resource: &str) -> Result<(), TransformerError> {
        let resource_index = self.resource_index(resource)?;
        for role in &mut self.matrix {
            role[resource_index].fill(false);
        }
        Ok(())
    }

    /// The grid as `role -> resource -> allowed operations`, leaving out empty entries.
    pub fn summary(&self) -> AccessControlSummary {
        let roles = self
            .roles
            .iter()
            .map(|role| {
                let resources = self
                    .resources
                    .iter()
                    .filter_map(|resource| {
                        let operations: Vec<_> = self
                            .operations
                            .iter()
                            .copied()
                            .filter(|operation| self.is_allowed(role, resource, *operation))
                            .collect();
                        (!operations.is_empty()).then(|| (resource.clone(), operations))
                    })
                    .collect();
                (role.clone(), resources)
            })
            .collect();

        AccessControlSummary { roles }
    }

    fn resource_index(&self, resource: &str) -> Result<usize, TransformerError> {
        self.resources
            .iter()
            .position(|existing| existing == resource)
            .ok_or_else(|| {
                TransformerError::InvalidAuthRule(format!(
                    "Resource {resource} is not part of the access control matrix of {}.",
                    self.name
                ))
            })
    }

    fn operation_index(&self, operation: ModelOperation) -> Result<usize, TransformerError> {
        self.operations
            .iter()
            .position(|existing| *existing == operation)
            .ok_or_else(|| {
                TransformerError::InvalidAuthRule(format!(
                    "Operation {operation} is not part of the access control matrix of {}.",
                    self.name
                ))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessControlSummary {
    pub roles: IndexMap<String, IndexMap<String, Vec<ModelOperation>>>,
}
