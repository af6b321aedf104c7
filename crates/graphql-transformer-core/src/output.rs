use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::{access_control::AccessControlSummary, context::Resource};

/// A CloudFormation shaped stack template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Value>,
    pub resources: IndexMap<String, Resource>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Value>,
}

/// Everything a successful transform produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResources {
    /// The output schema with transformer directives removed.
    pub schema: String,
    pub root_stack: Template,
    pub stacks: IndexMap<String, Template>,
    /// Mapping templates keyed by file name, for example `Query.getTodo.req.vtl`.
    pub resolvers: IndexMap<String, String>,
    pub functions: IndexMap<String, String>,
    pub stack_mapping: IndexMap<String, String>,
    /// Access control matrix of every model with `@auth`, for inspection.
    pub access_control: IndexMap<String, AccessControlSummary>,
}
