use std::fmt;

use serde::Serialize;

/// The request or response half of one resolver step. The engine never looks inside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingTemplate(String);

impl MappingTemplate {
    pub fn inline(template: impl Into<String>) -> Self {
        MappingTemplate(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for MappingTemplate {
    fn from(template: String) -> Self {
        MappingTemplate(template)
    }
}

impl From<&str> for MappingTemplate {
    fn from(template: &str) -> Self {
        MappingTemplate(template.to_owned())
    }
}

impl fmt::Display for MappingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
