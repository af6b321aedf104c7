//! Directive driven GraphQL schema transformation.
//!
//! A [`GraphQLTransform`] parses an annotated SDL document and hands every directive application to
//! the [`TransformerPlugin`] that declares it. Plugins share one [`TransformerContext`] through a
//! fixed sequence of phases and together produce the [`DeploymentResources`] of an AppSync API.

#![cfg_attr(test, allow(unused_crate_dependencies))]

pub mod access_control;
pub mod context;
pub mod directive;
pub mod document;
mod error;
pub mod log;
mod mapping_template;
pub mod output;
pub mod parameters;
mod plugin;
pub mod strategy;
mod transform;

pub use error::{SchemaLocation, TransformerError};
pub use mapping_template::MappingTemplate;
pub use plugin::{HookResult, TransformerPlugin};
pub use transform::{
    is_appsync_directive, GraphQLTransform, TransformOptions, TransformOutcome, API_KEY_LOGICAL_ID,
    GRAPHQL_API_LOGICAL_ID, GRAPHQL_SCHEMA_LOGICAL_ID, NONE_DATA_SOURCE, SQL_UNSUPPORTED_DIRECTIVES,
};
pub use context::TransformerContext;
pub use document::SchemaDocument;
pub use output::DeploymentResources;
