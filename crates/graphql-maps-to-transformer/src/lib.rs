//! Renaming between the GraphQL schema and the data store.
//!
//! `@mapsTo` keeps a renamed DynamoDB model on the table of its previous name. `@refersTo` does the
//! same for SQL tables and columns. Both register their mappings while pre-mutating the schema so that
//! every later phase resolves backing names through the context.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod field_mapping;
mod maps_to;
mod refers_to;

pub use field_mapping::attach_field_mapping_slots;
pub use maps_to::MapsToTransformer;
pub use refers_to::RefersToTransformer;
