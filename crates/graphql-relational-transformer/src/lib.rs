//! Relationships between models.
//!
//! `@hasOne`, `@hasMany` and `@belongsTo` turn a field whose type is another model into a resolver
//! that reads the related records. `@manyToMany` is sugar: it generates a join model and rewrites
//! both sides into `@hasMany` before the schema is visited.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod arguments;
mod many_to_many;
mod relation;

use graphql_transformer_core::document::ast;

pub use many_to_many::ManyToManyTransformer;
pub use relation::RelationTransformer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
}

/// The field holding an implicit foreign key: `postCommentsId` for `Post.comments`.
pub fn implicit_foreign_key(model_name: &str, field_name: &str) -> String {
    format!("{}{}Id", ast::lower_first(model_name), ast::upper_first(field_name))
}

/// The secondary index created on the related model for an implicit `@hasMany`.
pub fn implicit_index_name(model_name: &str, field_name: &str) -> String {
    format!("gsi-{model_name}.{field_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_names() {
        assert_eq!(implicit_foreign_key("Post", "comments"), "postCommentsId");
        assert_eq!(implicit_index_name("Post", "comments"), "gsi-Post.comments");
        assert_eq!(RelationKind::BelongsTo.to_string(), "belongsTo");
    }
}
