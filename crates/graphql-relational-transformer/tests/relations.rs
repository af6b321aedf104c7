#![allow(unused_crate_dependencies)]

use graphql_index_transformer::{IndexTransformer, PrimaryKeyTransformer};
use graphql_model_transformer::ModelTransformer;
use graphql_relational_transformer::{ManyToManyTransformer, RelationTransformer};
use graphql_transformer_core::{
    context::TransformerContextOptions, log::TransformerLogLevel, parameters::TransformParameters,
    DeploymentResources, GraphQLTransform, TransformOptions, TransformOutcome, TransformerPlugin,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

fn transformers() -> Vec<Box<dyn TransformerPlugin>> {
    vec![
        Box::new(ModelTransformer::new()),
        Box::new(PrimaryKeyTransformer::new()),
        Box::new(IndexTransformer::new()),
        Box::new(RelationTransformer::has_many()),
        Box::new(RelationTransformer::has_one()),
        Box::new(ManyToManyTransformer::new()),
        Box::new(RelationTransformer::belongs_to()),
    ]
}

fn run(schema: &str, context: TransformerContextOptions) -> TransformOutcome {
    GraphQLTransform::new(TransformOptions {
        transformers: transformers(),
        context,
        ..Default::default()
    })
    .unwrap()
    .transform(schema)
}

fn transform(schema: &str) -> DeploymentResources {
    run(schema, TransformerContextOptions::default()).into_result().unwrap()
}

#[test]
fn implicit_has_many_adds_a_foreign_key_and_an_index() {
    let output = transform(indoc! {r"
        type Post @model {
          id: ID!
          title: String
          comments: [Comment] @hasMany
        }

        type Comment @model {
          id: ID!
          content: String
          post: Post @belongsTo
        }
    "});

    assert!(output.schema.contains("  postCommentsId: ID\n"));
    assert!(output.schema.contains(
        "comments(sortDirection: ModelSortDirection, filter: ModelCommentFilterInput, limit: Int, nextToken: String): ModelCommentConnection"
    ));

    let table = &output.stacks["Comment"].resources["CommentTable"];
    assert_eq!(
        table.properties["GlobalSecondaryIndexes"][0]["IndexName"],
        json!("gsi-Post.comments")
    );

    let has_many = &output.resolvers["Post.comments.req.vtl"];
    assert!(has_many.contains("#set( $ListRequest.index = \"gsi-Post.comments\" )"));

    // The belongsTo side reads through the same implicit key.
    let belongs_to = &output.resolvers["Comment.post.req.vtl"];
    assert!(belongs_to.contains("\"operation\": \"GetItem\""));
    assert!(belongs_to.contains("$ctx.source.postCommentsId"));

    let connections = &output.stacks["ConnectionStack"];
    assert!(connections.resources.contains_key("PostCommentsResolver"));
    assert!(connections.resources.contains_key("CommentPostResolver"));
}

#[test]
fn references_query_the_related_model() {
    let output = transform(indoc! {r#"
        type Team @model {
          id: ID!
          members: [Member] @hasMany(references: ["teamId"])
        }

        type Member @model {
          id: ID!
          teamId: ID
          team: Team @belongsTo(references: ["teamId"])
        }
    "#});

    let has_many = &output.resolvers["Team.members.req.vtl"];
    assert!(has_many.contains("#set( $ListRequest.index = \"gsi-Team.members\" )"));
    assert!(has_many.contains("$ctx.source.id"));
    assert!(!output.schema.contains("teamMembersId"));

    let belongs_to = &output.resolvers["Member.team.req.vtl"];
    assert!(belongs_to.contains("\"id\": $util.dynamodb.toDynamoDBJson($ctx.source.teamId)"));
}

#[test]
fn has_one_with_fields_reads_the_primary_key() {
    let output = transform(indoc! {r#"
        type Project @model {
          id: ID!
          teamId: ID
          team: Team @hasOne(fields: ["teamId"])
        }

        type Team @model {
          id: ID!
          name: String
        }
    "#});

    let request = &output.resolvers["Project.team.req.vtl"];
    assert!(request.contains("#if( $util.isNull($ctx.source.teamId) )\n  #return(null)\n#end"));
    assert!(request.contains("\"operation\": \"GetItem\""));
}

#[test]
fn gen1_fields_warn_when_disallowed() {
    let context = TransformerContextOptions {
        parameters: TransformParameters {
            allow_gen1_patterns: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let outcome = run(
        indoc! {r#"
            type Project @model {
              id: ID!
              teamId: ID
              team: Team @hasOne(fields: ["teamId"])
            }

            type Team @model {
              id: ID!
            }
        "#},
        context,
    );

    let warnings: Vec<_> = outcome
        .logs
        .iter()
        .filter(|log| log.level == TransformerLogLevel::Warn)
        .map(|log| log.message.as_str())
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("fields argument on @hasOne is deprecated."));
    assert!(outcome.into_result().is_ok());
}

#[test]
fn many_to_many_generates_a_join_model() {
    let output = transform(indoc! {r#"
        type Post @model {
          id: ID!
          title: String
          tags: [Tag] @manyToMany(relationName: "PostTags")
        }

        type Tag @model {
          id: ID!
          label: String
          posts: [Post] @manyToMany(relationName: "PostTags")
        }
    "#});

    assert!(output.schema.contains("type PostTags {"));
    assert!(output.schema.contains("  postId: ID!\n  tagId: ID!\n  post: Post!\n  tag: Tag!\n"));
    assert!(output.schema.contains("): ModelPostTagsConnection"));

    let table = &output.stacks["PostTags"].resources["PostTagsTable"];
    let index_names: Vec<_> = table.properties["GlobalSecondaryIndexes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|index| index["IndexName"].as_str().unwrap())
        .collect();
    assert_eq!(index_names, ["byPost", "byTag"]);

    assert!(output.resolvers["Post.tags.req.vtl"].contains("#set( $ListRequest.index = \"byPost\" )"));
    assert!(output.resolvers["PostTags.tag.req.vtl"].contains("\"operation\": \"GetItem\""));
}

#[test]
fn many_to_many_needs_two_sides() {
    let error = run(
        indoc! {r#"
            type Post @model {
              id: ID!
              tags: [Tag] @manyToMany(relationName: "PostTags")
            }

            type Tag @model {
              id: ID!
            }
        "#},
        TransformerContextOptions::default(),
    )
    .into_result()
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "@manyToMany relation 'PostTags' must be used in exactly two locations."
    );
}

#[test]
fn has_many_requires_a_list() {
    let error = transform_error(indoc! {r"
        type Post @model {
          id: ID!
          comment: Comment @hasMany
        }

        type Comment @model {
          id: ID!
        }
    "});

    assert_eq!(error, "@hasMany must be used with a list. Use @hasOne for non-list types.");
}

#[test]
fn related_type_must_be_a_model() {
    let error = transform_error(indoc! {r"
        type Post @model {
          id: ID!
          author: Author @hasOne
        }

        type Author {
          name: String
        }
    "});

    assert_eq!(error, "Object type Author must be annotated with @model.");
}

fn transform_error(schema: &str) -> String {
    run(schema, TransformerContextOptions::default())
        .into_result()
        .unwrap_err()
        .to_string()
}
