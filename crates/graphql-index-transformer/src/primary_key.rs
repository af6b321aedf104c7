use async_graphql_parser::{types as parser, Positioned};
use graphql_transformer_core::{
    context::KeyDefinition,
    directive::{get_arguments, DirectiveArguments},
    document::ast,
    HookResult, TransformerContext, TransformerError, TransformerPlugin,
};
use serde::Deserialize;

const PRIMARY_KEY_DIRECTIVE_DEFINITION: &str = r"
directive @primaryKey(sortKeyFields: [String]) on FIELD_DEFINITION
";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrimaryKeyArguments {
    #[serde(default)]
    sort_key_fields: Vec<String>,
}

impl DirectiveArguments for PrimaryKeyArguments {
    const NAME: &'static str = "primaryKey";
}

#[derive(Debug, Default)]
pub struct PrimaryKeyTransformer {
    keys: Vec<(String, KeyDefinition)>,
}

impl PrimaryKeyTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformerPlugin for PrimaryKeyTransformer {
    fn name(&self) -> &str {
        "PrimaryKeyTransformer"
    }

    fn directive_definitions(&self) -> &str {
        PRIMARY_KEY_DIRECTIVE_DEFINITION
    }

    fn field(
        &mut self,
        parent: &Positioned<parser::TypeDefinition>,
        field: &Positioned<parser::FieldDefinition>,
        directive: &Positioned<parser::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let arguments: PrimaryKeyArguments =
            get_arguments(directive, ctx.parameters().should_deep_merge_directive_config_defaults)?;
        let model_name = parent.node.name.node.as_str();

        super::validate_key_fields(&ctx.input_document(), parent, field, directive, &arguments.sort_key_fields)?;

        let mut key_fields = std::iter::once(&field.node).chain(
            arguments
                .sort_key_fields
                .iter()
                .filter_map(|name| ast::find_field(&parent.node, name).map(|field| &field.node)),
        );
        if key_fields.any(|key_field| !ast::is_non_null_type(&key_field.ty.node)) {
            return Err(TransformerError::invalid_directive_at(
                format!("The primary key on type '{model_name}' must reference non-null fields."),
                directive.pos,
            ));
        }

        if self.keys.iter().any(|(existing, _)| existing == model_name) {
            return Err(TransformerError::invalid_directive_at(
                format!("You may only supply one primary key on type '{model_name}'."),
                directive.pos,
            ));
        }

        self.keys.push((
            model_name.to_owned(),
            KeyDefinition::new(field.node.name.node.as_str(), arguments.sort_key_fields),
        ));
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut TransformerContext) -> HookResult {
        for (model_name, key) in &self.keys {
            tracing::debug!(model = %model_name, partition_key = %key.partition_key, "registered primary key");
            ctx.keys_mut().set_primary_key(model_name, key.clone())?;
        }
        Ok(())
    }
}
