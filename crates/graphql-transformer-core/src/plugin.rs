use async_graphql_parser::{types as ast, Positioned};

use crate::{context::TransformerContext, document::SchemaDocument, TransformerError};

pub type HookResult = Result<(), TransformerError>;

/// A handler for one or a few directives.
///
/// The engine calls the hooks phase by phase, in the order the plugins were supplied. Every hook
/// defaults to doing nothing.
pub trait TransformerPlugin {
    fn name(&self) -> &str;

    /// SDL declaring the plugin's directives and the input types and enums their arguments use.
    fn directive_definitions(&self) -> &str;

    /// Runs before anything else. Used to pick up per-run configuration from the context.
    fn before(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let _ = ctx;
        Ok(())
    }

    /// Rewrite the parsed schema before it is visited.
    fn pre_mutate_schema(&mut self, document: &mut SchemaDocument, ctx: &mut TransformerContext) -> HookResult {
        let _ = (document, ctx);
        Ok(())
    }

    fn object(
        &mut self,
        definition: &Positioned<ast::TypeDefinition>,
        directive: &Positioned<ast::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let _ = (definition, directive, ctx);
        Ok(())
    }

    fn interface(
        &mut self,
        definition: &Positioned<ast::TypeDefinition>,
        directive: &Positioned<ast::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let _ = (definition, directive, ctx);
        Ok(())
    }

    fn field(
        &mut self,
        parent: &Positioned<ast::TypeDefinition>,
        field: &Positioned<ast::FieldDefinition>,
        directive: &Positioned<ast::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let _ = (parent, field, directive, ctx);
        Ok(())
    }

    fn input_object(
        &mut self,
        definition: &Positioned<ast::TypeDefinition>,
        directive: &Positioned<ast::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let _ = (definition, directive, ctx);
        Ok(())
    }

    fn enum_type(
        &mut self,
        definition: &Positioned<ast::TypeDefinition>,
        directive: &Positioned<ast::ConstDirective>,
        ctx: &mut TransformerContext,
    ) -> HookResult {
        let _ = (definition, directive, ctx);
        Ok(())
    }

    /// Cross-type checks that need the whole visit to have happened.
    fn validate(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let _ = ctx;
        Ok(())
    }

    /// Register metadata other plugins read while transforming the schema.
    fn prepare(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let _ = ctx;
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let _ = ctx;
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let _ = ctx;
        Ok(())
    }

    /// Sees every resolver the other plugins generated.
    fn after(&mut self, ctx: &mut TransformerContext) -> HookResult {
        let _ = ctx;
        Ok(())
    }
}
