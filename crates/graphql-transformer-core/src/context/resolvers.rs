use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{MappingTemplate, TransformerError};

/// Extension points around the data-load step of a pipeline resolver, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Slot {
    Init,
    PreAuth,
    Auth,
    PostAuth,
    PreDataLoad,
    PreUpdate,
    PostDataLoad,
    PostUpdate,
    Finish,
}

impl Slot {
    pub fn runs_before_data_load(self) -> bool {
        self <= Slot::PreUpdate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResolverKind {
    /// A single request/response pair against one data source.
    Unit,
    Pipeline,
}

/// One step of a pipeline resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineFunction {
    /// `None` runs against the API's `NONE` data source.
    pub data_source: Option<String>,
    pub request: MappingTemplate,
    pub response: MappingTemplate,
}

impl PipelineFunction {
    pub fn new(
        data_source: Option<String>,
        request: impl Into<MappingTemplate>,
        response: impl Into<MappingTemplate>,
    ) -> Self {
        PipelineFunction {
            data_source,
            request: request.into(),
            response: response.into(),
        }
    }

    /// A step that only touches the context, such as an auth check or setting a default.
    pub fn local(request: impl Into<MappingTemplate>, response: impl Into<MappingTemplate>) -> Self {
        PipelineFunction::new(None, request, response)
    }
}

/// The resolver of one `Type.field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverPipeline {
    type_name: String,
    field_name: String,
    kind: ResolverKind,
    data_load: Vec<PipelineFunction>,
    slots: BTreeMap<Slot, Vec<PipelineFunction>>,
    stack: Option<String>,
}

impl ResolverPipeline {
    pub fn pipeline(type_name: impl Into<String>, field_name: impl Into<String>, data_load: PipelineFunction) -> Self {
        ResolverPipeline {
            type_name: type_name.into(),
            field_name: field_name.into(),
            kind: ResolverKind::Pipeline,
            data_load: vec![data_load],
            slots: BTreeMap::new(),
            stack: None,
        }
    }

    pub fn unit(type_name: impl Into<String>, field_name: impl Into<String>, function: PipelineFunction) -> Self {
        ResolverPipeline {
            kind: ResolverKind::Unit,
            ..ResolverPipeline::pipeline(type_name, field_name, function)
        }
    }

    /// Place the resolver in a named stack rather than the root one.
    #[must_use]
    pub fn in_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn kind(&self) -> ResolverKind {
        self.kind
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn data_load(&self) -> &[PipelineFunction] {
        &self.data_load
    }

    pub fn slot(&self, slot: Slot) -> &[PipelineFunction] {
        self.slots.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn slots(&self) -> impl Iterator<Item = (Slot, &[PipelineFunction])> {
        self.slots.iter().map(|(slot, functions)| (*slot, functions.as_slice()))
    }

    /// The data source of the first data-load step.
    pub fn data_source(&self) -> Option<&str> {
        self.data_load.first().and_then(|function| function.data_source.as_deref())
    }

    pub fn add_to_slot(&mut self, slot: Slot, function: PipelineFunction) -> Result<(), TransformerError> {
        if self.kind == ResolverKind::Unit {
            return Err(TransformerError::resource_conflict(format!(
                "Cannot add a {slot} function to the unit resolver of {}.{}.",
                self.type_name, self.field_name
            )));
        }
        self.slots.entry(slot).or_default().push(function);
        Ok(())
    }

    /// Every step in execution order, each with the file stem of its templates: `Type.field` for
    /// the main data-load step and `Type.field.<slot>.<n>` for slot functions.
    pub fn functions(&self) -> Vec<(String, &PipelineFunction)> {
        let prefix = format!("{}.{}", self.type_name, self.field_name);

        let data_load = self.data_load.iter().enumerate().map(|(index, function)| {
            let stem = match index {
                0 => prefix.clone(),
                n => format!("{prefix}.dataLoad.{}", n + 1),
            };
            (stem, function)
        });

        self.slot_functions(&prefix, true)
            .into_iter()
            .chain(data_load)
            .chain(self.slot_functions(&prefix, false))
            .collect()
    }

    fn slot_functions(&self, prefix: &str, before_data_load: bool) -> Vec<(String, &PipelineFunction)> {
        let mut functions = Vec::new();
        for (slot, slot_functions) in &self.slots {
            if slot.runs_before_data_load() != before_data_load {
                continue;
            }
            for (index, function) in slot_functions.iter().enumerate() {
                functions.push((format!("{prefix}.{slot}.{}", index + 1), function));
            }
        }
        functions
    }

    /// Output file names of every template with its content, in execution order.
    pub fn templates(&self) -> Vec<(String, &MappingTemplate)> {
        self.functions()
            .into_iter()
            .flat_map(|(stem, function)| {
                [
                    (format!("{stem}.req.vtl"), &function.request),
                    (format!("{stem}.res.vtl"), &function.response),
                ]
            })
            .collect()
    }

    fn merge(&mut self, other: ResolverPipeline) {
        self.data_load.extend(other.data_load);
        for (slot, functions) in other.slots {
            self.slots.entry(slot).or_default().extend(functions);
        }
    }
}

/// Resolvers keyed by `Type.field`.
#[derive(Debug, Default)]
pub struct ResolverManager {
    resolvers: IndexMap<String, ResolverPipeline>,
}

impl ResolverManager {
    /// Register a resolver. If the field already has a pipeline resolver the new steps are appended
    /// to it. A field that already has a unit resolver cannot take another one.
    pub fn add_resolver(&mut self, resolver: ResolverPipeline) -> Result<(), TransformerError> {
        let key = resolver_key(&resolver.type_name, &resolver.field_name);

        match self.resolvers.get_mut(&key) {
            None => {
                self.resolvers.insert(key, resolver);
                Ok(())
            }
            Some(existing) if existing.kind == ResolverKind::Pipeline && resolver.kind == ResolverKind::Pipeline => {
                existing.merge(resolver);
                Ok(())
            }
            Some(_) => Err(TransformerError::resource_conflict(format!(
                "A resolver for {key} already exists."
            ))),
        }
    }

    pub fn has_resolver(&self, type_name: &str, field_name: &str) -> bool {
        self.resolvers.contains_key(&resolver_key(type_name, field_name))
    }

    pub fn get_resolver(&self, type_name: &str, field_name: &str) -> Option<&ResolverPipeline> {
        self.resolvers.get(&resolver_key(type_name, field_name))
    }

    pub fn get_resolver_mut(&mut self, type_name: &str, field_name: &str) -> Option<&mut ResolverPipeline> {
        self.resolvers.get_mut(&resolver_key(type_name, field_name))
    }

    /// Add a slot function to an existing resolver.
    pub fn add_to_slot(
        &mut self,
        type_name: &str,
        field_name: &str,
        slot: Slot,
        function: PipelineFunction,
    ) -> Result<(), TransformerError> {
        self.get_resolver_mut(type_name, field_name)
            .ok_or_else(|| {
                TransformerError::schema_validation(format!("No resolver exists for {type_name}.{field_name}."))
            })?
            .add_to_slot(slot, function)
    }

    pub fn resolvers(&self) -> impl Iterator<Item = &ResolverPipeline> {
        self.resolvers.values()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

fn resolver_key(type_name: &str, field_name: &str) -> String {
    format!("{type_name}.{field_name}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn invoke(data_source: &str) -> PipelineFunction {
        PipelineFunction::new(Some(data_source.to_owned()), "$util.toJson($ctx.args)", "$util.toJson($ctx.result)")
    }

    #[test]
    fn pipeline_resolvers_append_functions() {
        let mut resolvers = ResolverManager::default();
        resolvers
            .add_resolver(ResolverPipeline::pipeline("Query", "echo", invoke("EchoLambdaDataSource")))
            .unwrap();
        resolvers
            .add_resolver(ResolverPipeline::pipeline("Query", "echo", invoke("AuditLambdaDataSource")))
            .unwrap();

        let resolver = resolvers.get_resolver("Query", "echo").unwrap();
        assert_eq!(resolvers.len(), 1);
        assert_eq!(resolver.data_load().len(), 2);
        assert_eq!(resolver.data_source(), Some("EchoLambdaDataSource"));
    }

    #[test]
    fn unit_resolvers_do_not_accept_more_functions() {
        let mut resolvers = ResolverManager::default();
        resolvers
            .add_resolver(ResolverPipeline::unit("Query", "echo", invoke("EchoLambdaDataSource")))
            .unwrap();

        let error = resolvers
            .add_resolver(ResolverPipeline::pipeline("Query", "echo", invoke("EchoLambdaDataSource")))
            .unwrap_err();

        assert_eq!(error.to_string(), "A resolver for Query.echo already exists.");
    }

    #[test]
    fn slot_functions_run_around_the_data_load() {
        let mut resolver = ResolverPipeline::pipeline("Mutation", "createTodo", invoke("TodoTable"));
        resolver
            .add_to_slot(Slot::PostDataLoad, PipelineFunction::local("post", "post"))
            .unwrap();
        resolver
            .add_to_slot(Slot::Auth, PipelineFunction::local("auth", "auth"))
            .unwrap();
        resolver
            .add_to_slot(Slot::Init, PipelineFunction::local("init", "init"))
            .unwrap();

        let order: Vec<_> = resolver
            .functions()
            .into_iter()
            .map(|(_, function)| function.request.as_str())
            .collect();
        assert_eq!(order, ["init", "auth", "$util.toJson($ctx.args)", "post"]);

        let keys: Vec<_> = resolver.templates().into_iter().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            [
                "Mutation.createTodo.init.1.req.vtl",
                "Mutation.createTodo.init.1.res.vtl",
                "Mutation.createTodo.auth.1.req.vtl",
                "Mutation.createTodo.auth.1.res.vtl",
                "Mutation.createTodo.req.vtl",
                "Mutation.createTodo.res.vtl",
                "Mutation.createTodo.postDataLoad.1.req.vtl",
                "Mutation.createTodo.postDataLoad.1.res.vtl",
            ]
        );
    }
}
