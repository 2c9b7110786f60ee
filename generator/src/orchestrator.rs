//! Drives an [`Emitter`] over a resolved schema.
//!
//! Every node that is explicitly defined and complex is generated exactly
//! once, and never before the type it extends. Nodes whose base is not ready
//! yet wait in a postponement queue that is drained after the top-level walk;
//! inline complex types found while generating their parent wait in a second
//! queue that is drained the same way afterwards.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use xsdgen_front::{
    Diagnostics, NodeId, Primitive, ResolvedType, SchemaModel, SchemaNode, SimpleTypeDef,
};

use crate::config::Config;
use crate::emitter::{Emitter, Field, FieldKind, FieldType};

/// Passes over the postponement queue before giving up on the rest.
pub const MAX_DRAIN_CYCLES: usize = 1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeState {
    Unvisited,
    Ready,
    Emitted,
    Rejected,
}

/// Outcome of one generation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Clean names of the generated types, in generation order.
    pub emitted: Vec<String>,
    pub rejected: Vec<String>,
    /// `(type, base)` pairs whose base never became available.
    pub unresolved: Vec<(String, String)>,
    /// Passes made over the postponement queue.
    pub cycles: usize,
    pub diagnostics: Diagnostics,
}

struct Orchestrator<'a> {
    model: &'a SchemaModel,
    config: &'a Config,
    states: HashMap<NodeId, NodeState>,
    /// Emittable top-level declarations by name; a later one replaces an
    /// earlier one of the same name.
    types_by_name: HashMap<&'a str, NodeId>,
    already_emitted: HashSet<String>,
    postponed: Vec<NodeId>,
    pending_anonymous: Vec<NodeId>,
    queued_anonymous: HashSet<NodeId>,
    report: GenerationReport,
}

/// Generates every emittable type of `model` through `emitter`.
///
/// Never fails: rejected types and types with an unavailable base are left
/// out and reported in the returned diagnostics.
pub fn generate<E>(model: &SchemaModel, config: &Config, emitter: &mut E) -> GenerationReport
where
    E: Emitter + ?Sized,
{
    let mut orchestrator = Orchestrator {
        model,
        config,
        states: HashMap::new(),
        types_by_name: model
            .top_level()
            .iter()
            .map(|&id| (id, model.node(id)))
            .filter(|(_, node)| node.is_emittable())
            .map(|(id, node)| (node.name.as_str(), id))
            .collect(),
        already_emitted: HashSet::new(),
        postponed: Vec::new(),
        pending_anonymous: Vec::new(),
        queued_anonymous: HashSet::new(),
        report: GenerationReport::default(),
    };
    orchestrator.run(emitter);
    orchestrator.report
}

impl Orchestrator<'_> {
    fn run<E: Emitter + ?Sized>(&mut self, emitter: &mut E) {
        let model = self.model;
        for &id in model.top_level() {
            let node = model.node(id);
            if !node.is_emittable() {
                continue;
            }
            if self.types_by_name.get(node.name.as_str()) != Some(&id) {
                debug!(node = %node.name, "skipping shadowed declaration");
                continue;
            }
            self.visit(id, emitter);
        }
        self.drain_postponed(emitter);

        while !self.pending_anonymous.is_empty() {
            let batch = std::mem::take(&mut self.pending_anonymous);
            for id in batch {
                self.visit(id, emitter);
            }
            self.drain_postponed(emitter);
        }

        self.report_unresolved();
        debug!(
            emitted = self.report.emitted.len(),
            rejected = self.report.rejected.len(),
            unresolved = self.report.unresolved.len(),
            cycles = self.report.cycles,
            "generation done"
        );
    }

    fn state(&self, id: NodeId) -> NodeState {
        self.states.get(&id).copied().unwrap_or(NodeState::Unvisited)
    }

    /// The generated type `id` derives from: its extension base, else its
    /// restriction base, if that names a type that gets generated.
    ///
    /// A top-level element typed by a complex type usually shares its name
    /// and wins the registry entry, so the emittable declaration is looked up
    /// when the registered node is not one.
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.model.node(id);
        [node.base.as_deref(), node.restriction_base.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(|name| {
                self.model
                    .tables
                    .element(name)
                    .filter(|parent| self.model.node(*parent).is_emittable())
                    .or_else(|| self.types_by_name.get(name).copied())
            })
            .next()
    }

    fn visit<E: Emitter + ?Sized>(&mut self, id: NodeId, emitter: &mut E) {
        if matches!(self.state(id), NodeState::Emitted | NodeState::Rejected) {
            return;
        }
        let model = self.model;
        let node = model.node(id);
        if self.already_emitted.contains(&node.clean_name) {
            debug!(node = %node.name, "a type of this name was already generated");
            self.states.insert(id, NodeState::Emitted);
            return;
        }

        let parent = self.parent(id);
        if let Some(parent) = parent {
            match self.state(parent) {
                NodeState::Emitted => {}
                NodeState::Rejected => {
                    let base = &model.node(parent).name;
                    self.reject(id, format!("not generated: base {base:?} was rejected"));
                    return;
                }
                NodeState::Unvisited | NodeState::Ready => {
                    if !self.postponed.contains(&id) {
                        debug!(node = %node.name, base = %model.node(parent).name, "postponed");
                        self.postponed.push(id);
                    }
                    return;
                }
            }
        }

        self.states.insert(id, NodeState::Ready);
        if node.mixed_extension_error {
            self.reject(
                id,
                "not generated: mixed content is inconsistent along its extension chain".to_owned(),
            );
        } else {
            self.emit(id, parent, emitter);
        }
    }

    fn reject(&mut self, id: NodeId, message: String) {
        let model = self.model;
        let node = model.node(id);
        self.states.insert(id, NodeState::Rejected);
        self.report.rejected.push(node.clean_name.clone());
        self.report.diagnostics.error(&node.name, message);
    }

    /// Re-scans the postponement queue, most recent entry first, until a
    /// pass generates nothing.
    fn drain_postponed<E: Emitter + ?Sized>(&mut self, emitter: &mut E) {
        let mut cycles = 0;
        while !self.postponed.is_empty() {
            if cycles == MAX_DRAIN_CYCLES {
                self.report.diagnostics.error(
                    "",
                    format!("postponement queue did not settle after {MAX_DRAIN_CYCLES} passes"),
                );
                break;
            }
            cycles += 1;
            self.report.cycles += 1;

            let queue = std::mem::take(&mut self.postponed);
            let waiting = queue.len();
            for id in queue.into_iter().rev() {
                self.visit(id, emitter);
            }
            self.postponed.reverse();
            debug!(
                cycle = self.report.cycles,
                waiting,
                left = self.postponed.len(),
                "drained postponement queue"
            );
            if self.postponed.len() == waiting {
                break;
            }
        }
    }

    fn report_unresolved(&mut self) {
        let model = self.model;
        for id in std::mem::take(&mut self.postponed) {
            let node = model.node(id);
            let base = node
                .base
                .clone()
                .or_else(|| node.restriction_base.clone())
                .unwrap_or_default();
            self.report.diagnostics.error(
                &node.name,
                format!("not generated: base {base:?} never became available"),
            );
            self.report.unresolved.push((node.clean_name.clone(), base));
        }
    }

    fn emit<E: Emitter + ?Sized>(&mut self, id: NodeId, parent: Option<NodeId>, emitter: &mut E) {
        let model = self.model;
        let node = model.node(id);
        let name = node.clean_name.as_str();
        let parent = parent.map(|parent| model.node(parent).clean_name.as_str());
        debug!(node = %node.name, ?parent, "generating");

        emitter.begin_type(parent, name);
        let documentation = node.documentation.trim();
        if !documentation.is_empty() {
            emitter.documentation(documentation);
        }
        let mut validated = HashSet::new();
        for field in self.fields(node) {
            emitter.field(&field);
            if let Some(restriction) = self.restriction(&field) {
                if validated.insert(restriction.name.clone()) {
                    emitter.validator(&restriction);
                }
            }
        }
        emitter.comparators();
        emitter.serialize_hooks();
        emitter.deserialize_hooks();
        for method in self.config.methods.iter().filter(|m| m.matches(name)) {
            emitter.user_methods(&method.render(name));
        }
        emitter.end_type();

        self.states.insert(id, NodeState::Emitted);
        self.already_emitted.insert(name.to_owned());
        self.report.emitted.push(name.to_owned());

        for &child in &node.children {
            let inner = model.node(child);
            if inner.is_emittable()
                && !inner.is_top_level
                && self.state(child) == NodeState::Unvisited
                && self.queued_anonymous.insert(child)
            {
                self.pending_anonymous.push(child);
            }
        }
    }

    fn field(&self, name: &str, kind: FieldKind, type_: FieldType) -> Field {
        Field {
            name: name.to_owned(),
            accessor: self.config.accessor_style.accessor(name),
            kind,
            type_,
            repeated: false,
            optional: true,
            default: None,
            documentation: None,
            simple_type: None,
            facets: Default::default(),
        }
    }

    fn field_type(&self, resolved: Option<&ResolvedType>) -> FieldType {
        match resolved {
            Some(ResolvedType::Primitive(primitive)) => FieldType::Primitive(*primitive),
            Some(ResolvedType::Named(name)) => match self.model.element(name) {
                Some((_, node)) => FieldType::Complex(node.clean_name.clone()),
                None => FieldType::Complex(name.clone()),
            },
            Some(ResolvedType::Any) => FieldType::Any,
            None => FieldType::Primitive(Primitive::String),
        }
    }

    /// Child elements, then attributes, then the synthetic members.
    fn fields(&self, node: &SchemaNode) -> Vec<Field> {
        let mut fields = Vec::new();
        let mut wildcard = false;
        for &child in &node.children {
            let child = self.model.node(child);
            if child.is_wildcard() {
                if !wildcard {
                    wildcard = true;
                    let mut field = self.field("anytypeobjs_", FieldKind::Wildcard, FieldType::Any);
                    field.repeated = child.is_repeated();
                    field.optional = child.is_optional();
                    fields.push(field);
                }
                continue;
            }
            let type_ = self.field_type(child.resolved_type.as_ref());
            let mut field = self.field(&child.clean_name, FieldKind::Element, type_);
            field.repeated = child.is_repeated();
            field.optional = child.is_optional();
            field.default = child.default.clone();
            let documentation = child.documentation.trim();
            if !documentation.is_empty() {
                field.documentation = Some(documentation.to_owned());
            }
            field.simple_type = child.simple_type_name.clone();
            field.facets = child.facets.clone();
            fields.push(field);
        }

        for attribute in node.attribute_defs.values() {
            let primitive = attribute.resolved_type.unwrap_or(Primitive::String);
            let mut field = self.field(
                &attribute.clean_name,
                FieldKind::Attribute,
                FieldType::Primitive(primitive),
            );
            field.optional = attribute.use_ != xsdgen_front::AttributeUse::Required;
            field.default = attribute.default.clone();
            field.simple_type = attribute.simple_type_name.clone();
            field.facets = attribute.facets.clone();
            fields.push(field);
        }

        if node.has_simple_content || node.mixed {
            let primitive = node
                .simple_bases
                .first()
                .and_then(|base| self.model.builtins.primitive(base))
                .filter(|_| !node.mixed)
                .unwrap_or(Primitive::String);
            fields.push(self.field("valueOf_", FieldKind::Value, FieldType::Primitive(primitive)));
        }
        if node.any_attribute {
            let mut field = self.field(
                "anyAttributes_",
                FieldKind::AnyAttributes,
                FieldType::Primitive(Primitive::String),
            );
            field.repeated = true;
            fields.push(field);
        }
        if node.is_extended {
            fields.push(self.field(
                "extensiontype_",
                FieldKind::ExtensionType,
                FieldType::Primitive(Primitive::String),
            ));
        }
        fields
    }

    /// The restricted simple type behind a field's value, if it has one.
    fn restriction(&self, field: &Field) -> Option<SimpleTypeDef> {
        if let Some(def) = field
            .simple_type
            .as_deref()
            .and_then(|name| self.model.tables.simple_type(name))
            .filter(|def| def.facets.is_restricted())
        {
            return Some(def.clone());
        }
        if field.facets.is_restricted() {
            let name = field.simple_type.clone().unwrap_or_else(|| field.name.clone());
            let mut def = SimpleTypeDef::new(name);
            def.facets = field.facets.clone();
            return Some(def);
        }
        None
    }
}
