use std::collections::{HashMap, HashSet};

use crate::builtins::BuiltinTypes;
use crate::model::{AttributeGroupDef, NodeId, NodeKind, SchemaNode, SimpleTypeDef};
use crate::names::cleanup_name;

/// Name-keyed registries shared by the builder and the resolver.
#[derive(Clone, Debug, Default)]
pub struct SymbolTables {
    pub elements_by_name: HashMap<String, NodeId>,
    pub simple_types_by_name: HashMap<String, SimpleTypeDef>,
    pub attribute_groups: HashMap<String, AttributeGroupDef>,
    /// Group definitions; the group node's children are the group content.
    pub element_groups: HashMap<String, NodeId>,
    /// Head element name to member element names, in declaration order.
    pub substitution_groups: HashMap<String, Vec<String>>,
    /// Names of simple types declared directly under the schema root.
    pub top_level_simple_types: Vec<String>,
}

impl SymbolTables {
    /// Registers `id` under `name`, returning the entry it displaced.
    pub fn register_element(&mut self, name: &str, id: NodeId) -> Option<NodeId> {
        self.elements_by_name.insert(name.to_owned(), id)
    }

    pub fn element(&self, name: &str) -> Option<NodeId> {
        self.elements_by_name.get(name).copied()
    }

    /// Simple types are keyed by their cleaned name; raw names are accepted too.
    pub fn simple_type(&self, name: &str) -> Option<&SimpleTypeDef> {
        self.simple_types_by_name
            .get(name)
            .or_else(|| self.simple_types_by_name.get(&cleanup_name(name)))
    }

    pub fn register_simple_type(&mut self, def: SimpleTypeDef) {
        self.simple_types_by_name.insert(def.name.clone(), def);
    }

    pub fn add_substitution(&mut self, head: &str, member: &str) {
        self.substitution_groups
            .entry(head.to_owned())
            .or_default()
            .push(member.to_owned());
    }

    pub fn substitutes_for(&self, head: &str) -> &[String] {
        self.substitution_groups
            .get(head)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The node arena plus its registries; one per pipeline run.
#[derive(Clone, Debug)]
pub struct SchemaModel {
    nodes: Vec<SchemaNode>,
    root: NodeId,
    pub tables: SymbolTables,
    pub builtins: BuiltinTypes,
    pub target_namespace: Option<String>,
}

impl SchemaModel {
    pub fn new(builtins: BuiltinTypes) -> Self {
        Self {
            nodes: vec![SchemaNode::new(NodeKind::Schema, "schema")],
            root: NodeId::from_index(0),
            tables: SymbolTables::default(),
            builtins,
            target_namespace: None,
        }
    }

    pub(crate) fn alloc(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// The declarations directly under the schema root, in document order.
    pub fn top_level(&self) -> &[NodeId] {
        &self.node(self.root).children
    }

    /// Looks a name up in `elements_by_name`.
    pub fn element(&self, name: &str) -> Option<(NodeId, &SchemaNode)> {
        self.tables.element(name).map(|id| (id, self.node(id)))
    }

    /// Every node reachable from the root, each exactly once, parents before
    /// children and siblings in document order.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root)
    }

    pub fn preorder_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(model: &mut SchemaModel, parent: NodeId, name: &str) -> NodeId {
        let id = model.alloc(SchemaNode::new(NodeKind::Element, name));
        model.node_mut(parent).children.push(id);
        id
    }

    #[test]
    fn preorder_visits_shared_nodes_once() {
        let mut model = SchemaModel::new(BuiltinTypes::default());
        let root = model.root();
        let a = element(&mut model, root, "a");
        let b = element(&mut model, root, "b");
        let shared = element(&mut model, a, "shared");
        model.node_mut(b).children.push(shared);
        // a cycle through splicing must not loop
        model.node_mut(shared).children.push(a);

        let names: Vec<_> = model
            .preorder()
            .into_iter()
            .map(|id| model.node(id).name.clone())
            .collect();
        assert_eq!(names, vec!["schema", "a", "shared", "b"]);
    }

    #[test]
    fn later_registration_displaces_earlier() {
        let mut model = SchemaModel::new(BuiltinTypes::default());
        let root = model.root();
        let first = element(&mut model, root, "dup");
        let second = element(&mut model, root, "dup");
        assert_eq!(model.tables.register_element("dup", first), None);
        assert_eq!(model.tables.register_element("dup", second), Some(first));
        assert_eq!(model.element("dup").map(|(id, _)| id), Some(second));
    }

    #[test]
    fn substitution_groups_accumulate() {
        let mut tables = SymbolTables::default();
        tables.add_substitution("shape", "circle");
        tables.add_substitution("shape", "square");
        assert_eq!(tables.substitutes_for("shape"), ["circle", "square"]);
        assert!(tables.substitutes_for("other").is_empty());
    }
}
