use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{Resolver, MAX_GROUP_DEPTH};
use crate::model::{AttributeDef, NodeId, NodeKind};

/// Memoized expansion of element groups, keyed by group name.
#[derive(Default)]
struct GroupExpansion {
    expanded: HashMap<String, Vec<NodeId>>,
    reported: HashSet<String>,
}

impl Resolver<'_> {
    pub(super) fn flatten_groups(&mut self) {
        let mut expansion = GroupExpansion::default();

        let mut group_names: Vec<_> = self.model.tables.element_groups.keys().cloned().collect();
        group_names.sort();
        for name in &group_names {
            self.expand_group(&mut expansion, name, &mut Vec::new());
        }

        // Walk from the root, splicing as we go so that content pulled in from
        // a group is itself expanded.
        let mut seen = HashSet::new();
        let mut stack = vec![self.model.root()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let children = self.model.node(id).children.clone();
            if children.iter().any(|c| self.model.node(*c).kind == NodeKind::GroupRef) {
                let spliced = self.expand_children(&mut expansion, &children, &mut Vec::new());
                self.model.node_mut(id).children = spliced;
            }
            stack.extend(self.model.node(id).children.iter().rev().copied());
        }

        self.expand_attribute_groups();
    }

    fn expand_group(
        &mut self,
        expansion: &mut GroupExpansion,
        name: &str,
        path: &mut Vec<String>,
    ) -> Option<Vec<NodeId>> {
        if let Some(children) = expansion.expanded.get(name) {
            return Some(children.clone());
        }
        if path.iter().any(|p| p == name) {
            let mut cycle: Vec<_> = path
                .iter()
                .skip_while(|p| *p != name)
                .cloned()
                .collect();
            cycle.sort();
            if expansion.reported.insert(cycle.join(" ")) {
                self.diagnostics.warning(
                    name,
                    format!(
                        "circular group reference ({} -> {name}); reference left unexpanded",
                        path.join(" -> ")
                    ),
                );
            }
            return None;
        }
        if path.len() >= MAX_GROUP_DEPTH {
            self.diagnostics.warning(
                name,
                format!("group references nest deeper than {MAX_GROUP_DEPTH}; reference left unexpanded"),
            );
            return None;
        }
        let Some(group) = self.model.tables.element_groups.get(name).copied() else {
            if expansion.reported.insert(format!("unknown {name}")) {
                self.diagnostics
                    .warning(name, "reference to unknown group; reference left unexpanded");
            }
            return None;
        };

        path.push(name.to_owned());
        let children = self.model.node(group).children.clone();
        let children = self.expand_children(expansion, &children, path);
        path.pop();

        debug!(group = name, particles = children.len(), "expanded group");
        expansion.expanded.insert(name.to_owned(), children.clone());
        Some(children)
    }

    fn expand_children(
        &mut self,
        expansion: &mut GroupExpansion,
        children: &[NodeId],
        path: &mut Vec<String>,
    ) -> Vec<NodeId> {
        let mut result = Vec::with_capacity(children.len());
        for &child in children {
            let node = self.model.node(child);
            match (node.kind, node.group_ref.clone()) {
                (NodeKind::GroupRef, Some(reference)) => {
                    match self.expand_group(expansion, &reference, path) {
                        Some(content) => result.extend(content),
                        None => result.push(child),
                    }
                }
                _ => result.push(child),
            }
        }
        result
    }

    /// Copies the attributes of every referenced attribute group into the
    /// referencing node. Groups may reference other groups.
    fn expand_attribute_groups(&mut self) {
        for id in self.model.preorder() {
            let references = self.model.node(id).attribute_group_refs.clone();
            if references.is_empty() {
                continue;
            }
            let node_name = self.model.node(id).name.clone();
            let mut collected = Vec::new();
            for reference in &references {
                self.collect_attribute_group(&node_name, reference, &mut Vec::new(), &mut collected);
            }
            let attributes = &mut self.model.node_mut(id).attribute_defs;
            for (key, def) in collected {
                attributes.insert(key, def);
            }
        }
    }

    fn collect_attribute_group(
        &mut self,
        node_name: &str,
        name: &str,
        path: &mut Vec<String>,
        out: &mut Vec<(String, AttributeDef)>,
    ) {
        if path.iter().any(|p| p == name) {
            self.diagnostics.warning(
                node_name,
                format!("circular attribute group reference through {name:?}"),
            );
            return;
        }
        let Some(group) = self.model.tables.attribute_groups.get(name) else {
            self.diagnostics
                .warning(node_name, format!("reference to unknown attribute group {name:?}"));
            return;
        };
        out.extend(
            group
                .attributes
                .iter()
                .map(|(key, def)| (key.to_owned(), def.clone())),
        );
        let nested = group.group_refs.clone();
        path.push(name.to_owned());
        for reference in &nested {
            self.collect_attribute_group(node_name, reference, path, out);
        }
        path.pop();
    }
}
