//! Semantic passes over a built [`SchemaModel`].
//!
//! Each pass is total over the tree and sees the finished result of the one
//! before it:
//!
//! 1. group flattening (element groups, then attribute groups)
//! 2. symbol registration and name cleanup
//! 3. type resolution
//! 4. mixed-content chain validation
//! 5. attribute/element name disambiguation
//! 6. extension marking
//!
//! Passes never fail. Anything they cannot make sense of is reported through
//! [`Diagnostics`] and replaced by a safe default.

mod duplicates;
mod extension;
mod groups;
mod mixed;
mod registry;
mod types;

use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::model::NodeId;
use crate::names::NameTable;
use crate::SchemaModel;

/// Hops a simple-type alias chain may take before it is assumed to be cyclic.
pub const MAX_ALIAS_HOPS: usize = 10;

/// Links an extension chain may have before it is assumed to be cyclic.
pub const MAX_EXTENSION_DEPTH: usize = 100;

/// Nesting depth of group references inside group definitions.
pub const MAX_GROUP_DEPTH: usize = 64;

struct Resolver<'a> {
    model: &'a mut SchemaModel,
    names: &'a NameTable,
    diagnostics: Diagnostics,
}

/// Runs every pass over `model` in order and returns what they reported.
pub fn resolve(model: &mut SchemaModel, names: &NameTable) -> Diagnostics {
    let mut resolver = Resolver {
        model,
        names,
        diagnostics: Diagnostics::new(),
    };
    resolver.flatten_groups();
    debug!("pass 1 (group flattening) done");
    resolver.register_symbols();
    debug!(
        registered = resolver.model.tables.elements_by_name.len(),
        "pass 2 (symbol registration) done"
    );
    resolver.resolve_types();
    debug!("pass 3 (type resolution) done");
    resolver.check_mixed_chains();
    debug!("pass 4 (mixed-content chains) done");
    resolver.disambiguate_names();
    debug!("pass 5 (name disambiguation) done");
    resolver.mark_extended();
    debug!("pass 6 (extension marking) done");
    resolver.diagnostics
}

impl Resolver<'_> {
    /// Nodes that take part in resolution: everything reachable except the
    /// schema root and unexpanded group references.
    fn declarations(&self) -> Vec<NodeId> {
        use crate::model::NodeKind;
        self.model
            .preorder()
            .into_iter()
            .filter(|id| {
                !matches!(
                    self.model.node(*id).kind,
                    NodeKind::Schema | NodeKind::GroupRef
                )
            })
            .collect()
    }
}

/// The registered node a node's `base` names, if any.
pub fn registered_base(model: &SchemaModel, id: NodeId) -> Option<NodeId> {
    model
        .node(id)
        .base
        .as_deref()
        .and_then(|base| model.tables.element(base))
}

/// `id` followed by the registered nodes along its `base` links.
///
/// Returns `Err` with the partial chain when the chain is longer than
/// [`MAX_EXTENSION_DEPTH`], which only happens for cyclic extensions.
pub fn extension_chain(model: &SchemaModel, id: NodeId) -> Result<Vec<NodeId>, Vec<NodeId>> {
    let mut chain = vec![id];
    let mut current = id;
    while let Some(parent) = registered_base(model, current) {
        if chain.len() > MAX_EXTENSION_DEPTH || chain.contains(&parent) {
            return Err(chain);
        }
        chain.push(parent);
        current = parent;
    }
    Ok(chain)
}
