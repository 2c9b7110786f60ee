use crate::model::NodeId;

use super::{extension_chain, Resolver, MAX_EXTENSION_DEPTH};

impl Resolver<'_> {
    /// Mixed content has to agree along an extension chain.
    ///
    /// Detection runs over every chain before anything is changed: a chain is
    /// inconsistent when one of its nodes explicitly says `mixed="false"` while
    /// another one is mixed. The derived node of such a chain gets
    /// `mixed_extension_error`. The remaining chains are then equalized until
    /// nothing changes, so a single mixed link makes every chain through it
    /// mixed. A chain that only turns mixed through equalization and holds an
    /// explicit `mixed="false"` is flagged the same way.
    pub(super) fn check_mixed_chains(&mut self) {
        let mut chains = Vec::new();
        for id in self.declarations() {
            if self.model.node(id).base.is_none() {
                continue;
            }
            match extension_chain(self.model, id) {
                Ok(chain) => chains.push(chain),
                Err(_) => {
                    let name = self.model.node(id).name.clone();
                    self.diagnostics.error(
                        name,
                        format!(
                            "extension chain is cyclic or longer than {MAX_EXTENSION_DEPTH}; treated as not mixed"
                        ),
                    );
                }
            }
        }

        let mut open = Vec::new();
        for chain in chains {
            if !self.flag_conflict(&chain) {
                open.push(chain);
            }
        }

        // every round turns at least one node mixed, so this ends
        loop {
            let mut changed = false;
            let mut still_open = Vec::with_capacity(open.len());
            for chain in open {
                if !chain.iter().any(|id| self.model.node(*id).mixed) {
                    still_open.push(chain);
                    continue;
                }
                if self.flag_conflict(&chain) {
                    continue;
                }
                for &id in &chain {
                    let node = self.model.node_mut(id);
                    changed |= !node.mixed;
                    node.mixed = true;
                }
                still_open.push(chain);
            }
            open = still_open;
            if !changed {
                break;
            }
        }
    }

    /// Flags `chain[0]` when the chain is mixed somewhere but a link declares
    /// `mixed="false"`.
    fn flag_conflict(&mut self, chain: &[NodeId]) -> bool {
        if !chain.iter().any(|id| self.model.node(*id).mixed) {
            return false;
        }
        let Some(unmixed) = chain
            .iter()
            .find(|id| self.model.node(**id).mixed_declared == Some(false))
        else {
            return false;
        };
        let unmixed = self.model.node(*unmixed).name.clone();
        let node = self.model.node_mut(chain[0]);
        node.mixed_extension_error = true;
        let name = node.name.clone();
        self.diagnostics.error(
            name,
            format!("mixed content conflicts with mixed=\"false\" on {unmixed:?} in its extension chain"),
        );
        true
    }
}
