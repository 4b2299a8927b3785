//! Flat-vector fork choice backend, modelled on the upstream `proto_array` crate: nodes live in
//! a single `Vec`, addressed internally by index, with a `HashMap<Hash256, usize>` for root
//! lookups. Parent/child/descendant relationships are stored as indices into the same vector.

use crate::backend::ForkChoiceBackend;
use crate::node::{BlockDescriptor, ValidationStatus};
use crate::Error;
use std::collections::HashMap;
use types::{Epoch, Hash256, Slot};

#[derive(Debug, Clone)]
struct ProtoNode {
    slot: Slot,
    root: Hash256,
    parent: Option<usize>,
    target_root: Hash256,
    state_root: Hash256,
    payload_hash: Hash256,
    justified_epoch: Epoch,
    finalized_epoch: Epoch,
    weight: u64,
    best_child: Option<usize>,
    best_descendant: Option<usize>,
    validation_status: ValidationStatus,
}

impl ProtoNode {
    fn to_descriptor(&self) -> BlockDescriptor {
        BlockDescriptor {
            slot: self.slot,
            root: self.root,
            parent_root: None,
            target_root: self.target_root,
            state_root: self.state_root,
            payload_hash: self.payload_hash,
            justified_epoch: self.justified_epoch,
            finalized_epoch: self.finalized_epoch,
            weight: self.weight,
            validation_status: self.validation_status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayBackend {
    nodes: Vec<ProtoNode>,
    indices: HashMap<Hash256, usize>,
}

impl ArrayBackend {
    fn index_of(&self, root: &Hash256) -> Result<usize, Error> {
        self.indices
            .get(root)
            .copied()
            .ok_or(Error::InvalidNodeRoot(*root))
    }

    /// Does the node at `index` satisfy the justified/finalized viability filter described by
    /// `node_is_viable_for_head` in the upstream implementation? A node is viable if its own
    /// justified/finalized epochs match the store's, or if those store epochs are still zero
    /// (i.e. before the first justification has happened, everything is viable).
    fn node_is_viable_for_head(&self, node: &ProtoNode, justified_epoch: Epoch, finalized_epoch: Epoch) -> bool {
        let justified_ok = node.justified_epoch == justified_epoch || justified_epoch.is_zero();
        let finalized_ok = node.finalized_epoch == finalized_epoch || finalized_epoch.is_zero();
        justified_ok && finalized_ok
    }

    fn maybe_update_best_child_and_descendant(
        &mut self,
        parent_index: usize,
        child_index: usize,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        let child = self
            .nodes
            .get(child_index)
            .ok_or(Error::InvalidNodeIndex(child_index))?
            .clone();
        let child_leads_to_viable_head =
            self.node_leads_to_viable_head(&child, justified_epoch, finalized_epoch)?;

        let parent = self
            .nodes
            .get(parent_index)
            .ok_or(Error::InvalidNodeIndex(parent_index))?
            .clone();

        let new_best_child_and_descendant = match parent.best_child {
            Some(best_child_index) => {
                if best_child_index == child_index && !child_leads_to_viable_head {
                    (None, None)
                } else if best_child_index == child_index {
                    (Some(child_index), child.best_descendant.or(Some(child_index)))
                } else {
                    let best_child = self
                        .nodes
                        .get(best_child_index)
                        .ok_or(Error::InvalidNodeIndex(best_child_index))?
                        .clone();
                    let best_child_leads_to_viable_head =
                        self.node_leads_to_viable_head(&best_child, justified_epoch, finalized_epoch)?;

                    if child_leads_to_viable_head && !best_child_leads_to_viable_head {
                        (Some(child_index), child.best_descendant.or(Some(child_index)))
                    } else if !child_leads_to_viable_head && best_child_leads_to_viable_head {
                        (Some(best_child_index), best_child.best_descendant.or(Some(best_child_index)))
                    } else if child.weight == best_child.weight {
                        if child.root >= best_child.root {
                            (Some(child_index), child.best_descendant.or(Some(child_index)))
                        } else {
                            (Some(best_child_index), best_child.best_descendant.or(Some(best_child_index)))
                        }
                    } else if child.weight > best_child.weight {
                        (Some(child_index), child.best_descendant.or(Some(child_index)))
                    } else {
                        (Some(best_child_index), best_child.best_descendant.or(Some(best_child_index)))
                    }
                }
            }
            None => (Some(child_index), child.best_descendant.or(Some(child_index))),
        };

        let parent_mut = &mut self.nodes[parent_index];
        parent_mut.best_child = new_best_child_and_descendant.0;
        parent_mut.best_descendant = new_best_child_and_descendant.1;
        Ok(())
    }

    fn node_leads_to_viable_head(
        &self,
        node: &ProtoNode,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<bool, Error> {
        let best_descendant_is_viable = match node.best_descendant {
            Some(best_descendant_index) => {
                let best_descendant = self
                    .nodes
                    .get(best_descendant_index)
                    .ok_or(Error::InvalidNodeIndex(best_descendant_index))?;
                self.node_is_viable_for_head(best_descendant, justified_epoch, finalized_epoch)
            }
            None => false,
        };

        Ok(best_descendant_is_viable || self.node_is_viable_for_head(node, justified_epoch, finalized_epoch))
    }
}

impl ForkChoiceBackend for ArrayBackend {
    fn new(
        finalized_block_slot: Slot,
        finalized_root: Hash256,
        finalized_target_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Self {
        let node = ProtoNode {
            slot: finalized_block_slot,
            root: finalized_root,
            parent: None,
            target_root: finalized_target_root,
            state_root: Hash256::zero(),
            payload_hash: Hash256::zero(),
            justified_epoch,
            finalized_epoch,
            weight: 0,
            best_child: None,
            best_descendant: None,
            validation_status: ValidationStatus::Valid,
        };
        let mut indices = HashMap::new();
        indices.insert(finalized_root, 0);
        Self {
            nodes: vec![node],
            indices,
        }
    }

    fn insert(&mut self, desc: BlockDescriptor) -> Result<(), Error> {
        if self.indices.contains_key(&desc.root) {
            return Ok(());
        }

        let parent_index = match desc.parent_root {
            Some(parent_root) => Some(
                *self
                    .indices
                    .get(&parent_root)
                    .ok_or(Error::UnknownParent(parent_root))?,
            ),
            None => None,
        };

        let node_index = self.nodes.len();
        let node = ProtoNode {
            slot: desc.slot,
            root: desc.root,
            parent: parent_index,
            target_root: desc.target_root,
            state_root: desc.state_root,
            payload_hash: desc.payload_hash,
            justified_epoch: desc.justified_epoch,
            finalized_epoch: desc.finalized_epoch,
            weight: 0,
            best_child: None,
            best_descendant: None,
            validation_status: desc.validation_status,
        };

        self.indices.insert(node.root, node_index);
        self.nodes.push(node);

        if let Some(parent_index) = parent_index {
            self.maybe_update_best_child_and_descendant(
                parent_index,
                node_index,
                self.nodes[0].justified_epoch,
                self.nodes[0].finalized_epoch,
            )?;
        }

        Ok(())
    }

    fn apply_score_changes(
        &mut self,
        deltas: &HashMap<Hash256, i64>,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        for index in (0..self.nodes.len()).rev() {
            let root = self.nodes[index].root;
            let delta = deltas.get(&root).copied().unwrap_or(0);

            if delta < 0 {
                let abs = delta.unsigned_abs();
                self.nodes[index].weight = self.nodes[index]
                    .weight
                    .checked_sub(abs)
                    .ok_or(Error::DeltaOverflow(root))?;
            } else {
                self.nodes[index].weight = self.nodes[index]
                    .weight
                    .checked_add(delta as u64)
                    .ok_or(Error::DeltaOverflow(root))?;
            }

            if let Some(parent_index) = self.nodes[index].parent {
                self.maybe_update_best_child_and_descendant(
                    parent_index,
                    index,
                    justified_epoch,
                    finalized_epoch,
                )?;
            }
        }

        self.nodes[0].justified_epoch = justified_epoch;
        self.nodes[0].finalized_epoch = finalized_epoch;

        Ok(())
    }

    fn find_head(
        &self,
        justified_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        proposer_boost: Option<(Hash256, u64)>,
    ) -> Result<Hash256, Error> {
        let justified_index = self.index_of(&justified_root)?;
        let justified_node = &self.nodes[justified_index];

        let best_descendant_index = justified_node.best_descendant.unwrap_or(justified_index);

        // Proposer boost can only ever promote the boosted root itself to head: it cannot change
        // which branch the *unboosted* weights would already have selected beneath it, so it is
        // applied as a final override check rather than threaded through best_child resolution.
        if let Some((boost_root, boost_weight)) = proposer_boost {
            if boost_weight > 0 {
                if let Some(&boost_index) = self.indices.get(&boost_root) {
                    let boost_node = &self.nodes[boost_index];
                    let best_node = &self.nodes[best_descendant_index];
                    if self.node_is_viable_for_head(boost_node, justified_epoch, finalized_epoch)
                        && boost_node.weight + boost_weight >= best_node.weight
                    {
                        return Ok(boost_root);
                    }
                }
            }
        }

        let best_node = &self.nodes[best_descendant_index];
        if !self.node_is_viable_for_head(best_node, justified_epoch, finalized_epoch) {
            return Err(Error::InvalidBestNode {
                justified_epoch,
                finalized_epoch,
                node_justified_epoch: best_node.justified_epoch,
                node_finalized_epoch: best_node.finalized_epoch,
            });
        }

        Ok(best_node.root)
    }

    fn ancestor_at_slot(&self, root: Hash256, slot: Slot) -> Result<Hash256, Error> {
        let mut index = self.index_of(&root)?;
        loop {
            let node = &self.nodes[index];
            if node.slot <= slot {
                return Ok(node.root);
            }
            match node.parent {
                Some(parent_index) => index = parent_index,
                None => return Err(Error::AncestorUnknown { root, slot }),
            }
        }
    }

    fn update_with_valid(&mut self, root: Hash256) -> Result<(), Error> {
        let mut index = self.index_of(&root)?;
        loop {
            if self.nodes[index].validation_status == ValidationStatus::Valid {
                return Ok(());
            }
            self.nodes[index].validation_status = ValidationStatus::Valid;
            match self.nodes[index].parent {
                Some(parent_index) => index = parent_index,
                None => return Ok(()),
            }
        }
    }

    fn update_with_invalid(&mut self, root: Hash256) -> Result<Vec<Hash256>, Error> {
        let bad_index = self.index_of(&root)?;

        let mut to_remove: Vec<usize> = vec![bad_index];
        let mut frontier = vec![bad_index];
        while let Some(current) = frontier.pop() {
            for (i, node) in self.nodes.iter().enumerate() {
                if node.parent == Some(current) && !to_remove.contains(&i) {
                    to_remove.push(i);
                    frontier.push(i);
                }
            }
        }

        let removed_weight: u64 = to_remove.iter().map(|&i| self.nodes[i].weight).sum();
        let removed_roots: Vec<Hash256> = to_remove.iter().map(|&i| self.nodes[i].root).collect();

        if let Some(parent_index) = self.nodes[bad_index].parent {
            let mut ancestor_index = parent_index;
            loop {
                self.nodes[ancestor_index].weight =
                    self.nodes[ancestor_index].weight.saturating_sub(removed_weight);
                match self.nodes[ancestor_index].parent {
                    Some(next) => ancestor_index = next,
                    None => break,
                }
            }
        }

        // Capture every surviving node's relationships by root before the index-shifting
        // `remove` calls invalidate the old indices, then rebuild indices against the new
        // (post-removal) node order.
        let parent_roots: HashMap<Hash256, Hash256> = self
            .nodes
            .iter()
            .filter(|n| !removed_roots.contains(&n.root))
            .filter_map(|n| n.parent.map(|p| (n.root, self.nodes[p].root)))
            .collect();

        to_remove.sort_unstable();
        for &i in to_remove.iter().rev() {
            let root = self.nodes[i].root;
            self.indices.remove(&root);
            self.nodes.remove(i);
        }

        self.indices = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.root, i))
            .collect();

        let new_parents: Vec<Option<usize>> = self
            .nodes
            .iter()
            .map(|n| {
                parent_roots
                    .get(&n.root)
                    .and_then(|p| self.indices.get(p))
                    .copied()
            })
            .collect();
        for (node, new_parent) in self.nodes.iter_mut().zip(new_parents) {
            node.parent = new_parent;
            node.best_child = None;
            node.best_descendant = None;
        }

        // best_child/best_descendant depend on weights that just changed along the ancestor
        // chain; recompute them bottom-up exactly as `apply_score_changes` does, with zero
        // additional deltas.
        let justified_epoch = self.nodes[0].justified_epoch;
        let finalized_epoch = self.nodes[0].finalized_epoch;
        for index in (0..self.nodes.len()).rev() {
            if let Some(parent_index) = self.nodes[index].parent {
                self.maybe_update_best_child_and_descendant(
                    parent_index,
                    index,
                    justified_epoch,
                    finalized_epoch,
                )?;
            }
        }

        Ok(removed_roots)
    }

    fn maybe_prune(&mut self, finalized_root: Hash256) -> Result<usize, Error> {
        let finalized_index = self.index_of(&finalized_root)?;
        if finalized_index == 0 {
            return Ok(0);
        }

        let removed = finalized_index;
        self.nodes.drain(0..finalized_index);
        for node in self.nodes.iter_mut() {
            node.parent = node.parent.map(|p| p.saturating_sub(finalized_index));
            node.best_child = node.best_child.map(|c| c.saturating_sub(finalized_index));
            node.best_descendant = node.best_descendant.map(|d| d.saturating_sub(finalized_index));
        }
        self.nodes[0].parent = None;

        self.indices = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.root, i))
            .collect();

        Ok(removed)
    }

    fn contains_block(&self, root: &Hash256) -> bool {
        self.indices.contains_key(root)
    }

    fn get_block(&self, root: &Hash256) -> Option<BlockDescriptor> {
        let index = *self.indices.get(root)?;
        let node = &self.nodes[index];
        let mut desc = node.to_descriptor();
        desc.parent_root = node.parent.map(|p| self.nodes[p].root);
        Some(desc)
    }

    fn validation_status(&self, root: &Hash256) -> Option<ValidationStatus> {
        let index = *self.indices.get(root)?;
        Some(self.nodes[index].validation_status)
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

