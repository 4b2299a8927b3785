//! Doubly-linked fork choice backend: an arena of `Rc<RefCell<Node>>`, each holding a weak
//! back-pointer to its parent and strong pointers to `best_child`/`best_descendant`. Exists
//! alongside [`crate::array_backend::ArrayBackend`] as a second, independent implementation of
//! [`ForkChoiceBackend`] so the rest of the fork choice stack can be exercised against either
//! representation without caring which one is in use.

use crate::backend::ForkChoiceBackend;
use crate::node::{BlockDescriptor, ValidationStatus};
use crate::Error;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use types::{Epoch, Hash256, Slot};

struct Node {
    slot: Slot,
    root: Hash256,
    parent: RefCell<Weak<Node>>,
    target_root: Hash256,
    state_root: Hash256,
    payload_hash: Hash256,
    justified_epoch: RefCell<Epoch>,
    finalized_epoch: RefCell<Epoch>,
    weight: RefCell<u64>,
    best_child: RefCell<Option<Rc<Node>>>,
    best_descendant: RefCell<Option<Rc<Node>>>,
    validation_status: RefCell<ValidationStatus>,
}

impl Node {
    fn to_descriptor(&self) -> BlockDescriptor {
        BlockDescriptor {
            slot: self.slot,
            root: self.root,
            parent_root: self.parent.borrow().upgrade().map(|p| p.root),
            target_root: self.target_root,
            state_root: self.state_root,
            payload_hash: self.payload_hash,
            justified_epoch: *self.justified_epoch.borrow(),
            finalized_epoch: *self.finalized_epoch.borrow(),
            weight: *self.weight.borrow(),
            validation_status: *self.validation_status.borrow(),
        }
    }
}

/// A `Rc<RefCell<...>>` tree is not `Send`/`Sync` by construction; callers that need to share a
/// backend across threads use [`crate::array_backend::ArrayBackend`] instead, guarded by a
/// `parking_lot::RwLock` at the `ProtoArrayForkChoice` layer.
pub struct LinkedBackend {
    root: Rc<Node>,
    nodes: Vec<Rc<Node>>,
    indices: HashMap<Hash256, usize>,
}

impl LinkedBackend {
    fn get(&self, root: &Hash256) -> Result<Rc<Node>, Error> {
        self.indices
            .get(root)
            .map(|&i| self.nodes[i].clone())
            .ok_or(Error::InvalidNodeRoot(*root))
    }

    fn node_is_viable_for_head(node: &Node, justified_epoch: Epoch, finalized_epoch: Epoch) -> bool {
        let justified_ok = *node.justified_epoch.borrow() == justified_epoch || justified_epoch.is_zero();
        let finalized_ok = *node.finalized_epoch.borrow() == finalized_epoch || finalized_epoch.is_zero();
        justified_ok && finalized_ok
    }

    fn node_leads_to_viable_head(node: &Rc<Node>, justified_epoch: Epoch, finalized_epoch: Epoch) -> bool {
        let descendant_viable = node
            .best_descendant
            .borrow()
            .as_ref()
            .map(|d| Self::node_is_viable_for_head(d, justified_epoch, finalized_epoch))
            .unwrap_or(false);
        descendant_viable || Self::node_is_viable_for_head(node, justified_epoch, finalized_epoch)
    }

    fn maybe_update_best_child_and_descendant(
        parent: &Rc<Node>,
        child: &Rc<Node>,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) {
        let child_leads_to_viable_head = Self::node_leads_to_viable_head(child, justified_epoch, finalized_epoch);
        let current_best_child = parent.best_child.borrow().clone();

        let (new_best_child, new_best_descendant) = match current_best_child {
            Some(ref best_child) if Rc::ptr_eq(best_child, child) => {
                if child_leads_to_viable_head {
                    (Some(child.clone()), Some(child.best_descendant.borrow().clone().unwrap_or_else(|| child.clone())))
                } else {
                    (None, None)
                }
            }
            Some(ref best_child) => {
                let best_child_leads_to_viable_head =
                    Self::node_leads_to_viable_head(best_child, justified_epoch, finalized_epoch);
                if child_leads_to_viable_head && !best_child_leads_to_viable_head {
                    (Some(child.clone()), Some(child.best_descendant.borrow().clone().unwrap_or_else(|| child.clone())))
                } else if !child_leads_to_viable_head && best_child_leads_to_viable_head {
                    (Some(best_child.clone()), Some(best_child.best_descendant.borrow().clone().unwrap_or_else(|| best_child.clone())))
                } else {
                    let child_weight = *child.weight.borrow();
                    let best_weight = *best_child.weight.borrow();
                    let child_wins = child_weight > best_weight
                        || (child_weight == best_weight && child.root >= best_child.root);
                    if child_wins {
                        (Some(child.clone()), Some(child.best_descendant.borrow().clone().unwrap_or_else(|| child.clone())))
                    } else {
                        (Some(best_child.clone()), Some(best_child.best_descendant.borrow().clone().unwrap_or_else(|| best_child.clone())))
                    }
                }
            }
            None => (Some(child.clone()), Some(child.best_descendant.borrow().clone().unwrap_or_else(|| child.clone()))),
        };

        *parent.best_child.borrow_mut() = new_best_child;
        *parent.best_descendant.borrow_mut() = new_best_descendant;
    }
}

impl ForkChoiceBackend for LinkedBackend {
    fn new(
        finalized_block_slot: Slot,
        finalized_root: Hash256,
        finalized_target_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Self {
        let root = Rc::new(Node {
            slot: finalized_block_slot,
            root: finalized_root,
            parent: RefCell::new(Weak::new()),
            target_root: finalized_target_root,
            state_root: Hash256::zero(),
            payload_hash: Hash256::zero(),
            justified_epoch: RefCell::new(justified_epoch),
            finalized_epoch: RefCell::new(finalized_epoch),
            weight: RefCell::new(0),
            best_child: RefCell::new(None),
            best_descendant: RefCell::new(None),
            validation_status: RefCell::new(ValidationStatus::Valid),
        });
        let mut indices = HashMap::new();
        indices.insert(finalized_root, 0);
        Self {
            root: root.clone(),
            nodes: vec![root],
            indices,
        }
    }

    fn insert(&mut self, desc: BlockDescriptor) -> Result<(), Error> {
        if self.indices.contains_key(&desc.root) {
            return Ok(());
        }

        let parent = match desc.parent_root {
            Some(parent_root) => Some(self.get(&parent_root)?),
            None => None,
        };

        let node = Rc::new(Node {
            slot: desc.slot,
            root: desc.root,
            parent: RefCell::new(parent.as_ref().map(Rc::downgrade).unwrap_or_default()),
            target_root: desc.target_root,
            state_root: desc.state_root,
            payload_hash: desc.payload_hash,
            justified_epoch: RefCell::new(desc.justified_epoch),
            finalized_epoch: RefCell::new(desc.finalized_epoch),
            weight: RefCell::new(0),
            best_child: RefCell::new(None),
            best_descendant: RefCell::new(None),
            validation_status: RefCell::new(desc.validation_status),
        });

        self.indices.insert(node.root, self.nodes.len());
        self.nodes.push(node.clone());

        if let Some(parent) = parent {
            let justified_epoch = *self.root.justified_epoch.borrow();
            let finalized_epoch = *self.root.finalized_epoch.borrow();
            Self::maybe_update_best_child_and_descendant(&parent, &node, justified_epoch, finalized_epoch);
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
            let node = self.nodes[index].clone();
            let delta = deltas.get(&node.root).copied().unwrap_or(0);
            let mut weight = node.weight.borrow_mut();
            if delta < 0 {
                *weight = weight.checked_sub(delta.unsigned_abs()).ok_or(Error::DeltaOverflow(node.root))?;
            } else {
                *weight = weight.checked_add(delta as u64).ok_or(Error::DeltaOverflow(node.root))?;
            }
            drop(weight);

            if let Some(parent) = node.parent.borrow().upgrade() {
                Self::maybe_update_best_child_and_descendant(&parent, &node, justified_epoch, finalized_epoch);
            }
        }

        *self.root.justified_epoch.borrow_mut() = justified_epoch;
        *self.root.finalized_epoch.borrow_mut() = finalized_epoch;

        Ok(())
    }

    fn find_head(
        &self,
        justified_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        proposer_boost: Option<(Hash256, u64)>,
    ) -> Result<Hash256, Error> {
        let justified_node = self.get(&justified_root)?;
        let best = justified_node
            .best_descendant
            .borrow()
            .clone()
            .unwrap_or_else(|| justified_node.clone());

        if let Some((boost_root, boost_weight)) = proposer_boost {
            if boost_weight > 0 {
                if let Ok(boost_node) = self.get(&boost_root) {
                    if Self::node_is_viable_for_head(&boost_node, justified_epoch, finalized_epoch)
                        && *boost_node.weight.borrow() + boost_weight >= *best.weight.borrow()
                    {
                        return Ok(boost_root);
                    }
                }
            }
        }

        if !Self::node_is_viable_for_head(&best, justified_epoch, finalized_epoch) {
            return Err(Error::InvalidBestNode {
                justified_epoch,
                finalized_epoch,
                node_justified_epoch: *best.justified_epoch.borrow(),
                node_finalized_epoch: *best.finalized_epoch.borrow(),
            });
        }

        Ok(best.root)
    }

    fn ancestor_at_slot(&self, root: Hash256, slot: Slot) -> Result<Hash256, Error> {
        let mut node = self.get(&root)?;
        loop {
            if node.slot <= slot {
                return Ok(node.root);
            }
            match node.parent.borrow().upgrade() {
                Some(parent) => node = parent,
                None => return Err(Error::AncestorUnknown { root, slot }),
            }
        }
    }

    fn update_with_valid(&mut self, root: Hash256) -> Result<(), Error> {
        let mut node = self.get(&root)?;
        loop {
            if *node.validation_status.borrow() == ValidationStatus::Valid {
                return Ok(());
            }
            *node.validation_status.borrow_mut() = ValidationStatus::Valid;
            match node.parent.borrow().upgrade() {
                Some(parent) => node = parent,
                None => return Ok(()),
            }
        }
    }

    fn update_with_invalid(&mut self, root: Hash256) -> Result<Vec<Hash256>, Error> {
        let bad = self.get(&root)?;
        let parent = bad.parent.borrow().upgrade();

        let mut removed_roots = Vec::new();
        let mut removed_weight: u64 = 0;
        let mut frontier = vec![bad.root];
        while let Some(current_root) = frontier.pop() {
            let current_index = *self.indices.get(&current_root).ok_or(Error::InvalidNodeRoot(current_root))?;
            let current = self.nodes[current_index].clone();
            removed_weight += *current.weight.borrow();
            removed_roots.push(current_root);

            for n in self.nodes.iter() {
                if let Some(p) = n.parent.borrow().upgrade() {
                    if Rc::ptr_eq(&p, &current) && !removed_roots.contains(&n.root) {
                        frontier.push(n.root);
                    }
                }
            }
        }

        if let Some(ref parent) = parent {
            let mut ancestor = parent.clone();
            loop {
                let mut w = ancestor.weight.borrow_mut();
                *w = w.saturating_sub(removed_weight);
                drop(w);
                let next = ancestor.parent.borrow().upgrade();
                match next {
                    Some(next) => ancestor = next,
                    None => break,
                }
            }
        }

        self.nodes.retain(|n| !removed_roots.contains(&n.root));
        self.indices = self.nodes.iter().enumerate().map(|(i, n)| (n.root, i)).collect();

        if let Some(parent) = parent {
            *parent.best_child.borrow_mut() = None;
            *parent.best_descendant.borrow_mut() = None;
            let justified_epoch = *self.root.justified_epoch.borrow();
            let finalized_epoch = *self.root.finalized_epoch.borrow();
            for n in self.nodes.iter() {
                if let Some(p) = n.parent.borrow().upgrade() {
                    if Rc::ptr_eq(&p, &parent) {
                        Self::maybe_update_best_child_and_descendant(&parent, n, justified_epoch, finalized_epoch);
                    }
                }
            }
        }

        Ok(removed_roots)
    }

    fn maybe_prune(&mut self, finalized_root: Hash256) -> Result<usize, Error> {
        let new_root = self.get(&finalized_root)?;
        let old_len = self.nodes.len();

        *new_root.parent.borrow_mut() = Weak::new();

        // A node survives pruning iff it is `new_root` or a descendant of it; walk the parent
        // chain of every node to decide (cheap: the tree is shallow relative to its breadth in
        // the unfinalized region we keep).
        let mut keep = Vec::with_capacity(self.nodes.len());
        for n in self.nodes.iter() {
            let mut cur = n.clone();
            let mut survives = Rc::ptr_eq(&cur, &new_root);
            while !survives {
                match cur.parent.borrow().upgrade() {
                    Some(p) => {
                        if Rc::ptr_eq(&p, &new_root) {
                            survives = true;
                            break;
                        }
                        cur = p;
                    }
                    None => break,
                }
            }
            keep.push(survives);
        }

        let mut new_nodes = Vec::new();
        for (n, k) in self.nodes.iter().zip(keep) {
            if k {
                new_nodes.push(n.clone());
            }
        }
        self.nodes = new_nodes;
        self.root = new_root;
        self.indices = self.nodes.iter().enumerate().map(|(i, n)| (n.root, i)).collect();

        Ok(old_len.saturating_sub(self.nodes.len()))
    }

    fn contains_block(&self, root: &Hash256) -> bool {
        self.indices.contains_key(root)
    }

    fn get_block(&self, root: &Hash256) -> Option<BlockDescriptor> {
        let index = *self.indices.get(root)?;
        Some(self.nodes[index].to_descriptor())
    }

    fn validation_status(&self, root: &Hash256) -> Option<ValidationStatus> {
        let index = *self.indices.get(root)?;
        Some(*self.nodes[index].validation_status.borrow())
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}
