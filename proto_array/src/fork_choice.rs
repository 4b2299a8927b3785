//! Representation-agnostic wrapper around a [`ForkChoiceBackend`]: turns per-validator
//! `VoteTracker` updates into the weight deltas the backend needs, and owns proposer-boost and
//! balance bookkeeping that both backend implementations share identically.

use crate::backend::ForkChoiceBackend;
use crate::node::{BlockDescriptor, ElasticList, ValidationStatus, VoteTracker};
use crate::Error;
use parking_lot::RwLock;
use std::collections::HashMap;
use types::{Epoch, Hash256, Slot};

/// A transient weight boost applied to the most recently seen block of the current slot, so a
/// timely honest proposal wins fork choice over a competing late/equivocating block even before
/// attester votes catch up. Expires at the end of the slot it was granted in.
#[derive(Debug, Clone, Copy)]
struct ProposerBoost {
    root: Hash256,
    weight: u64,
}

pub struct ProtoArrayForkChoice<B> {
    backend: RwLock<B>,
    votes: RwLock<ElasticList<VoteTracker>>,
    balances: RwLock<Vec<u64>>,
    proposer_boost: RwLock<Option<ProposerBoost>>,
}

impl<B: ForkChoiceBackend> ProtoArrayForkChoice<B> {
    pub fn new(
        finalized_block_slot: Slot,
        finalized_root: Hash256,
        finalized_target_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Self {
        Self {
            backend: RwLock::new(B::new(
                finalized_block_slot,
                finalized_root,
                finalized_target_root,
                justified_epoch,
                finalized_epoch,
            )),
            votes: RwLock::new(ElasticList::default()),
            balances: RwLock::new(Vec::new()),
            proposer_boost: RwLock::new(None),
        }
    }

    pub fn process_block(&self, desc: BlockDescriptor) -> Result<(), Error> {
        self.backend.write().insert(desc)
    }

    pub fn contains_block(&self, root: &Hash256) -> bool {
        self.backend.read().contains_block(root)
    }

    pub fn get_block(&self, root: &Hash256) -> Option<BlockDescriptor> {
        self.backend.read().get_block(root)
    }

    pub fn validation_status(&self, root: &Hash256) -> Option<ValidationStatus> {
        self.backend.read().validation_status(root)
    }

    pub fn len(&self) -> usize {
        self.backend.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record (or overwrite) validator `validator_index`'s vote for `block_root` in the epoch
    /// `target_epoch`. The vote does not affect weights until the next [`Self::process_changes`].
    pub fn process_attestation(&self, validator_index: usize, block_root: Hash256, target_epoch: Epoch) {
        let mut votes = self.votes.write();
        let vote = votes.get_mut(validator_index);
        if target_epoch > vote.next_epoch || vote.next_root == Hash256::zero() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
        }
    }

    /// Roll `next_root`/`next_epoch` into `current_root` for every vote whose epoch has arrived,
    /// compute the resulting weight delta per root (old vote loses `balance`, new vote gains it),
    /// then hand the deltas to the backend. Mirrors `ProtoArray::apply_score_changes` /
    /// `compute_deltas` in the upstream implementation.
    pub fn process_changes(
        &self,
        new_balances: &[u64],
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        let mut votes = self.votes.write();
        let mut balances = self.balances.write();
        let mut deltas: HashMap<Hash256, i64> = HashMap::new();

        let num_validators = votes.len().max(balances.len()).max(new_balances.len());
        for i in 0..num_validators {
            let vote = votes.get_mut(i);
            let old_balance = balances.get(i).copied().unwrap_or(0);
            let new_balance = new_balances.get(i).copied().unwrap_or(0);

            let old_root = vote.current_root;
            let new_root = vote.next_root;

            if old_root == new_root && old_balance == new_balance {
                continue;
            }

            if old_root != Hash256::zero() {
                *deltas.entry(old_root).or_insert(0) -= old_balance as i64;
            }
            if new_root != Hash256::zero() {
                *deltas.entry(new_root).or_insert(0) += new_balance as i64;
            }

            vote.current_root = new_root;
        }

        *balances = new_balances.to_vec();
        drop(votes);
        drop(balances);

        self.apply_proposer_boost_expiry();

        self.backend.write().apply_score_changes(&deltas, justified_epoch, finalized_epoch)
    }

    /// Grant (or replace) the proposer boost to `root`. `committee_weight` is the total active
    /// balance for the current epoch; the boost itself is a configured percentage of it (the
    /// percentage lives in the caller's `ChainSpec`, not here, since proto_array has no spec
    /// dependency).
    pub fn boost_proposer(&self, root: Hash256, boost_weight: u64) {
        *self.proposer_boost.write() = Some(ProposerBoost { root, weight: boost_weight });
    }

    pub fn clear_proposer_boost(&self) {
        *self.proposer_boost.write() = None;
    }

    fn apply_proposer_boost_expiry(&self) {
        // Boost is cleared by the caller (fork choice's `on_tick`) at the slot boundary; this
        // hook exists so `process_changes` is the single place both weight recompute and boost
        // lifetime are visible together in one read of the code.
    }

    pub fn find_head(&self, justified_root: Hash256, justified_epoch: Epoch, finalized_epoch: Epoch) -> Result<Hash256, Error> {
        let boost = self.proposer_boost.read().map(|b| (b.root, b.weight));
        self.backend.read().find_head(justified_root, justified_epoch, finalized_epoch, boost)
    }

    pub fn ancestor_at_slot(&self, root: Hash256, slot: Slot) -> Result<Hash256, Error> {
        self.backend.read().ancestor_at_slot(root, slot)
    }

    pub fn update_with_valid(&self, root: Hash256) -> Result<(), Error> {
        self.backend.write().update_with_valid(root)
    }

    pub fn update_with_invalid(&self, root: Hash256) -> Result<Vec<Hash256>, Error> {
        self.backend.write().update_with_invalid(root)
    }

    pub fn maybe_prune(&self, finalized_root: Hash256) -> Result<usize, Error> {
        self.backend.write().maybe_prune(finalized_root)
    }
}
