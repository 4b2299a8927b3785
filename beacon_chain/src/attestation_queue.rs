use std::collections::HashMap;

use parking_lot::Mutex;
use store::Store;
use types::{Hash256, SignedAggregateAttestation, Slot};

/// Attestations whose `beacon_block_root` has not yet arrived, keyed by that root. A caller
/// drains this twice per slot (mirroring `processPendingAttsPeriod` in the sync service this is
/// grounded on): attestations whose block has since arrived are handed back for re-validation,
/// roots still missing are handed back too so the caller can request the block from a peer.
#[derive(Default)]
pub struct AttestationPendingQueue {
    pending: Mutex<HashMap<Hash256, Vec<SignedAggregateAttestation>>>,
}

impl AttestationPendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `attestation` against `block_root`. A second attestation from the same aggregator
    /// for the same root is dropped silently, matching `savePendingAtt`'s dedup-by-aggregator.
    pub fn insert(&self, block_root: Hash256, attestation: SignedAggregateAttestation) {
        let mut pending = self.pending.lock();
        let entry = pending.entry(block_root).or_insert_with(Vec::new);

        if entry
            .iter()
            .any(|a| a.aggregator_index == attestation.aggregator_index)
        {
            return;
        }

        entry.push(attestation);
    }

    /// Drops attestations that have fallen more than `slots_per_epoch` slots behind
    /// `current_slot`, and any root left with an empty list, so the map never grows dangling keys.
    pub fn expire(&self, current_slot: Slot, slots_per_epoch: u64) {
        let mut pending = self.pending.lock();

        for attestations in pending.values_mut() {
            attestations.retain(|a| current_slot.as_u64() < a.data.slot.as_u64() + slots_per_epoch);
        }

        pending.retain(|_, attestations| !attestations.is_empty());
    }

    /// Splits queued roots into those whose block (and post-state or state summary) has now
    /// arrived, removed from the queue and returned for re-validation, and those still missing,
    /// left in place and returned so the caller can ask a peer for them.
    pub fn drain_ready<S: Store>(&self, store: &S) -> Result<(Vec<(Hash256, Vec<SignedAggregateAttestation>)>, Vec<Hash256>), store::Error> {
        let roots: Vec<Hash256> = self.pending.lock().keys().copied().collect();
        let mut ready = Vec::new();
        let mut missing = Vec::new();

        for root in roots {
            let block_known = store.has_block(&root)?;
            let state_known = store.has_state(&root)? || store.has_state_summary(&root)?;

            if block_known && state_known {
                if let Some(attestations) = self.pending.lock().remove(&root) {
                    ready.push((root, attestations));
                }
            } else {
                missing.push(root);
            }
        }

        Ok((ready, missing))
    }

    /// Removes and returns the attestations queued against exactly `root`, if any. Used by the
    /// block processor to drain entries this specific block import has just unblocked, distinct
    /// from the periodic [`Self::drain_ready`] sweep over every queued root.
    pub fn take(&self, root: &Hash256) -> Option<Vec<SignedAggregateAttestation>> {
        self.pending.lock().remove(root)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;
    use types::{AttestationData, Checkpoint};

    fn attestation(aggregator_index: u64, slot: u64) -> SignedAggregateAttestation {
        SignedAggregateAttestation {
            aggregator_index,
            data: AttestationData {
                slot: Slot::new(slot),
                index: 0,
                beacon_block_root: Hash256::zero(),
                source: Checkpoint::default(),
                target: Checkpoint::default(),
            },
            is_aggregated: false,
        }
    }

    #[test]
    fn dedups_by_aggregator_index() {
        let queue = AttestationPendingQueue::new();
        let root = Hash256::from_low_u64_be(1);
        queue.insert(root, attestation(0, 5));
        queue.insert(root, attestation(0, 5));
        queue.insert(root, attestation(1, 5));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn expires_attestations_an_epoch_stale() {
        let queue = AttestationPendingQueue::new();
        let root = Hash256::from_low_u64_be(1);
        queue.insert(root, attestation(0, 0));
        queue.expire(Slot::new(32), 32);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_ready_splits_by_block_presence() {
        let queue = AttestationPendingQueue::new();
        let known_root = Hash256::from_low_u64_be(1);
        let missing_root = Hash256::from_low_u64_be(2);
        queue.insert(known_root, attestation(0, 1));
        queue.insert(missing_root, attestation(1, 1));

        let store = MemoryStore::new();
        store
            .save_block(
                known_root,
                types::SignedBeaconBlock {
                    message: Default::default(),
                    signature: types::Signature(vec![]),
                },
            )
            .unwrap();
        store.save_state(known_root, types::BeaconState::default()).unwrap();

        let (ready, missing) = queue.drain_ready(&store).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, known_root);
        assert_eq!(missing, vec![missing_root]);
        assert_eq!(queue.len(), 1);
    }
}
