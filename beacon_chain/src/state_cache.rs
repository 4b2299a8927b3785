use std::collections::HashMap;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use types::{BeaconBlock, BeaconState, ChainSpec, Hash256, Slot};

use crate::errors::{BeaconChainError, TransientReason};

const DEFAULT_STATE_CACHE_SIZE: usize = 32;

/// The state-transition function itself: an external collaborator (BLS signature verification,
/// SSZ-tree validator-registry bookkeeping, epoch processing) this core treats as opaque. Supplied
/// by the caller so the regenerator never has to know how a `BeaconState` is actually produced.
pub trait StateTransition: Send + Sync {
    /// Advances `state` from its current slot up to, but not including, `target_slot`, applying
    /// any empty-slot (no new block) processing along the way.
    fn per_slot_transition(&self, state: &mut BeaconState, target_slot: Slot, spec: &ChainSpec) -> Result<(), String>;

    /// Applies `block` itself to `state`, which must already be advanced to `block.slot`.
    fn per_block_transition(&self, state: &mut BeaconState, block: &BeaconBlock, spec: &ChainSpec) -> Result<(), String>;
}

/// LRU cache of post-states keyed by block root, with on-demand regeneration by replaying blocks
/// from the nearest cached or persisted ancestor. Concurrent callers requesting the same
/// not-yet-cached root block on each other rather than regenerating it twice: grounded on the
/// single-flight discipline `attestation_verification.rs`'s lock-timeout constants imply for the
/// shuffling/pubkey caches in the source this crate draws from.
pub struct StateRegenerator<S, T> {
    store: Arc<S>,
    transition: Arc<T>,
    spec: ChainSpec,
    cache: Mutex<LruCache<Hash256, Arc<BeaconState>>>,
    in_progress: Mutex<HashMap<Hash256, Arc<Mutex<()>>>>,
}

impl<S, T> StateRegenerator<S, T>
where
    S: store::Store,
    T: StateTransition,
{
    pub fn new(store: Arc<S>, transition: Arc<T>, spec: ChainSpec) -> Self {
        Self::with_capacity(store, transition, spec, DEFAULT_STATE_CACHE_SIZE)
    }

    pub fn with_capacity(store: Arc<S>, transition: Arc<T>, spec: ChainSpec, capacity: usize) -> Self {
        Self {
            store,
            transition,
            spec,
            cache: Mutex::new(LruCache::new(capacity)),
            in_progress: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a freshly-computed post-state directly into the cache, bypassing regeneration.
    /// Used by the block processor right after running state transition on a newly imported
    /// block, since recomputing it a moment later from the cache would be wasted work.
    pub fn put(&self, root: Hash256, state: Arc<BeaconState>) {
        self.cache.lock().put(root, state);
    }

    pub fn get_cached(&self, root: &Hash256) -> Option<Arc<BeaconState>> {
        self.cache.lock().get(root).cloned()
    }

    /// Advances `parent_state` through `block`'s slot and applies `block` itself. Does not touch
    /// the cache; callers that produce a new block's post-state this way are expected to `put` it
    /// in afterwards if it's worth retaining.
    pub fn apply_block(&self, parent_state: &BeaconState, block: &BeaconBlock) -> Result<BeaconState, String> {
        let mut state = parent_state.clone();
        self.transition.per_slot_transition(&mut state, block.slot, &self.spec)?;
        self.transition.per_block_transition(&mut state, block, &self.spec)?;
        Ok(state)
    }

    /// Returns the post-state at `root`, regenerating it by replaying blocks from the nearest
    /// ancestor with a cached or persisted state if it is not already available.
    pub fn get_state(&self, root: Hash256) -> Result<Arc<BeaconState>, BeaconChainError> {
        if let Some(state) = self.get_cached(&root) {
            return Ok(state);
        }

        let root_lock = {
            let mut in_progress = self.in_progress.lock();
            in_progress
                .entry(root)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = root_lock.lock();

        // Someone else may have finished regenerating `root` while we waited for the lock.
        if let Some(state) = self.get_cached(&root) {
            self.in_progress.lock().remove(&root);
            return Ok(state);
        }

        let result = self.regenerate(root);
        self.in_progress.lock().remove(&root);
        result
    }

    fn regenerate(&self, root: Hash256) -> Result<Arc<BeaconState>, BeaconChainError> {
        let mut blocks = Vec::new();
        let mut cursor = root;

        let base = loop {
            if let Some(state) = self.get_cached(&cursor) {
                break state;
            }

            if let Some(state) = self.store.state_by_root(&cursor)? {
                break Arc::new(state);
            }

            let block = self
                .store
                .block_by_root(&cursor)?
                .ok_or(BeaconChainError::Transient(TransientReason::MissingParentState(cursor)))?;
            let parent_root = block.message.parent_root;
            blocks.push(block.message);
            cursor = parent_root;
        };

        let mut state = (*base).clone();
        for block in blocks.into_iter().rev() {
            self.transition
                .per_slot_transition(&mut state, block.slot, &self.spec)
                .map_err(|e| BeaconChainError::InvalidBlock(crate::errors::InvalidBlockReason::FailedStateTransition(e)))?;
            self.transition
                .per_block_transition(&mut state, &block, &self.spec)
                .map_err(|e| BeaconChainError::InvalidBlock(crate::errors::InvalidBlockReason::FailedStateTransition(e)))?;
        }

        let state = Arc::new(state);
        self.cache.lock().put(root, state.clone());
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;
    use types::{BeaconBlock, Signature, SignedBeaconBlock};

    struct NoopTransition;

    impl StateTransition for NoopTransition {
        fn per_slot_transition(&self, state: &mut BeaconState, target_slot: Slot, _spec: &ChainSpec) -> Result<(), String> {
            state.slot = target_slot;
            Ok(())
        }

        fn per_block_transition(&self, _state: &mut BeaconState, _block: &BeaconBlock, _spec: &ChainSpec) -> Result<(), String> {
            Ok(())
        }
    }

    fn store_block(store: &MemoryStore, root: Hash256, slot: u64, parent_root: Hash256) {
        store
            .save_block(
                root,
                SignedBeaconBlock {
                    message: BeaconBlock {
                        slot: Slot::new(slot),
                        parent_root,
                        ..Default::default()
                    },
                    signature: Signature(vec![]),
                },
            )
            .unwrap();
    }

    #[test]
    fn regenerates_from_genesis_state() {
        let store = Arc::new(MemoryStore::new());
        let genesis_root = Hash256::from_low_u64_be(1);
        store.save_state(genesis_root, BeaconState::default()).unwrap();
        store_block(&store, genesis_root, 0, Hash256::zero());

        let child_root = Hash256::from_low_u64_be(2);
        store_block(&store, child_root, 1, genesis_root);

        let regen = StateRegenerator::new(store, Arc::new(NoopTransition), ChainSpec::minimal());
        let state = regen.get_state(child_root).unwrap();
        assert_eq!(state.slot, Slot::new(1));
        assert!(regen.get_cached(&child_root).is_some());
    }

    #[test]
    fn missing_ancestor_is_transient() {
        let store = Arc::new(MemoryStore::new());
        let regen = StateRegenerator::new(store, Arc::new(NoopTransition), ChainSpec::minimal());
        let err = regen.get_state(Hash256::from_low_u64_be(99)).unwrap_err();
        assert!(matches!(err, BeaconChainError::Transient(TransientReason::MissingParentState(_))));
    }
}
