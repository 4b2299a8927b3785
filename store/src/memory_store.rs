use crate::{Error, StateSummary, Store};
use parking_lot::RwLock;
use std::collections::HashMap;
use types::{BeaconState, Checkpoint, Hash256, SignedBeaconBlock};

/// Entirely in-memory `Store`, used by tests and by callers that haven't wired up a persistent
/// backend yet. Holds no locking discipline beyond per-map `RwLock`s since, unlike fork choice,
/// the store has no cross-key invariant that needs a single coarse lock.
#[derive(Default)]
pub struct MemoryStore {
    blocks: RwLock<HashMap<Hash256, SignedBeaconBlock>>,
    states: RwLock<HashMap<Hash256, BeaconState>>,
    state_summaries: RwLock<HashMap<Hash256, StateSummary>>,
    genesis_block_root: RwLock<Option<Hash256>>,
    justified_checkpoint: RwLock<Option<Checkpoint>>,
    finalized_checkpoint: RwLock<Option<Checkpoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn save_block(&self, root: Hash256, block: SignedBeaconBlock) -> Result<(), Error> {
        self.blocks.write().insert(root, block);
        Ok(())
    }

    fn block_by_root(&self, root: &Hash256) -> Result<Option<SignedBeaconBlock>, Error> {
        Ok(self.blocks.read().get(root).cloned())
    }

    fn has_block(&self, root: &Hash256) -> Result<bool, Error> {
        Ok(self.blocks.read().contains_key(root))
    }

    fn delete_block(&self, root: &Hash256) -> Result<(), Error> {
        self.blocks.write().remove(root);
        Ok(())
    }

    fn save_state(&self, root: Hash256, state: BeaconState) -> Result<(), Error> {
        self.states.write().insert(root, state);
        Ok(())
    }

    fn state_by_root(&self, root: &Hash256) -> Result<Option<BeaconState>, Error> {
        Ok(self.states.read().get(root).cloned())
    }

    fn has_state(&self, root: &Hash256) -> Result<bool, Error> {
        Ok(self.states.read().contains_key(root))
    }

    fn save_state_summary(&self, root: Hash256, summary: StateSummary) -> Result<(), Error> {
        self.state_summaries.write().insert(root, summary);
        Ok(())
    }

    fn state_summary(&self, root: &Hash256) -> Result<Option<StateSummary>, Error> {
        Ok(self.state_summaries.read().get(root).copied())
    }

    fn has_state_summary(&self, root: &Hash256) -> Result<bool, Error> {
        Ok(self.state_summaries.read().contains_key(root))
    }

    fn genesis_block(&self) -> Result<Option<SignedBeaconBlock>, Error> {
        match *self.genesis_block_root.read() {
            Some(root) => Ok(self.blocks.read().get(&root).cloned()),
            None => Ok(None),
        }
    }

    fn save_genesis_block_root(&self, root: Hash256) -> Result<(), Error> {
        *self.genesis_block_root.write() = Some(root);
        Ok(())
    }

    fn genesis_block_root(&self) -> Result<Option<Hash256>, Error> {
        Ok(*self.genesis_block_root.read())
    }

    fn justified_checkpoint(&self) -> Result<Option<Checkpoint>, Error> {
        Ok(*self.justified_checkpoint.read())
    }

    fn save_justified_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), Error> {
        *self.justified_checkpoint.write() = Some(checkpoint);
        Ok(())
    }

    fn finalized_checkpoint(&self) -> Result<Option<Checkpoint>, Error> {
        Ok(*self.finalized_checkpoint.read())
    }

    fn save_finalized_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), Error> {
        *self.finalized_checkpoint.write() = Some(checkpoint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_block() {
        let store = MemoryStore::new();
        let root = Hash256::from_low_u64_be(7);
        let block = SignedBeaconBlock {
            message: Default::default(),
            signature: types::Signature(vec![]),
        };
        store.save_block(root, block.clone()).unwrap();
        assert!(store.has_block(&root).unwrap());
        store.delete_block(&root).unwrap();
        assert!(!store.has_block(&root).unwrap());
    }

    #[test]
    fn checkpoints_persist_independently() {
        let store = MemoryStore::new();
        assert!(store.justified_checkpoint().unwrap().is_none());
        let cp = Checkpoint::new(types::Epoch::new(3), Hash256::from_low_u64_be(9));
        store.save_justified_checkpoint(cp).unwrap();
        assert_eq!(store.justified_checkpoint().unwrap(), Some(cp));
        assert!(store.finalized_checkpoint().unwrap().is_none());
    }
}
