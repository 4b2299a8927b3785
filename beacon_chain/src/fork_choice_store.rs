use std::sync::Arc;

use fork_choice::ForkChoiceStore;
use store::Store;
use types::{Checkpoint, Epoch, Hash256, Slot};

/// Backs [`ForkChoiceStore`] with a persistent [`Store`]: checkpoint setters write through
/// immediately, and `ancestor_at_slot` falls back to walking parent pointers on disk for roots
/// `proto_array` has already pruned away.
#[derive(Debug)]
pub enum Error {
    Store(store::Error),
    MissingAncestor(Hash256),
}

impl From<store::Error> for Error {
    fn from(e: store::Error) -> Self {
        Error::Store(e)
    }
}

pub struct BeaconForkChoiceStore<S> {
    store: Arc<S>,
    current_slot: Slot,
    justified_checkpoint: Checkpoint,
    justified_balances: Vec<u64>,
    best_justified_checkpoint: Checkpoint,
    previous_justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
    previous_finalized_checkpoint: Checkpoint,
}

impl<S: Store> BeaconForkChoiceStore<S> {
    /// Loads the justified/finalized checkpoints from `store` if present, otherwise initialises
    /// both to the genesis checkpoint (epoch 0, `genesis_root`).
    pub fn from_store(
        store: Arc<S>,
        genesis_root: Hash256,
        justified_balances: Vec<u64>,
    ) -> Result<Self, Error> {
        let genesis_checkpoint = Checkpoint::new(Epoch::new(0), genesis_root);

        let justified_checkpoint = store.justified_checkpoint()?.unwrap_or(genesis_checkpoint);
        let finalized_checkpoint = store.finalized_checkpoint()?.unwrap_or(genesis_checkpoint);

        Ok(Self {
            store,
            current_slot: Slot::new(0),
            justified_checkpoint,
            justified_balances,
            best_justified_checkpoint: justified_checkpoint,
            previous_justified_checkpoint: justified_checkpoint,
            finalized_checkpoint,
            previous_finalized_checkpoint: finalized_checkpoint,
        })
    }

    pub fn set_justified_balances(&mut self, balances: Vec<u64>) {
        self.justified_balances = balances;
    }
}

impl<S: Store> ForkChoiceStore for BeaconForkChoiceStore<S> {
    type Error = Error;

    fn get_current_slot(&self) -> Slot {
        self.current_slot
    }

    fn set_current_slot(&mut self, slot: Slot) {
        self.current_slot = slot;
    }

    fn justified_checkpoint(&self) -> &Checkpoint {
        &self.justified_checkpoint
    }

    fn justified_balances(&self) -> &[u64] {
        &self.justified_balances
    }

    fn best_justified_checkpoint(&self) -> &Checkpoint {
        &self.best_justified_checkpoint
    }

    fn previous_justified_checkpoint(&self) -> &Checkpoint {
        &self.previous_justified_checkpoint
    }

    fn finalized_checkpoint(&self) -> &Checkpoint {
        &self.finalized_checkpoint
    }

    fn previous_finalized_checkpoint(&self) -> &Checkpoint {
        &self.previous_finalized_checkpoint
    }

    fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint) -> Result<(), Self::Error> {
        self.previous_justified_checkpoint = self.justified_checkpoint;
        self.justified_checkpoint = checkpoint;
        self.store.save_justified_checkpoint(checkpoint)?;
        Ok(())
    }

    fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.best_justified_checkpoint = checkpoint;
    }

    fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.previous_finalized_checkpoint = self.finalized_checkpoint;
        self.finalized_checkpoint = checkpoint;
        // A failure here would leave the in-memory and on-disk finalized checkpoints
        // inconsistent; the block processor treats `Store` errors as fatal, so we accept the
        // panic-free best effort here and let the next `save_finalized_checkpoint` catch up.
        let _ = self.store.save_finalized_checkpoint(checkpoint);
    }

    fn set_justified_checkpoint_to_best_justified_checkpoint(&mut self) -> Result<(), Self::Error> {
        self.justified_checkpoint = self.best_justified_checkpoint;
        self.store.save_justified_checkpoint(self.justified_checkpoint)?;
        Ok(())
    }

    fn ancestor_at_slot(&self, block_root: Hash256, ancestor_slot: Slot) -> Result<Hash256, Self::Error> {
        let mut root = block_root;
        loop {
            let block = self
                .store
                .block_by_root(&root)?
                .ok_or(Error::MissingAncestor(root))?;

            if block.message.slot <= ancestor_slot {
                return Ok(root);
            }

            root = block.message.parent_root;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStore;
    use types::{BeaconBlock, SignedBeaconBlock, Signature};

    fn block(slot: u64, parent_root: Hash256) -> SignedBeaconBlock {
        SignedBeaconBlock {
            message: BeaconBlock {
                slot: Slot::new(slot),
                parent_root,
                ..Default::default()
            },
            signature: Signature(vec![]),
        }
    }

    #[test]
    fn walks_back_to_ancestor_slot() {
        let store = Arc::new(MemoryStore::new());
        let genesis_root = Hash256::from_low_u64_be(1);
        store.save_block(genesis_root, block(0, Hash256::zero())).unwrap();
        let mid_root = Hash256::from_low_u64_be(2);
        store.save_block(mid_root, block(5, genesis_root)).unwrap();
        let tip_root = Hash256::from_low_u64_be(3);
        store.save_block(tip_root, block(10, mid_root)).unwrap();

        let fcs = BeaconForkChoiceStore::from_store(store, genesis_root, vec![]).unwrap();

        assert_eq!(fcs.ancestor_at_slot(tip_root, Slot::new(7)).unwrap(), mid_root);
        assert_eq!(fcs.ancestor_at_slot(tip_root, Slot::new(0)).unwrap(), genesis_root);
    }
}
