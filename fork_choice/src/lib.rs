//! Beacon-chain fork choice: justified/finalized checkpoint bookkeeping, proposer boost and
//! attestation queueing layered over the representation-agnostic DAG in `proto_array`.

mod error;
mod fork_choice;
mod queued_attestation;
mod store;

pub use error::{Error, InvalidAttestation, InvalidBlock, SAFE_SLOTS_TO_UPDATE_JUSTIFIED};
pub use fork_choice::{compute_slots_since_epoch_start, ForkChoice};
pub use queued_attestation::{dequeue_attestations, QueuedAttestation};
pub use store::ForkChoiceStore;

#[cfg(test)]
mod tests {
    use super::*;
    use proto_array::ArrayBackend;
    use std::collections::HashMap;
    use types::{BeaconBlock, BeaconState, ChainSpec, Checkpoint, Epoch, Hash256, Slot};

    #[derive(Debug, PartialEq)]
    pub struct MemoryStoreError;

    struct MemoryStore {
        current_slot: Slot,
        justified_checkpoint: Checkpoint,
        justified_balances: Vec<u64>,
        best_justified_checkpoint: Checkpoint,
        previous_justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        previous_finalized_checkpoint: Checkpoint,
        ancestors: HashMap<(Hash256, Slot), Hash256>,
    }

    impl MemoryStore {
        fn new(genesis_root: Hash256, balances: Vec<u64>) -> Self {
            let checkpoint = Checkpoint::new(Epoch::new(0), genesis_root);
            Self {
                current_slot: Slot::new(0),
                justified_checkpoint: checkpoint,
                justified_balances: balances,
                best_justified_checkpoint: checkpoint,
                previous_justified_checkpoint: checkpoint,
                finalized_checkpoint: checkpoint,
                previous_finalized_checkpoint: checkpoint,
                ancestors: HashMap::new(),
            }
        }
    }

    impl ForkChoiceStore for MemoryStore {
        type Error = MemoryStoreError;

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
            Ok(())
        }

        fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
            self.best_justified_checkpoint = checkpoint;
        }

        fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint) {
            self.previous_finalized_checkpoint = self.finalized_checkpoint;
            self.finalized_checkpoint = checkpoint;
        }

        fn set_justified_checkpoint_to_best_justified_checkpoint(&mut self) -> Result<(), Self::Error> {
            self.justified_checkpoint = self.best_justified_checkpoint;
            Ok(())
        }

        fn ancestor_at_slot(&self, block_root: Hash256, ancestor_slot: Slot) -> Result<Hash256, Self::Error> {
            self.ancestors.get(&(block_root, ancestor_slot)).copied().ok_or(MemoryStoreError)
        }
    }

    fn genesis_fork_choice() -> ForkChoice<MemoryStore, ArrayBackend> {
        let genesis_root = Hash256::from_low_u64_be(1);
        let spec = ChainSpec::minimal();
        let store = MemoryStore::new(genesis_root, vec![32; 4]);
        let block = BeaconBlock {
            slot: Slot::new(0),
            ..Default::default()
        };
        let state = BeaconState::default();
        ForkChoice::from_genesis(store, genesis_root, &block, &state, spec)
    }

    #[test]
    fn genesis_head_is_genesis_root() {
        let mut fc = genesis_fork_choice();
        let head = fc.get_head(Slot::new(0)).unwrap();
        assert_eq!(head, Hash256::from_low_u64_be(1));
    }

    #[test]
    fn future_slot_block_is_rejected() {
        let mut fc = genesis_fork_choice();
        let block = BeaconBlock {
            slot: Slot::new(5),
            parent_root: Hash256::from_low_u64_be(1),
            ..Default::default()
        };
        let state = BeaconState::default();
        let root = Hash256::from_low_u64_be(2);
        let err = fc
            .on_block(Slot::new(0), &block, root, &state, proto_array::ValidationStatus::Valid)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBlock(InvalidBlock::FutureSlot { .. })));
    }
}
