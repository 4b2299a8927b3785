use types::{Checkpoint, Hash256, Slot};

/// The external state fork choice needs but does not itself own: the wall-clock slot and the
/// justified/finalized checkpoint quadruple. A beacon-chain implementation supplies this (backed
/// by its `BeaconState`/`Store`); fork choice only ever reads and writes through this trait, so
/// it has no dependency on how checkpoints are actually derived or persisted.
///
/// Modelled on the `ForkChoiceStore` trait consumed by `fork_choice.rs` in the source this crate
/// is adapted from.
pub trait ForkChoiceStore {
    type Error: std::fmt::Debug;

    fn get_current_slot(&self) -> Slot;

    fn set_current_slot(&mut self, slot: Slot);

    fn justified_checkpoint(&self) -> &Checkpoint;

    fn justified_balances(&self) -> &[u64];

    fn best_justified_checkpoint(&self) -> &Checkpoint;

    fn previous_justified_checkpoint(&self) -> &Checkpoint;

    fn finalized_checkpoint(&self) -> &Checkpoint;

    fn previous_finalized_checkpoint(&self) -> &Checkpoint;

    fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint) -> Result<(), Self::Error>;

    fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint);

    fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint);

    fn set_justified_checkpoint_to_best_justified_checkpoint(&mut self) -> Result<(), Self::Error>;

    /// Resolve the ancestor of `block_root` at `ancestor_slot`, consulting whatever persistent
    /// store or state this implementation has access to once fork choice's own DAG no longer
    /// holds the block (i.e. it has been pruned).
    fn ancestor_at_slot(&self, block_root: Hash256, ancestor_slot: Slot) -> Result<Hash256, Self::Error>;
}
