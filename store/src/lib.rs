//! The persistent-store capability the block processor and fork choice consume.
//!
//! Grounded on the `Store` trait boundary implied by `beacon_chain_builder.rs`'s `BeaconStore`
//! bound and `events.rs`'s separation of in-memory chain state from disk state: the database's
//! physical layout (LevelDB/sled/whatever) is an external collaborator, this crate only fixes the
//! shape of the calls the core makes against it, plus a simple in-memory implementation used by
//! tests and by `beacon_chain` before a real backing store is wired in.

mod error;
mod memory_store;

pub use error::Error;
pub use memory_store::MemoryStore;

use types::{BeaconState, Checkpoint, Hash256, SignedBeaconBlock, Slot};

/// `{slot, root}` pointer to a state whose full snapshot may not be cached, used so fork choice
/// and the regenerator can resolve an ancestor's slot without paying for a full state load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSummary {
    pub slot: Slot,
    pub root: Hash256,
}

/// Capability set consumed by the block processor and fork choice. Implementations must treat
/// `save_*` as idempotent (the core may call them more than once for the same key) and reads as
/// safe to perform concurrently with writes to unrelated keys.
pub trait Store: Send + Sync {
    fn save_block(&self, root: Hash256, block: SignedBeaconBlock) -> Result<(), Error>;

    fn block_by_root(&self, root: &Hash256) -> Result<Option<SignedBeaconBlock>, Error>;

    fn has_block(&self, root: &Hash256) -> Result<bool, Error>;

    fn delete_block(&self, root: &Hash256) -> Result<(), Error>;

    fn save_state(&self, root: Hash256, state: BeaconState) -> Result<(), Error>;

    fn state_by_root(&self, root: &Hash256) -> Result<Option<BeaconState>, Error>;

    fn has_state(&self, root: &Hash256) -> Result<bool, Error>;

    fn save_state_summary(&self, root: Hash256, summary: StateSummary) -> Result<(), Error>;

    fn state_summary(&self, root: &Hash256) -> Result<Option<StateSummary>, Error>;

    fn has_state_summary(&self, root: &Hash256) -> Result<bool, Error>;

    fn genesis_block(&self) -> Result<Option<SignedBeaconBlock>, Error>;

    fn save_genesis_block_root(&self, root: Hash256) -> Result<(), Error>;

    fn genesis_block_root(&self) -> Result<Option<Hash256>, Error>;

    fn justified_checkpoint(&self) -> Result<Option<Checkpoint>, Error>;

    fn save_justified_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), Error>;

    fn finalized_checkpoint(&self) -> Result<Option<Checkpoint>, Error>;

    fn save_finalized_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), Error>;
}
