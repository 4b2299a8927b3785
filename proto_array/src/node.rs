use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use types::{Epoch, Hash256, Slot};

/// Whether a node's execution payload has been confirmed valid by the execution engine.
///
/// `Invalid` nodes are removed from the store as soon as they are discovered (see
/// `ForkChoiceBackend::update_with_invalid`); the variant exists on `BlockDescriptor` only so
/// snapshots taken mid-transition can still describe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum ValidationStatus {
    /// Execution payload not yet confirmed by the engine (or this is a pre-merge block, which is
    /// trivially valid).
    Optimistic,
    /// Execution payload confirmed `VALID` by the engine, as is every ancestor.
    Valid,
    /// Execution payload confirmed `INVALID`. Dead-on-arrival; such nodes are deleted rather than
    /// retained, but the tag is useful in tests and in the brief window before deletion.
    Invalid,
}

impl Default for ValidationStatus {
    fn default() -> Self {
        ValidationStatus::Optimistic
    }
}

/// A block as known to fork choice: the subset of a beacon block's fields the DAG needs in order
/// to weigh, order and filter candidate heads. Exposed across the public boundary in place of
/// any internal node handle/index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BlockDescriptor {
    pub slot: Slot,
    pub root: Hash256,
    pub parent_root: Option<Hash256>,
    /// Root of the block at the start of `slot`'s epoch (i.e. the LMD-GHOST target this block
    /// itself votes for). Equal to `root` when `slot` is itself an epoch-boundary slot.
    pub target_root: Hash256,
    pub state_root: Hash256,
    /// Zero pre-merge. Used only to correlate fork choice with engine `latest_valid_hash`
    /// responses; fork choice itself never inspects the bytes otherwise.
    pub payload_hash: Hash256,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
    pub weight: u64,
    pub validation_status: ValidationStatus,
}

/// Per-validator LMD-GHOST vote, tracking both the currently-applied vote and a pending vote
/// that takes effect once `process_deltas` is next called (mirrors the spec's `latest_messages`
/// two-phase update so that a validator's weight is never double counted mid-epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
pub struct VoteTracker {
    pub current_root: Hash256,
    pub next_root: Hash256,
    pub next_epoch: Epoch,
}

/// A `Vec` that lazily grows to accommodate indices past its current length, defaulting new
/// slots to `T::default()`. Used to store one `VoteTracker` per validator index without requiring
/// the caller to pre-size the vector to the validator registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ElasticList<T>(pub Vec<T>);

impl<T> ElasticList<T>
where
    T: Default + Clone,
{
    pub fn get_mut(&mut self, i: usize) -> &mut T {
        if self.0.len() <= i {
            self.0.resize(i + 1, T::default());
        }
        &mut self.0[i]
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        self.0.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<T> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
