use crate::{Checkpoint, Epoch, Hash256, Slot};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: u64,
    pub beacon_block_root: Hash256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

/// An attestation that has already been resolved to validator indices (as opposed to an
/// aggregation bitfield over a committee). This is the form consumed by fork choice; committee
/// resolution and signature verification happen upstream, outside this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct IndexedAttestation {
    pub attesting_indices: Vec<u64>,
    pub data: AttestationData,
}

impl IndexedAttestation {
    pub fn target_epoch(&self) -> Epoch {
        self.data.target.epoch
    }
}

/// A single-aggregate, unverified attestation as received from gossip/API, before committee
/// resolution. Kept minimal: the queue only needs enough information to key and expire entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedAggregateAttestation {
    pub aggregator_index: u64,
    pub data: AttestationData,
    /// `true` if this aggregate carries more than one attesting index (already aggregated),
    /// `false` if it is a single-validator attestation awaiting aggregation.
    pub is_aggregated: bool,
}
