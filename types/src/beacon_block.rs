use crate::Hash256;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The fork of the beacon chain a block belongs to. Determines which optional fields of the
/// block body are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ForkName {
    Base,
    Altair,
    Bellatrix,
    Capella,
}

impl ForkName {
    pub fn is_post_merge(&self) -> bool {
        matches!(self, ForkName::Bellatrix | ForkName::Capella)
    }

    pub fn is_post_capella(&self) -> bool {
        matches!(self, ForkName::Capella)
    }
}

impl Default for ForkName {
    fn default() -> Self {
        ForkName::Base
    }
}

/// The minimal slice of an execution payload that fork choice and the engine adapter need.
/// Transaction and withdrawal lists are intentionally omitted as this core never inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct ExecutionPayload {
    pub parent_hash: Hash256,
    pub block_hash: Hash256,
    pub block_number: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttesterSlashing {
    pub attestation_1_indices: Vec<u64>,
    pub attestation_2_indices: Vec<u64>,
}

/// A single proposer-signed beacon block.
///
/// Real Phase0/Altair/Bellatrix/Capella blocks differ in their body's optional fields (sync
/// committee aggregates, execution payload, BLS-to-execution changes, ...); fork choice and block
/// processing only ever need the handful of fields exposed here, so rather than a generic
/// tagged-union body we keep a single struct with an `Option<ExecutionPayload>` and a `fork` tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeaconBlock {
    pub slot: crate::Slot,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub fork_name: ForkName,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub execution_payload: Option<ExecutionPayload>,
}

impl BeaconBlock {
    /// `true` if this block carries an execution payload (i.e. it is Bellatrix or later) *and*
    /// that payload is non-empty (i.e. it is not the payload-less "transition block" body used
    /// pre-merge by the spec's `is_merge_transition_block` edge case).
    pub fn has_execution_payload(&self) -> bool {
        self.execution_payload
            .as_ref()
            .map_or(false, |p| *p != ExecutionPayload::default())
    }
}

/// An opaque BLS signature. Verification is a pure function supplied by the caller (see
/// `SignatureVerifier` in `beacon_chain::block_processor`); this core never inspects the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Signature(pub Vec<u8>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: Signature,
}

impl SignedBeaconBlock {
    pub fn slot(&self) -> crate::Slot {
        self.message.slot
    }

    pub fn parent_root(&self) -> Hash256 {
        self.message.parent_root
    }
}
