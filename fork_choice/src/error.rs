use types::{Epoch, Hash256, Slot};

/// Defined here:
///
/// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#configuration
pub const SAFE_SLOTS_TO_UPDATE_JUSTIFIED: u64 = 8;

#[derive(Debug)]
pub enum Error<T> {
    InvalidAttestation(InvalidAttestation),
    InvalidBlock(InvalidBlock),
    ProtoArrayError(proto_array::Error),
    MissingProtoArrayBlock(Hash256),
    InconsistentOnTick { previous_slot: Slot, time: Slot },
    ForkChoiceStoreError(T),
    UnableToSetJustifiedCheckpoint(T),
    AfterBlockFailed(T),
}

impl<T> From<InvalidAttestation> for Error<T> {
    fn from(e: InvalidAttestation) -> Self {
        Error::InvalidAttestation(e)
    }
}

impl<T> From<proto_array::Error> for Error<T> {
    fn from(e: proto_array::Error) -> Self {
        Error::ProtoArrayError(e)
    }
}

#[derive(Debug)]
pub enum InvalidBlock {
    FutureSlot { present_slot: Slot, block_slot: Slot },
    BeforeFinalized { finalized_slot: Slot, block_slot: Slot },
    NotDescendantOfFinalized { finalized_root: Hash256, block_parent_root: Hash256 },
    ExecutionInvalid { latest_valid_hash: Hash256 },
    InvalidBlockHash,
}

#[derive(Debug)]
pub enum InvalidAttestation {
    EmptyAggregationBitfield,
    UnknownHeadBlock { beacon_block_root: Hash256 },
    BadTargetEpoch,
    UnknownTargetRoot(Hash256),
    FutureEpoch { attestation_epoch: Epoch, current_epoch: Epoch },
    PastEpoch { attestation_epoch: Epoch, current_epoch: Epoch },
    InvalidTarget { attestation: Hash256, block: Hash256 },
    AttestsToFutureBlock { block: Slot, attestation: Slot },
}
