use serde_derive::{Deserialize, Serialize};
use types::{ExecutionPayload, Hash256};

/// `engine_newPayloadV1`/`V2` request body, minus transactions/withdrawals (out of scope; see
/// the crate-level doc comment on `types::beacon_block::ExecutionPayload`).
pub type NewPayloadRequest = ExecutionPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkchoiceState {
    pub head_block_hash: Hash256,
    pub safe_block_hash: Hash256,
    pub finalized_block_hash: Hash256,
}

/// Attributes describing the payload the engine should start building, supplied only when the
/// caller is also the next slot's proposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadAttributes {
    pub timestamp: u64,
    pub prev_randao: Hash256,
    pub suggested_fee_recipient: Hash256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadId(pub [u8; 8]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkchoiceUpdatedResponse {
    pub payload_id: Option<PayloadId>,
    pub latest_valid_hash: Option<Hash256>,
}
