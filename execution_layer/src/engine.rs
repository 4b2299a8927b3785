use crate::types::{ForkchoiceState, ForkchoiceUpdatedResponse, NewPayloadRequest, PayloadAttributes, PayloadId};
use crate::Error;
use std::time::Duration;
use types::Hash256;

/// The execution-engine JSON-RPC transport is an external collaborator (see the crate-level
/// design notes); this trait fixes only the capability set the block processor and fork choice
/// drive it through. `deadline` is the per-call timeout the spec requires; an implementation that
/// exceeds it must return [`Error::Timeout`] rather than blocking indefinitely.
pub trait EngineApi {
    /// `engine_newPayloadV1`/`V2`. Returns the engine's latest-valid-hash only when that field
    /// was present in the response (it is absent on `VALID`).
    fn new_payload(&self, payload: NewPayloadRequest, deadline: Duration) -> Result<Option<Hash256>, Error>;

    /// `engine_forkchoiceUpdatedV1`/`V2`. `attrs` is `None` unless the caller is building the
    /// next slot's payload.
    fn forkchoice_updated(
        &self,
        state: ForkchoiceState,
        attrs: Option<PayloadAttributes>,
        deadline: Duration,
    ) -> Result<ForkchoiceUpdatedResponse, Error>;

    /// `engine_getPayloadV1`/`V2`, selected by whether `slot` falls at or after the Capella fork
    /// epoch (the caller supplies that boundary; this trait does not know fork schedules).
    fn get_payload(&self, payload_id: PayloadId, use_v2: bool, deadline: Duration) -> Result<NewPayloadRequest, Error>;

    /// `engine_exchangeTransitionConfigurationV1`. Compares the engine's terminal total
    /// difficulty and terminal block hash against ours; mismatch is `Error::ConfigMismatch`.
    fn exchange_transition_configuration(
        &self,
        terminal_total_difficulty: u128,
        terminal_block_hash: Hash256,
        deadline: Duration,
    ) -> Result<(), Error>;

    /// Walks the PoW chain backward from the engine's latest block until a block reaches the
    /// configured terminal total difficulty whose parent does not. Returns `(hash, true)` only if
    /// that block's timestamp is strictly before `transition_time`; otherwise `(_, false)`, since
    /// the merge has not yet been reached on-schedule.
    fn get_terminal_block_hash(&self, transition_time: u64, deadline: Duration) -> Result<Option<Hash256>, Error>;
}
