use types::Hash256;

/// Top-level error kind returned by the block processor, fork choice wiring, the state
/// regenerator and the attestation queue. Distinct from `fork_choice::Error`/`proto_array::Error`
/// (structural DAG failures) and `store::Error` (database failures): this is the shape callers
/// outside this core actually branch on.
#[derive(Debug)]
pub enum BeaconChainError {
    /// The block is permanently rejected. Callers must mark the sending peer for scoring and
    /// must never retry with the same bytes.
    InvalidBlock(InvalidBlockReason),
    /// The operation may succeed if retried.
    Transient(TransientReason),
    /// An operational problem outside consensus (database IO, engine misconfiguration). The core
    /// does not self-heal; an operator must intervene.
    Fatal(String),
    /// The calling context was cancelled. The caller decides whether to retry.
    Cancelled,
}

#[derive(Debug)]
pub enum InvalidBlockReason {
    NilBlock,
    BadSignature,
    NotDescendantOfFinalized { finalized_root: Hash256, parent_root: Hash256 },
    FromFuture,
    BeforeFinalized,
    ExecutionInvalid { latest_valid_hash: Hash256 },
    InvalidBlockHash,
    FailedStateTransition(String),
}

#[derive(Debug)]
pub enum TransientReason {
    MissingParentState(Hash256),
    EngineTimeout,
    EngineSyncing,
}

impl std::fmt::Display for BeaconChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for BeaconChainError {}

impl From<store::Error> for BeaconChainError {
    fn from(e: store::Error) -> Self {
        BeaconChainError::Fatal(e.to_string())
    }
}

impl From<execution_layer::Error> for BeaconChainError {
    fn from(e: execution_layer::Error) -> Self {
        match e {
            execution_layer::Error::Timeout => BeaconChainError::Transient(TransientReason::EngineTimeout),
            execution_layer::Error::AcceptedSyncing => BeaconChainError::Transient(TransientReason::EngineSyncing),
            execution_layer::Error::Invalid { latest_valid_hash } => {
                BeaconChainError::InvalidBlock(InvalidBlockReason::ExecutionInvalid { latest_valid_hash })
            }
            execution_layer::Error::InvalidBlockHash => {
                BeaconChainError::InvalidBlock(InvalidBlockReason::InvalidBlockHash)
            }
            execution_layer::Error::ConfigMismatch { message } => BeaconChainError::Fatal(message),
            execution_layer::Error::Transport(message) => BeaconChainError::Fatal(message),
            execution_layer::Error::Unknown(message) => BeaconChainError::Fatal(message),
        }
    }
}

impl<T: std::fmt::Debug> From<fork_choice::Error<T>> for BeaconChainError {
    fn from(e: fork_choice::Error<T>) -> Self {
        BeaconChainError::Fatal(format!("{:?}", e))
    }
}
