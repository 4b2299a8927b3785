use types::Hash256;

/// The core's tagged view of an engine response, independent of which JSON-RPC method produced
/// it. Mirrors the five-way `PayloadStatus` the upstream engine API defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `INVALID_BLOCK_HASH`: the payload's claimed hash doesn't match its contents.
    InvalidBlockHash,
    /// `SYNCING` or `ACCEPTED`: the engine cannot yet judge validity; proceed optimistically.
    AcceptedSyncing,
    /// `INVALID`, carrying the engine's latest-valid-hash so the caller can roll fork choice
    /// back to it.
    Invalid { latest_valid_hash: Hash256 },
    /// The engine returned a status this core does not recognise.
    Unknown(String),
    /// The call did not complete inside its deadline. Retriable at the caller's discretion.
    Timeout,
    /// Local configuration (terminal total difficulty, terminal block hash) does not match the
    /// engine's. Operator must intervene; never self-heals.
    ConfigMismatch { message: String },
    /// Transport-level failure (connection refused, malformed JSON-RPC envelope, ...).
    Transport(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
