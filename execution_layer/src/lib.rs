//! Execution Engine Adapter: a capability facade over the execution-engine JSON-RPC API. The
//! transport itself (HTTP, JWT auth, request/response JSON shapes) is deliberately out of scope;
//! this crate fixes the calls the core makes and the tagged result set it expects back.

mod engine;
mod error;
mod mock;
mod types;

pub use engine::EngineApi;
pub use error::Error;
pub use mock::{MockEngine, MockResponse};
pub use types::{
    ForkchoiceState, ForkchoiceUpdatedResponse, NewPayloadRequest, PayloadAttributes, PayloadId,
};
