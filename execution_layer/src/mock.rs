use crate::types::{ForkchoiceState, ForkchoiceUpdatedResponse, NewPayloadRequest, PayloadAttributes, PayloadId};
use crate::{EngineApi, Error};
use parking_lot::Mutex;
use std::time::Duration;
use types::Hash256;

/// Canned response a [`MockEngine`] gives to `new_payload`/`forkchoice_updated`, used by tests
/// that need to simulate `SYNCING` or `INVALID` engine behaviour without a real execution client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockResponse {
    Valid,
    Syncing,
    Invalid { latest_valid_hash: Hash256 },
}

pub struct MockEngine {
    response: Mutex<MockResponse>,
}

impl MockEngine {
    pub fn new(response: MockResponse) -> Self {
        Self {
            response: Mutex::new(response),
        }
    }

    pub fn set_response(&self, response: MockResponse) {
        *self.response.lock() = response;
    }
}

impl EngineApi for MockEngine {
    fn new_payload(&self, _payload: NewPayloadRequest, _deadline: Duration) -> Result<Option<Hash256>, Error> {
        match *self.response.lock() {
            MockResponse::Valid => Ok(None),
            MockResponse::Syncing => Err(Error::AcceptedSyncing),
            MockResponse::Invalid { latest_valid_hash } => Err(Error::Invalid { latest_valid_hash }),
        }
    }

    fn forkchoice_updated(
        &self,
        _state: ForkchoiceState,
        _attrs: Option<PayloadAttributes>,
        _deadline: Duration,
    ) -> Result<ForkchoiceUpdatedResponse, Error> {
        match *self.response.lock() {
            MockResponse::Valid => Ok(ForkchoiceUpdatedResponse {
                payload_id: None,
                latest_valid_hash: None,
            }),
            MockResponse::Syncing => Err(Error::AcceptedSyncing),
            MockResponse::Invalid { latest_valid_hash } => Err(Error::Invalid { latest_valid_hash }),
        }
    }

    fn get_payload(&self, _payload_id: PayloadId, _use_v2: bool, _deadline: Duration) -> Result<NewPayloadRequest, Error> {
        Ok(NewPayloadRequest::default())
    }

    fn exchange_transition_configuration(
        &self,
        _terminal_total_difficulty: u128,
        _terminal_block_hash: Hash256,
        _deadline: Duration,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn get_terminal_block_hash(&self, _transition_time: u64, _deadline: Duration) -> Result<Option<Hash256>, Error> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn valid_response_has_no_latest_valid_hash() {
        let engine = MockEngine::new(MockResponse::Valid);
        let result = engine.new_payload(NewPayloadRequest::default(), Duration::from_secs(1));
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn invalid_response_carries_latest_valid_hash() {
        let lvh = Hash256::from_low_u64_be(42);
        let engine = MockEngine::new(MockResponse::Invalid { latest_valid_hash: lvh });
        let result = engine.new_payload(NewPayloadRequest::default(), Duration::from_secs(1));
        assert_eq!(result, Err(Error::Invalid { latest_valid_hash: lvh }));
    }
}
