use crate::{Checkpoint, Hash256, Slot};
use serde_derive::{Deserialize, Serialize};

/// The post-state produced by applying a block's state transition.
///
/// The real client's `BeaconState` is a multi-megabyte SSZ tree covering validator registries,
/// randomness, slashings, etc. Fork choice and block processing only ever read the handful of
/// fields below; everything else is produced and consumed entirely inside the state-transition
/// function, which this core treats as an opaque pure function (see `StateTransition`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeaconState {
    pub slot: Slot,
    pub genesis_validators_root: Hash256,
    pub current_justified_checkpoint: Checkpoint,
    pub previous_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    /// Effective balances, indexed by validator index. Used by fork choice to weight votes.
    pub balances: Vec<u64>,
    /// Ring buffer of recent block roots, indexed by `slot % block_roots.len()`. Used to resolve
    /// `get_block_root` for epoch-boundary target roots.
    pub block_roots: Vec<Hash256>,
    pub eth1_deposit_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconStateError {
    pub message: String,
}

impl BeaconStateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BeaconStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BeaconStateError {}

impl BeaconState {
    pub fn current_epoch(&self, slots_per_epoch: u64) -> crate::Epoch {
        self.slot.epoch(slots_per_epoch)
    }

    /// Returns the block root at `slot`, per the spec's `get_block_root_at_slot`.
    pub fn get_block_root(&self, slot: Slot) -> Result<Hash256, BeaconStateError> {
        if self.block_roots.is_empty() {
            return Err(BeaconStateError::new("state has no block root history"));
        }
        let len = self.block_roots.len() as u64;
        if slot.as_u64() >= self.slot.as_u64() || self.slot.as_u64() > slot.as_u64() + len {
            return Err(BeaconStateError::new(format!(
                "slot {} out of range for state at slot {}",
                slot, self.slot
            )));
        }
        Ok(self.block_roots[(slot.as_u64() % len) as usize])
    }
}
