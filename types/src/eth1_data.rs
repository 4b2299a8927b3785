use crate::Hash256;
use serde_derive::{Deserialize, Serialize};

/// A validator deposit observed on the eth1 chain, not yet included in a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eth1Deposit {
    /// Index of this deposit in the canonical deposit-contract Merkle tree.
    pub index: u64,
    /// Height of the eth1 block in which this deposit log was observed.
    pub eth1_block_height: u64,
    pub pubkey: Vec<u8>,
    pub withdrawal_credentials: Hash256,
    pub amount: u64,
}
