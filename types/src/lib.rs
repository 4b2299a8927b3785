//! Shared data types for the beacon-chain block-processing and fork-choice core.
//!
//! This crate intentionally excludes SSZ-tree validator-registry state, BLS cryptography and
//! wire-format gossip types: those are external collaborators (see the workspace's top-level
//! design notes). What remains is the handful of types that fork choice, the block processor,
//! the state cache and the attestation queue actually pass between each other.

mod attestation;
mod beacon_block;
mod beacon_state;
mod chain_spec;
mod checkpoint;
mod eth1_data;
mod hash256;
mod slot_epoch;

pub use attestation::{AttestationData, IndexedAttestation, SignedAggregateAttestation};
pub use beacon_block::{
    AttesterSlashing, BeaconBlock, ExecutionPayload, ForkName, SignedBeaconBlock, Signature,
};
pub use beacon_state::{BeaconState, BeaconStateError};
pub use chain_spec::ChainSpec;
pub use checkpoint::Checkpoint;
pub use eth1_data::Eth1Deposit;
pub use hash256::Hash256;
pub use slot_epoch::{Epoch, Slot};
