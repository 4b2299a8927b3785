use serde_derive::{Deserialize, Serialize};

/// Network-parameter singletons collected into a single, explicitly-constructed value.
///
/// The upstream client used to scatter these across global `lazy_static!` singletons and
/// feature-flagged constants; here they are plain configuration passed into the core's
/// constructors so that two independently-configured chains never share mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    /// Number of sub-divisions of a slot used to time attestation/aggregation/proposer-boost
    /// deadlines, e.g. `3` splits a slot into [propose, attest, aggregate].
    pub intervals_per_slot: u64,
    /// Tolerance (in slots) for blocks/attestations that arrive slightly ahead of the local
    /// clock, to absorb peer clock drift.
    pub maximum_gossip_clock_disparity_slots: u64,
    /// `SAFE_SLOTS_TO_UPDATE_JUSTIFIED` from the fork-choice spec.
    pub safe_slots_to_update_justified: u64,
    /// Deposits are only considered "safe" to finalize once they are this many eth1 blocks old.
    pub eth1_follow_distance_deposits: u64,
    /// Maximum number of slots that may be skipped when importing a block or attestation.
    pub import_max_skip_slots: Option<u64>,
    /// `PROPOSER_SCORE_BOOST`: percentage of the total active balance granted as transient
    /// weight to a timely block's root during its slot.
    pub proposer_score_boost: u64,
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl ChainSpec {
    /// Mirrors the mainnet configuration values used by the upstream client.
    pub fn mainnet() -> Self {
        Self {
            seconds_per_slot: 12,
            slots_per_epoch: 32,
            intervals_per_slot: 3,
            maximum_gossip_clock_disparity_slots: 1,
            safe_slots_to_update_justified: 8,
            eth1_follow_distance_deposits: 2048,
            import_max_skip_slots: Some(700),
            proposer_score_boost: 40,
        }
    }

    /// A specification useful for minimal/interop testnets, with a shorter epoch length.
    pub fn minimal() -> Self {
        Self {
            slots_per_epoch: 8,
            ..Self::mainnet()
        }
    }

    /// Duration, in seconds, of the proposer-boost acceptance window within a slot.
    pub fn proposer_boost_window_seconds(&self) -> u64 {
        self.seconds_per_slot / self.intervals_per_slot
    }
}
