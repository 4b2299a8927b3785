//! `Slot` and `Epoch` newtypes, as defined in the phase0 spec:
//!
//! https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/beacon-chain.md#custom-types

use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use std::fmt;
use std::ops::{Add, Sub};
use tree_hash_derive::TreeHash;

macro_rules! impl_u64_wrapper {
    ($name: ident) => {
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize, Encode, Decode, TreeHash,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(n: u64) -> Self {
                Self(n)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn saturating_sub(&self, other: impl Into<Self>) -> Self {
                Self(self.0.saturating_sub(other.into().0))
            }

            pub fn saturating_add(&self, other: impl Into<Self>) -> Self {
                Self(self.0.saturating_add(other.into().0))
            }

            pub fn checked_sub(&self, other: impl Into<Self>) -> Option<Self> {
                self.0.checked_sub(other.into().0).map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self(n)
            }
        }

        impl From<$name> for u64 {
            fn from(n: $name) -> u64 {
                n.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<T: Into<$name>> Add<T> for $name {
            type Output = Self;

            fn add(self, other: T) -> Self {
                Self(self.0 + other.into().0)
            }
        }

        impl<T: Into<$name>> Sub<T> for $name {
            type Output = Self;

            fn sub(self, other: T) -> Self {
                Self(self.0 - other.into().0)
            }
        }
    };
}

impl_u64_wrapper!(Slot);
impl_u64_wrapper!(Epoch);

impl Slot {
    /// Returns the epoch that this slot falls within, given `slots_per_epoch`.
    pub fn epoch(&self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0 / slots_per_epoch)
    }

    /// Returns the number of slots that have elapsed since the start of `self`'s epoch.
    pub fn slots_since_epoch_start(&self, slots_per_epoch: u64) -> Slot {
        *self - self.epoch(slots_per_epoch).start_slot(slots_per_epoch)
    }

    /// The slot used to alias "unknown" or "far future" slots.
    pub fn far_future() -> Self {
        Self(u64::max_value())
    }
}

impl Epoch {
    /// Returns the first slot in `self`.
    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_of_slot() {
        assert_eq!(Slot::new(0).epoch(8), Epoch::new(0));
        assert_eq!(Slot::new(7).epoch(8), Epoch::new(0));
        assert_eq!(Slot::new(8).epoch(8), Epoch::new(1));
        assert_eq!(Slot::new(23).epoch(8), Epoch::new(2));
    }

    #[test]
    fn start_slot_of_epoch() {
        assert_eq!(Epoch::new(0).start_slot(8), Slot::new(0));
        assert_eq!(Epoch::new(1).start_slot(8), Slot::new(8));
        assert_eq!(Epoch::new(3).start_slot(8), Slot::new(24));
    }

    #[test]
    fn slots_since_epoch_start() {
        for epoch in 0..3u64 {
            for slot in 0..8u64 {
                let input = epoch * 8 + slot;
                assert_eq!(Slot::new(input).slots_since_epoch_start(8), Slot::new(slot));
            }
        }
    }
}
