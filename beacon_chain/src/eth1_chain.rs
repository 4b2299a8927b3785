use parking_lot::RwLock;

/// Tracks how many eth1 deposits have been folded into the finalized chain. `insert_finalized_deposits`
/// is tolerant of being called more than once with the same or a lower count (e.g. a retried
/// finalization notification): the tracked count only ever moves forward.
///
/// A real `Eth1Chain` also answers `eth1_data_for_epoch` and `queued_deposits` for block
/// production; that surface lives upstream of this core's scope (block production, not block
/// processing/fork choice) so only the finalization side is kept here.
#[derive(Default)]
pub struct FinalizedDeposits {
    count: RwLock<u64>,
}

impl FinalizedDeposits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `count` deposits are now known-finalized. A `count` at or below the
    /// previously recorded value is a no-op.
    pub fn insert_finalized_deposits(&self, count: u64) {
        let mut current = self.count.write();
        if count > *current {
            *current = count;
        }
    }

    pub fn finalized_deposit_count(&self) -> u64 {
        *self.count.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_only_moves_forward() {
        let deposits = FinalizedDeposits::new();
        deposits.insert_finalized_deposits(10);
        deposits.insert_finalized_deposits(4);
        assert_eq!(deposits.finalized_deposit_count(), 10);
        deposits.insert_finalized_deposits(15);
        assert_eq!(deposits.finalized_deposit_count(), 15);
    }
}
