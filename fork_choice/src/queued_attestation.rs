use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use types::{Epoch, Hash256, IndexedAttestation, Slot};

/// Used for queuing attestations from the current slot. Only contains the minimum necessary
/// information about the attestation (i.e., it is simplified).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct QueuedAttestation {
    pub slot: Slot,
    pub attesting_indices: Vec<u64>,
    pub block_root: Hash256,
    pub target_epoch: Epoch,
}

impl From<&IndexedAttestation> for QueuedAttestation {
    fn from(a: &IndexedAttestation) -> Self {
        Self {
            slot: a.data.slot,
            attesting_indices: a.attesting_indices.clone(),
            block_root: a.data.beacon_block_root,
            target_epoch: a.target_epoch(),
        }
    }
}

/// Returns all values in `queued_attestations` with a slot earlier than `current_slot`, removing
/// them from the input in place.
pub fn dequeue_attestations(
    current_slot: Slot,
    queued_attestations: &mut Vec<QueuedAttestation>,
) -> Vec<QueuedAttestation> {
    let remaining = queued_attestations.split_off(
        queued_attestations
            .iter()
            .position(|a| a.slot >= current_slot)
            .unwrap_or(queued_attestations.len()),
    );

    std::mem::replace(queued_attestations, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(slot: u64) -> QueuedAttestation {
        QueuedAttestation {
            slot: Slot::new(slot),
            attesting_indices: vec![0],
            block_root: Hash256::zero(),
            target_epoch: Epoch::new(0),
        }
    }

    #[test]
    fn dequeues_only_past_slots() {
        let mut queue = vec![dummy(1), dummy(2), dummy(3)];
        let dequeued = dequeue_attestations(Slot::new(3), &mut queue);
        assert_eq!(dequeued.len(), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].slot, Slot::new(3));
    }
}
