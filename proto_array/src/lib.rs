//! LMD-GHOST fork choice DAG, decoupled from any one storage representation.
//!
//! [`ForkChoiceBackend`] is the contract; [`array_backend::ArrayBackend`] and
//! [`linked_backend::LinkedBackend`] are the two representations that satisfy it, and
//! [`ProtoArrayForkChoice`] is the representation-agnostic wrapper the rest of the workspace
//! actually depends on.

mod array_backend;
mod backend;
mod error;
mod fork_choice;
mod linked_backend;
mod node;

pub use array_backend::ArrayBackend;
pub use backend::ForkChoiceBackend;
pub use error::Error;
pub use fork_choice::ProtoArrayForkChoice;
pub use linked_backend::LinkedBackend;
pub use node::{BlockDescriptor, ElasticList, ValidationStatus, VoteTracker};

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Epoch, Hash256, Slot};

    fn root(n: u64) -> Hash256 {
        Hash256::from_low_u64_be(n)
    }

    fn build<B: ForkChoiceBackend>() -> ProtoArrayForkChoice<B> {
        ProtoArrayForkChoice::new(Slot::new(0), root(0), root(0), Epoch::new(0), Epoch::new(0))
    }

    fn insert_chain<B: ForkChoiceBackend>(fc: &ProtoArrayForkChoice<B>) {
        for i in 1..=3 {
            fc.process_block(BlockDescriptor {
                slot: Slot::new(i),
                root: root(i),
                parent_root: Some(root(i - 1)),
                target_root: root(0),
                state_root: root(0),
                payload_hash: Hash256::zero(),
                justified_epoch: Epoch::new(0),
                finalized_epoch: Epoch::new(0),
                weight: 0,
                validation_status: ValidationStatus::Valid,
            })
            .unwrap();
        }
    }

    fn single_chain_head_is_tip<B: ForkChoiceBackend>() {
        let fc = build::<B>();
        insert_chain(&fc);
        let head = fc.find_head(root(0), Epoch::new(0), Epoch::new(0)).unwrap();
        assert_eq!(head, root(3));
    }

    fn heavier_branch_wins<B: ForkChoiceBackend>() {
        let fc = build::<B>();
        fc.process_block(BlockDescriptor {
            slot: Slot::new(1),
            root: root(1),
            parent_root: Some(root(0)),
            target_root: root(0),
            state_root: root(0),
            payload_hash: Hash256::zero(),
            justified_epoch: Epoch::new(0),
            finalized_epoch: Epoch::new(0),
            weight: 0,
            validation_status: ValidationStatus::Valid,
        })
        .unwrap();
        fc.process_block(BlockDescriptor {
            slot: Slot::new(1),
            root: root(2),
            parent_root: Some(root(0)),
            target_root: root(0),
            state_root: root(0),
            payload_hash: Hash256::zero(),
            justified_epoch: Epoch::new(0),
            finalized_epoch: Epoch::new(0),
            weight: 0,
            validation_status: ValidationStatus::Valid,
        })
        .unwrap();

        fc.process_attestation(0, root(1), Epoch::new(1));
        fc.process_attestation(1, root(2), Epoch::new(1));
        fc.process_attestation(2, root(2), Epoch::new(1));
        fc.process_changes(&[1, 1, 1], Epoch::new(0), Epoch::new(0)).unwrap();

        let head = fc.find_head(root(0), Epoch::new(0), Epoch::new(0)).unwrap();
        assert_eq!(head, root(2));
    }

    fn proposer_boost_overrides_weight<B: ForkChoiceBackend>() {
        let fc = build::<B>();
        fc.process_block(BlockDescriptor {
            slot: Slot::new(1),
            root: root(1),
            parent_root: Some(root(0)),
            target_root: root(0),
            state_root: root(0),
            payload_hash: Hash256::zero(),
            justified_epoch: Epoch::new(0),
            finalized_epoch: Epoch::new(0),
            weight: 0,
            validation_status: ValidationStatus::Valid,
        })
        .unwrap();
        fc.process_block(BlockDescriptor {
            slot: Slot::new(1),
            root: root(2),
            parent_root: Some(root(0)),
            target_root: root(0),
            state_root: root(0),
            payload_hash: Hash256::zero(),
            justified_epoch: Epoch::new(0),
            finalized_epoch: Epoch::new(0),
            weight: 0,
            validation_status: ValidationStatus::Valid,
        })
        .unwrap();

        fc.process_attestation(0, root(2), Epoch::new(1));
        fc.process_attestation(1, root(2), Epoch::new(1));
        fc.process_changes(&[1, 1], Epoch::new(0), Epoch::new(0)).unwrap();

        fc.boost_proposer(root(1), 10);
        let head = fc.find_head(root(0), Epoch::new(0), Epoch::new(0)).unwrap();
        assert_eq!(head, root(1));

        fc.clear_proposer_boost();
        let head = fc.find_head(root(0), Epoch::new(0), Epoch::new(0)).unwrap();
        assert_eq!(head, root(2));
    }

    fn invalid_payload_removes_subtree<B: ForkChoiceBackend>() {
        let fc = build::<B>();
        insert_chain(&fc);
        let removed = fc.update_with_invalid(root(2)).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!fc.contains_block(&root(2)));
        assert!(!fc.contains_block(&root(3)));
        assert!(fc.contains_block(&root(1)));
        let head = fc.find_head(root(0), Epoch::new(0), Epoch::new(0)).unwrap();
        assert_eq!(head, root(1));
    }

    fn prune_drops_finalized_ancestors<B: ForkChoiceBackend>() {
        let fc = build::<B>();
        insert_chain(&fc);
        let removed = fc.maybe_prune(root(2)).unwrap();
        assert_eq!(removed, 2);
        assert!(!fc.contains_block(&root(0)));
        assert!(!fc.contains_block(&root(1)));
        assert!(fc.contains_block(&root(2)));
        assert!(fc.contains_block(&root(3)));
    }

    macro_rules! backend_tests {
        ($mod_name:ident, $backend:ty) => {
            mod $mod_name {
                use super::*;

                #[test]
                fn single_chain_head_is_tip() {
                    super::single_chain_head_is_tip::<$backend>();
                }

                #[test]
                fn heavier_branch_wins() {
                    super::heavier_branch_wins::<$backend>();
                }

                #[test]
                fn proposer_boost_overrides_weight() {
                    super::proposer_boost_overrides_weight::<$backend>();
                }

                #[test]
                fn invalid_payload_removes_subtree() {
                    super::invalid_payload_removes_subtree::<$backend>();
                }

                #[test]
                fn prune_drops_finalized_ancestors() {
                    super::prune_drops_finalized_ancestors::<$backend>();
                }
            }
        };
    }

    backend_tests!(array_backend, ArrayBackend);
    backend_tests!(linked_backend, LinkedBackend);
}
