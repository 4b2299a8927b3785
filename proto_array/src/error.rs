use types::{Epoch, Hash256, Slot};

#[derive(Debug, PartialEq)]
pub enum Error {
    /// The given index does not exist in the node table.
    InvalidNodeIndex(usize),
    /// The given root does not exist in the node table.
    InvalidNodeRoot(Hash256),
    InvalidParentDelta(usize),
    InvalidBestDescendant(usize),
    InvalidJustifiedIndex(usize),
    InvalidDeltaLen { deltas: usize, nodes: usize },
    DeltaOverflow(Hash256),
    IndexOverflow(&'static str),
    /// `insert` was called with a parent root that is not present in the store.
    UnknownParent(Hash256),
    /// `find_head` was asked to start from a justified root that is not present in the store.
    JustifiedNodeUnknown(Hash256),
    /// The best descendant of the justified root does not pass the viability filter; this is a
    /// logic error in the caller (e.g. justified/finalized checkpoints are stale).
    InvalidBestNode {
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        node_justified_epoch: Epoch,
        node_finalized_epoch: Epoch,
    },
    /// `maybe_prune` was asked to prune to a root not present in the store.
    FinalizedNodeUnknown(Hash256),
    /// `maybe_prune` was asked to revert to an earlier finalized epoch than the one already
    /// recorded. This would imply an un-finalization, which is forbidden.
    RevertedFinalizedEpoch {
        current_finalized_epoch: Epoch,
        new_finalized_epoch: Epoch,
    },
    /// `boost_proposer` was rejected because `seconds_into_slot` was outside the acceptance
    /// window, or `head` was asked to apply a boost whose root is no longer in the store.
    InvalidProposerBoostRoot(Hash256),
    /// `ancestor_at_slot` could not find any block at or before the given slot.
    AncestorUnknown { root: Hash256, slot: Slot },
    /// The node to mark invalid/valid is not a leaf, or some other structural precondition for
    /// the requested optimistic-sync transition was not met.
    InvalidOptimisticTransition(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
