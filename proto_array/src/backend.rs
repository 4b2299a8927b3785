use crate::node::{BlockDescriptor, ValidationStatus};
use crate::Error;
use std::collections::HashMap;
use types::{Epoch, Hash256, Slot};

/// The DAG operations fork choice needs, independent of how the DAG happens to be stored.
///
/// Two implementations exist: [`crate::array_backend::ArrayBackend`] (a flat `Vec<ProtoNode>`
/// indexed by a root->index map, mirroring the upstream `proto_array` crate) and
/// [`crate::linked_backend::LinkedBackend`] (an arena of `Rc<RefCell<Node>>` with parent
/// back-pointers). Neither representation's internal handles ever cross this trait boundary —
/// every method takes and returns `Hash256` roots, so callers cannot become coupled to one
/// implementation's indexing scheme.
pub trait ForkChoiceBackend: Sized {
    /// Construct a backend whose only node is the finalized checkpoint block.
    fn new(
        finalized_block_slot: Slot,
        finalized_root: Hash256,
        finalized_target_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Self;

    /// Insert a new block. `desc.parent_root` must already be present, unless this is the
    /// finalized root itself (in which case `insert` is a no-op returning `Ok`).
    fn insert(&mut self, desc: BlockDescriptor) -> Result<(), Error>;

    /// Apply LMD-GHOST weight deltas (positive or negative) keyed by root, then back-propagate
    /// each node's subtree weight to its parent and recompute `best_child`/`best_descendant`
    /// along every affected path. `deltas` need not mention every node; absent roots are treated
    /// as zero delta.
    fn apply_score_changes(
        &mut self,
        deltas: &HashMap<Hash256, i64>,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error>;

    /// Walk from `justified_root` via `best_descendant` to the current canonical head.
    ///
    /// `proposer_boost` is an optional `(root, boost_weight)` pair; if present, `root`'s weight is
    /// treated as if increased by `boost_weight` for the purposes of this single call only (the
    /// backend does not persist it).
    fn find_head(
        &self,
        justified_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        proposer_boost: Option<(Hash256, u64)>,
    ) -> Result<Hash256, Error>;

    /// Find the ancestor of `root` at `slot`, or the closest descendant-of-that-slot ancestor if
    /// no block exists exactly at `slot` (mirrors `get_ancestor`'s skip-slot handling).
    fn ancestor_at_slot(&self, root: Hash256, slot: Slot) -> Result<Hash256, Error>;

    /// Mark `root` and every ancestor up to (and not including) the nearest already-`Valid`
    /// ancestor as `Valid`.
    fn update_with_valid(&mut self, root: Hash256) -> Result<(), Error>;

    /// Mark `root` invalid and delete it along with every descendant, subtracting their weight
    /// from surviving ancestors. Returns the roots removed.
    fn update_with_invalid(&mut self, root: Hash256) -> Result<Vec<Hash256>, Error>;

    /// Drop nodes at or before the finalized root's parent, re-indexing internal storage. Returns
    /// the number of nodes removed.
    fn maybe_prune(&mut self, finalized_root: Hash256) -> Result<usize, Error>;

    fn contains_block(&self, root: &Hash256) -> bool;

    fn get_block(&self, root: &Hash256) -> Option<BlockDescriptor>;

    fn validation_status(&self, root: &Hash256) -> Option<ValidationStatus>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
