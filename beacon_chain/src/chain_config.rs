/// Default maximum number of slots to skip when importing a block.
///
/// When this value is exceeded, we will assume that it's faster to drop state history and
/// re-compute it after the fact, rather than keeping it around for the (unlikely) event we revert
/// past it.
const DEFAULT_IMPORT_BLOCK_MAX_SKIP_SLOTS: u64 = 700;

/// Tunable behaviour of a running `BeaconChain`, distinct from the immutable `ChainSpec`: these
/// are operational knobs an operator might reasonably change between runs of the same chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    /// Maximum number of skipped slots before we consider using a different strategy to
    /// permission the database. `None` imposes no limit.
    pub import_max_skip_slots: Option<u64>,
    /// Maximum number of blocks applied in one call to `BeaconChain::process_block_batch`.
    pub max_block_batch_size: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            import_max_skip_slots: Some(DEFAULT_IMPORT_BLOCK_MAX_SKIP_SLOTS),
            max_block_batch_size: 64,
        }
    }
}
