//! The block-processing and fork-choice core of a beacon-chain node: the orchestrator
//! ([`BlockProcessor`], in `block_processor`) wires together fork choice (`fork_choice`, backed
//! here by [`BeaconForkChoiceStore`]), a post-state cache with on-demand regeneration
//! (`state_cache`), a queue of attestations waiting on a block that hasn't arrived yet
//! (`attestation_queue`), the finalized-deposit ratchet an eth1 follower consumes
//! (`eth1_chain`), and a fan-out of subscriber events (`events`) behind a persistent [`Store`].
//!
//! State-transition and signature verification are modelled as external collaborators
//! ([`StateTransition`], [`SignatureVerifier`]) the caller supplies, rather than being
//! implemented in this crate: this core is the DAG/checkpoint/caching machinery around them, not
//! the consensus state-transition function itself.

mod attestation_queue;
mod block_processor;
mod chain_config;
mod errors;
mod eth1_chain;
mod events;
mod fork_choice_store;
mod state_cache;

use std::sync::Arc;

use fork_choice::ForkChoice;
use proto_array::ForkChoiceBackend;
use slog::Logger;
use store::Store;
use types::{BeaconBlock, BeaconState, ChainSpec, Hash256};

pub use attestation_queue::AttestationPendingQueue;
pub use block_processor::{BlockProcessor, SignatureVerifier};
pub use chain_config::ChainConfig;
pub use errors::{BeaconChainError, InvalidBlockReason, TransientReason};
pub use eth1_chain::FinalizedDeposits;
pub use events::{EventHandler, EventKind};
pub use fork_choice_store::BeaconForkChoiceStore;
pub use state_cache::{StateRegenerator, StateTransition};

/// Constructs a [`BlockProcessor`] either from a genesis state/block pair or by resuming against
/// whatever a [`Store`] already has persisted, mirroring the two-strategy shape of
/// `beacon_chain_builder.rs`'s `BuildStrategy`.
pub struct BeaconChainBuilder<S, E, T, V, B> {
    store: Arc<S>,
    engine: Arc<E>,
    transition: Arc<T>,
    signature_verifier: Arc<V>,
    spec: ChainSpec,
    config: ChainConfig,
    log: Logger,
    _backend: std::marker::PhantomData<B>,
}

impl<S, E, T, V, B> BeaconChainBuilder<S, E, T, V, B>
where
    S: Store,
    T: StateTransition,
    B: ForkChoiceBackend,
{
    pub fn new(store: Arc<S>, engine: Arc<E>, transition: Arc<T>, signature_verifier: Arc<V>, spec: ChainSpec, log: Logger) -> Self {
        Self {
            store,
            engine,
            transition,
            signature_verifier,
            spec,
            config: ChainConfig::default(),
            log,
            _backend: std::marker::PhantomData,
        }
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds a fresh chain from `genesis_state`/`genesis_block`, persisting both before wiring
    /// up fork choice. `genesis_block_root` is supplied by the caller rather than computed here:
    /// this core's [`BeaconBlock`] carries no `tree_hash_root`, the same reason
    /// [`BlockProcessor::process_block_batch`] takes an explicit pivot root.
    pub fn from_genesis(
        self,
        genesis_block_root: Hash256,
        genesis_block: BeaconBlock,
        genesis_state: BeaconState,
    ) -> Result<BlockProcessor<S, E, T, V, B>, String>
    where
        E: execution_layer::EngineApi,
        V: SignatureVerifier,
    {
        let signed_genesis_block = types::SignedBeaconBlock {
            message: genesis_block.clone(),
            signature: types::Signature(vec![]),
        };

        self.store
            .save_block(genesis_block_root, signed_genesis_block)
            .map_err(|e| format!("failed to persist genesis block: {:?}", e))?;
        self.store
            .save_state(genesis_block_root, genesis_state.clone())
            .map_err(|e| format!("failed to persist genesis state: {:?}", e))?;
        self.store
            .save_genesis_block_root(genesis_block_root)
            .map_err(|e| format!("failed to persist genesis root: {:?}", e))?;

        let justified_balances = genesis_state.balances.clone();
        let fc_store = BeaconForkChoiceStore::from_store(self.store.clone(), genesis_block_root, justified_balances)
            .map_err(|e| format!("failed to initialise fork choice store: {:?}", e))?;
        let fork_choice = ForkChoice::from_genesis(
            fc_store,
            genesis_block_root,
            &genesis_block,
            &genesis_state,
            self.spec.clone(),
        );

        let processor = BlockProcessor::with_config(
            self.store,
            self.engine,
            self.transition,
            self.signature_verifier,
            fork_choice,
            self.spec,
            self.config,
            self.log,
        );
        processor.state_regen().put(genesis_block_root, Arc::new(genesis_state));

        Ok(processor)
    }

    /// Resumes a chain from whatever a [`Store`] already has: the genesis root and checkpoints
    /// it was built with, plus an empty [`proto_array::ProtoArrayForkChoice`] seeded at the
    /// persisted finalized checkpoint. The caller is expected to replay blocks since that
    /// checkpoint back into fork choice (this builder only restores the bookkeeping, not the DAG).
    pub fn from_store(self, justified_balances: Vec<u64>) -> Result<BlockProcessor<S, E, T, V, B>, String>
    where
        E: execution_layer::EngineApi,
        V: SignatureVerifier,
        B: ForkChoiceBackend,
    {
        let genesis_root = self
            .store
            .genesis_block_root()
            .map_err(|e| format!("failed to read genesis root: {:?}", e))?
            .ok_or_else(|| "no genesis block in store".to_string())?;

        let fc_store = BeaconForkChoiceStore::from_store(self.store.clone(), genesis_root, justified_balances)
            .map_err(|e| format!("failed to initialise fork choice store: {:?}", e))?;
        let finalized_checkpoint = *fork_choice::ForkChoiceStore::finalized_checkpoint(&fc_store);
        let finalized_slot = finalized_checkpoint.epoch.start_slot(self.spec.slots_per_epoch);

        let proto_array = proto_array::ProtoArrayForkChoice::<B>::new(
            finalized_slot,
            finalized_checkpoint.root,
            finalized_checkpoint.root,
            finalized_checkpoint.epoch,
            finalized_checkpoint.epoch,
        );
        let fork_choice = ForkChoice::from_components(fc_store, proto_array, genesis_root, vec![], self.spec.clone());

        Ok(BlockProcessor::with_config(
            self.store,
            self.engine,
            self.transition,
            self.signature_verifier,
            fork_choice,
            self.spec,
            self.config,
            self.log,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execution_layer::{MockEngine, MockResponse};
    use proto_array::ArrayBackend;
    use slog::o;
    use store::MemoryStore;
    use types::{Signature, SignedBeaconBlock, Slot};

    struct NoopTransition;

    impl StateTransition for NoopTransition {
        fn per_slot_transition(&self, state: &mut BeaconState, target_slot: Slot, _spec: &ChainSpec) -> Result<(), String> {
            state.slot = target_slot;
            Ok(())
        }

        fn per_block_transition(&self, _state: &mut BeaconState, _block: &BeaconBlock, _spec: &ChainSpec) -> Result<(), String> {
            Ok(())
        }
    }

    struct AlwaysValid;

    impl SignatureVerifier for AlwaysValid {
        fn verify_block_signature(&self, _block: &SignedBeaconBlock, _parent_state: &BeaconState) -> Result<(), String> {
            Ok(())
        }
    }

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    #[test]
    fn builds_from_genesis_and_processes_a_child_block() {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(MockEngine::new(MockResponse::Valid));
        let spec = ChainSpec::minimal();
        let genesis_root = Hash256::from_low_u64_be(1);
        let genesis_block = BeaconBlock {
            slot: Slot::new(0),
            parent_root: Hash256::zero(),
            ..Default::default()
        };
        let genesis_state = BeaconState {
            block_roots: vec![Hash256::zero(); 8],
            ..Default::default()
        };

        let builder: BeaconChainBuilder<_, _, _, _, ArrayBackend> = BeaconChainBuilder::new(
            store,
            engine,
            Arc::new(NoopTransition),
            Arc::new(AlwaysValid),
            spec,
            test_logger(),
        );
        let processor = builder
            .from_genesis(genesis_root, genesis_block, genesis_state)
            .unwrap();

        let child_block = BeaconBlock {
            slot: Slot::new(1),
            parent_root: genesis_root,
            ..Default::default()
        };
        let child_root = Hash256::from_low_u64_be(2);
        let signed_child = SignedBeaconBlock {
            message: child_block,
            signature: Signature(vec![]),
        };

        let drained = processor
            .process_block(Slot::new(1), Some(signed_child), child_root)
            .unwrap();
        assert!(drained.is_empty());
    }
}
