use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use proto_array::ForkChoiceBackend;
use slog::{debug, error, info, Logger};
use types::{
    BeaconBlock, BeaconState, ChainSpec, Hash256, SignedAggregateAttestation, SignedBeaconBlock,
    Slot,
};

use execution_layer::{EngineApi, Error as EngineError, ForkchoiceState, NewPayloadRequest};
use fork_choice::{ForkChoice, ForkChoiceStore};
use proto_array::ValidationStatus;
use store::{StateSummary, Store};

use crate::attestation_queue::AttestationPendingQueue;
use crate::chain_config::ChainConfig;
use crate::eth1_chain::FinalizedDeposits;
use crate::errors::{BeaconChainError, InvalidBlockReason, TransientReason};
use crate::events::{EventHandler, EventKind};
use crate::fork_choice_store::BeaconForkChoiceStore;
use crate::state_cache::{StateRegenerator, StateTransition};

/// Deadline given to every execution-engine call this orchestrator makes. A real node ties this
/// to the network's per-method timeout table; fixed here since that table is an external
/// collaborator's concern (the JSON-RPC transport).
const EXECUTION_ENGINE_TIMEOUT: Duration = Duration::from_secs(8);

/// Pure-function signature verification, external to this core for the same reason `StateTransition`
/// is: BLS cryptography internals never need to be inspected here, only their pass/fail outcome.
pub trait SignatureVerifier: Send + Sync {
    fn verify_block_signature(&self, block: &SignedBeaconBlock, parent_state: &BeaconState) -> Result<(), String>;
}

/// The orchestrator wiring FCS, SCR, APQ and EEA together behind `on_block`/`on_block_batch`, per
/// the control flow: verify pre-state via SCR, run state transition, ask EEA to validate the
/// execution payload, insert into FCS, advance checkpoints, recompute head, drain APQ, persist.
pub struct BlockProcessor<S, E, T, V, B> {
    store: Arc<S>,
    engine: Arc<E>,
    state_regen: StateRegenerator<S, T>,
    signature_verifier: Arc<V>,
    fork_choice: Mutex<ForkChoice<BeaconForkChoiceStore<S>, B>>,
    attestation_queue: AttestationPendingQueue,
    finalized_deposits: FinalizedDeposits,
    events: EventHandler,
    spec: ChainSpec,
    config: ChainConfig,
    log: Logger,
}

impl<S, E, T, V, B> BlockProcessor<S, E, T, V, B>
where
    S: Store,
    E: EngineApi,
    T: StateTransition,
    V: SignatureVerifier,
    B: ForkChoiceBackend,
{
    pub fn new(
        store: Arc<S>,
        engine: Arc<E>,
        transition: Arc<T>,
        signature_verifier: Arc<V>,
        fork_choice: ForkChoice<BeaconForkChoiceStore<S>, B>,
        spec: ChainSpec,
        log: Logger,
    ) -> Self {
        Self::with_config(store, engine, transition, signature_verifier, fork_choice, spec, ChainConfig::default(), log)
    }

    pub fn with_config(
        store: Arc<S>,
        engine: Arc<E>,
        transition: Arc<T>,
        signature_verifier: Arc<V>,
        fork_choice: ForkChoice<BeaconForkChoiceStore<S>, B>,
        spec: ChainSpec,
        config: ChainConfig,
        log: Logger,
    ) -> Self {
        Self {
            state_regen: StateRegenerator::new(store.clone(), transition, spec.clone()),
            store,
            engine,
            signature_verifier,
            fork_choice: Mutex::new(fork_choice),
            attestation_queue: AttestationPendingQueue::new(),
            finalized_deposits: FinalizedDeposits::new(),
            events: EventHandler::default(),
            spec,
            config,
            log,
        }
    }

    pub fn events(&self) -> &EventHandler {
        &self.events
    }

    pub fn attestation_queue(&self) -> &AttestationPendingQueue {
        &self.attestation_queue
    }

    pub fn state_regen(&self) -> &StateRegenerator<S, T> {
        &self.state_regen
    }

    pub fn finalized_deposits(&self) -> &FinalizedDeposits {
        &self.finalized_deposits
    }

    /// Implements the `on_block` contract: idempotent on an already-known root, rejects blocks
    /// from the future or at-or-before the finalized slot, reconstructs pre-state via SCR,
    /// transitions state, validates the execution payload (if any) through the engine, inserts
    /// into fork choice, advances checkpoints, recomputes and commits head, and drains any
    /// attestations this import has unblocked.
    pub fn process_block(
        &self,
        current_slot: Slot,
        signed_block: Option<SignedBeaconBlock>,
        block_root: Hash256,
    ) -> Result<Vec<SignedAggregateAttestation>, BeaconChainError> {
        let signed_block = signed_block.ok_or(BeaconChainError::InvalidBlock(InvalidBlockReason::NilBlock))?;

        if self.fork_choice.lock().contains_block(&block_root) {
            debug!(self.log, "block already known"; "root" => ?block_root);
            return Ok(vec![]);
        }

        let block = &signed_block.message;
        self.validate_slot_bounds(current_slot, block)?;

        let parent_state = self.state_regen.get_state(block.parent_root)?;

        self.verify_descendant_of_finalized(block.parent_root)?;

        let post_state = self
            .state_regen
            .apply_block(&parent_state, block)
            .map_err(|e| BeaconChainError::InvalidBlock(InvalidBlockReason::FailedStateTransition(e)))?;

        self.signature_verifier
            .verify_block_signature(&signed_block, &parent_state)
            .map_err(|_| BeaconChainError::InvalidBlock(InvalidBlockReason::BadSignature))?;

        let validation_status = self.validate_execution_payload(block)?;

        {
            let mut fork_choice = self.fork_choice.lock();
            let previous_justified_epoch = fork_choice.fc_store().justified_checkpoint().epoch;
            let previous_finalized_epoch = fork_choice.fc_store().finalized_checkpoint().epoch;

            fork_choice.on_block(current_slot, block, block_root, &post_state, validation_status)?;

            if fork_choice.fc_store().justified_checkpoint().epoch > previous_justified_epoch {
                self.events.register(EventKind::Justified {
                    epoch: fork_choice.fc_store().justified_checkpoint().epoch,
                    root: fork_choice.fc_store().justified_checkpoint().root,
                });
            }

            if fork_choice.fc_store().finalized_checkpoint().epoch > previous_finalized_epoch {
                let finalized = *fork_choice.fc_store().finalized_checkpoint();
                self.events.register(EventKind::Finalized {
                    epoch: finalized.epoch,
                    root: finalized.root,
                });

                let safe_deposit_count = post_state
                    .eth1_deposit_index
                    .saturating_sub(self.spec.eth1_follow_distance_deposits);
                self.finalized_deposits.insert_finalized_deposits(safe_deposit_count);

                let pruned = fork_choice.prune()?;
                info!(self.log, "pruned finalized ancestors"; "count" => pruned);
            }
        }

        let block_slot = block.slot;
        let block_state_root = block.state_root;

        self.store
            .save_state_summary(block_root, StateSummary { slot: block_slot, root: block_state_root })?;
        if block_slot.as_u64() % self.spec.slots_per_epoch == 0 {
            self.store.save_state(block_root, post_state.clone())?;
        }
        self.store.save_block(block_root, signed_block)?;
        self.state_regen.put(block_root, Arc::new(post_state));

        self.commit_head(current_slot)?;

        Ok(self.attestation_queue.take(&block_root).unwrap_or_default())
    }

    /// Implements `on_block_batch`: `blocks[0]` is the already-persisted pivot whose post-state is
    /// already in SCR, `pivot_root` its root (not itself counted in `blocks`/`roots`' `len`
    /// relation, matching the `len(blks) == len(roots)+1` contract with `blks[0]` being the
    /// pivot). Runs transitions sequentially, reusing the running state, commits FCS insertions in
    /// order, and computes head once at the end.
    pub fn process_block_batch(
        &self,
        current_slot: Slot,
        pivot_root: Hash256,
        blocks: &[SignedBeaconBlock],
        roots: &[Hash256],
    ) -> Result<Vec<SignedAggregateAttestation>, BeaconChainError> {
        if blocks.len() != roots.len() + 1 {
            return Err(BeaconChainError::Fatal(format!(
                "wrong block count: {} blocks for {} roots (expected {})",
                blocks.len(),
                roots.len(),
                roots.len() + 1
            )));
        }

        if roots.len() > self.config.max_block_batch_size {
            return Err(BeaconChainError::Fatal(format!(
                "batch of {} blocks exceeds max_block_batch_size {}",
                roots.len(),
                self.config.max_block_batch_size
            )));
        }

        let mut state = (*self.state_regen.get_state(pivot_root)?).clone();
        let mut drained = Vec::new();

        for (signed_block, &root) in blocks[1..].iter().zip(roots.iter()) {
            if self.fork_choice.lock().contains_block(&root) {
                continue;
            }

            let block = &signed_block.message;

            self.signature_verifier
                .verify_block_signature(signed_block, &state)
                .map_err(|_| BeaconChainError::InvalidBlock(InvalidBlockReason::BadSignature))?;

            let post_state = self
                .state_regen
                .apply_block(&state, block)
                .map_err(|e| BeaconChainError::InvalidBlock(InvalidBlockReason::FailedStateTransition(e)))?;

            let validation_status = self.validate_execution_payload(block)?;

            self.fork_choice
                .lock()
                .on_block(current_slot, block, root, &post_state, validation_status)?;

            self.store.save_block(root, signed_block.clone())?;
            self.store
                .save_state_summary(root, StateSummary { slot: block.slot, root: block.state_root })?;

            state = post_state;
            self.state_regen.put(root, Arc::new(state.clone()));

            drained.extend(self.attestation_queue.take(&root).unwrap_or_default());
        }

        self.commit_head(current_slot)?;

        Ok(drained)
    }

    /// Implements `fill_missing_blocks`: `target_root` is known to the `Store` but some prefix of
    /// its ancestor chain was never inserted into fork choice (e.g. it arrived via a gossip
    /// block whose parents are still in flight). Walks backward through `Store::block_by_root`
    /// until it reaches a root fork choice already has, checks that root descends from the
    /// finalized checkpoint, then replays the missing blocks forward, oldest first, the same way
    /// `process_block_batch` replays a caller-supplied batch. Returns the inserted roots, oldest
    /// to newest; an empty result means `target_root` was already known.
    pub fn fill_missing_blocks(
        &self,
        current_slot: Slot,
        target_root: Hash256,
    ) -> Result<Vec<Hash256>, BeaconChainError> {
        if self.fork_choice.lock().contains_block(&target_root) {
            return Ok(vec![]);
        }

        let mut missing = Vec::new();
        let mut cursor = target_root;
        loop {
            if self.fork_choice.lock().contains_block(&cursor) {
                break;
            }

            let signed_block = self
                .store
                .block_by_root(&cursor)?
                .ok_or_else(|| BeaconChainError::Fatal(format!("block {:?} missing from store", cursor)))?;
            let parent_root = signed_block.message.parent_root;
            missing.push((cursor, signed_block));
            cursor = parent_root;
        }

        self.verify_descendant_of_finalized(cursor)?;

        missing.reverse();

        let mut inserted = Vec::with_capacity(missing.len());
        for (root, signed_block) in missing {
            let block = &signed_block.message;

            let parent_state = self.state_regen.get_state(block.parent_root)?;

            self.signature_verifier
                .verify_block_signature(&signed_block, &parent_state)
                .map_err(|_| BeaconChainError::InvalidBlock(InvalidBlockReason::BadSignature))?;

            let post_state = self
                .state_regen
                .apply_block(&parent_state, block)
                .map_err(|e| BeaconChainError::InvalidBlock(InvalidBlockReason::FailedStateTransition(e)))?;

            let validation_status = self.validate_execution_payload(block)?;

            self.fork_choice
                .lock()
                .on_block(current_slot, block, root, &post_state, validation_status)?;

            self.store
                .save_state_summary(root, StateSummary { slot: block.slot, root: block.state_root })?;
            self.store.save_block(root, signed_block)?;
            self.state_regen.put(root, Arc::new(post_state));

            inserted.push(root);
        }

        self.commit_head(current_slot)?;

        Ok(inserted)
    }

    fn validate_slot_bounds(&self, current_slot: Slot, block: &BeaconBlock) -> Result<(), BeaconChainError> {
        if block.slot.as_u64() > current_slot.as_u64() + self.spec.maximum_gossip_clock_disparity_slots {
            return Err(BeaconChainError::InvalidBlock(InvalidBlockReason::FromFuture));
        }

        let finalized_slot = self
            .fork_choice
            .lock()
            .fc_store()
            .finalized_checkpoint()
            .epoch
            .start_slot(self.spec.slots_per_epoch);
        if block.slot <= finalized_slot {
            return Err(BeaconChainError::InvalidBlock(InvalidBlockReason::BeforeFinalized));
        }

        Ok(())
    }

    fn verify_descendant_of_finalized(&self, parent_root: Hash256) -> Result<(), BeaconChainError> {
        let mut fork_choice = self.fork_choice.lock();
        let finalized_root = fork_choice.fc_store().finalized_checkpoint().root;
        let finalized_slot = fork_choice
            .fc_store()
            .finalized_checkpoint()
            .epoch
            .start_slot(self.spec.slots_per_epoch);

        let ancestor = fork_choice
            .get_ancestor(parent_root, finalized_slot)
            .ok()
            .or_else(|| fork_choice.fc_store().ancestor_at_slot(parent_root, finalized_slot).ok());

        match ancestor {
            Some(root) if root == finalized_root => Ok(()),
            _ => Err(BeaconChainError::InvalidBlock(InvalidBlockReason::NotDescendantOfFinalized {
                finalized_root,
                parent_root,
            })),
        }
    }

    fn validate_execution_payload(&self, block: &BeaconBlock) -> Result<ValidationStatus, BeaconChainError> {
        if !block.has_execution_payload() {
            return Ok(ValidationStatus::Valid);
        }

        let payload: NewPayloadRequest = block.execution_payload.clone().unwrap();

        match self.engine.new_payload(payload, EXECUTION_ENGINE_TIMEOUT) {
            Ok(_) => Ok(ValidationStatus::Valid),
            Err(EngineError::AcceptedSyncing) => Ok(ValidationStatus::Optimistic),
            Err(EngineError::Invalid { latest_valid_hash }) => {
                let mut fork_choice = self.fork_choice.lock();
                if fork_choice.contains_block(&block.parent_root) && block.parent_root != latest_valid_hash {
                    if let Err(e) = fork_choice.update_with_invalid(block.parent_root) {
                        error!(self.log, "failed to roll back invalid optimistic branch"; "error" => ?e);
                    }
                    self.events.register(EventKind::InvalidBlock {
                        root: block.parent_root,
                        reason: "execution payload invalid".to_string(),
                    });
                }
                Err(BeaconChainError::InvalidBlock(InvalidBlockReason::ExecutionInvalid { latest_valid_hash }))
            }
            Err(EngineError::InvalidBlockHash) => {
                Err(BeaconChainError::InvalidBlock(InvalidBlockReason::InvalidBlockHash))
            }
            Err(EngineError::Timeout) => Err(BeaconChainError::Transient(TransientReason::EngineTimeout)),
            Err(EngineError::ConfigMismatch { message }) => Err(BeaconChainError::Fatal(message)),
            Err(EngineError::Transport(message)) => Err(BeaconChainError::Fatal(message)),
            Err(EngineError::Unknown(message)) => Err(BeaconChainError::Fatal(message)),
        }
    }

    /// Recomputes head outside the fork-choice lock's critical section before calling the engine,
    /// so a slow `ForkchoiceUpdated` call never blocks concurrent FCS insertions.
    fn commit_head(&self, current_slot: Slot) -> Result<(), BeaconChainError> {
        let (head_root, head_slot, is_optimistic, head_payload_hash, finalized_payload_hash) = {
            let mut fork_choice = self.fork_choice.lock();
            let head_root = fork_choice.get_head(current_slot)?;
            let is_optimistic = fork_choice.is_optimistic(&head_root)?;
            let head_slot = fork_choice
                .get_block(&head_root)
                .map(|d| d.slot)
                .unwrap_or(current_slot);
            let head_payload_hash = fork_choice
                .get_block(&head_root)
                .map(|d| d.payload_hash)
                .unwrap_or_else(Hash256::zero);
            let finalized_root = fork_choice.fc_store().finalized_checkpoint().root;
            let finalized_payload_hash = fork_choice
                .get_block(&finalized_root)
                .map(|d| d.payload_hash)
                .unwrap_or_else(Hash256::zero);

            (head_root, head_slot, is_optimistic, head_payload_hash, finalized_payload_hash)
        };

        if let Err(e) = self.engine.forkchoice_updated(
            ForkchoiceState {
                head_block_hash: head_payload_hash,
                safe_block_hash: head_payload_hash,
                finalized_block_hash: finalized_payload_hash,
            },
            None,
            EXECUTION_ENGINE_TIMEOUT,
        ) {
            debug!(self.log, "forkchoice_updated call did not complete"; "error" => ?e);
        }

        self.events.register(EventKind::HeadUpdated {
            root: head_root,
            slot: head_slot,
            optimistic: is_optimistic,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BeaconChainBuilder;
    use execution_layer::{MockEngine, MockResponse};
    use proto_array::ArrayBackend;
    use slog::o;
    use store::MemoryStore;
    use types::Signature;

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

    fn store_block(store: &MemoryStore, root: Hash256, slot: u64, parent_root: Hash256) {
        store
            .save_block(
                root,
                SignedBeaconBlock {
                    message: BeaconBlock { slot: Slot::new(slot), parent_root, ..Default::default() },
                    signature: Signature(vec![]),
                },
            )
            .unwrap();
    }

    fn new_processor() -> (BlockProcessor<MemoryStore, MockEngine, NoopTransition, AlwaysValid, ArrayBackend>, Hash256) {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(MockEngine::new(MockResponse::Valid));
        let spec = ChainSpec::minimal();
        let genesis_root = Hash256::from_low_u64_be(1);
        let genesis_block = BeaconBlock { slot: Slot::new(0), parent_root: Hash256::zero(), ..Default::default() };
        let genesis_state = BeaconState { block_roots: vec![Hash256::zero(); 8], ..Default::default() };

        let builder: BeaconChainBuilder<_, _, _, _, ArrayBackend> = BeaconChainBuilder::new(
            store,
            engine,
            Arc::new(NoopTransition),
            Arc::new(AlwaysValid),
            spec,
            test_logger(),
        );
        let processor = builder.from_genesis(genesis_root, genesis_block, genesis_state).unwrap();
        (processor, genesis_root)
    }

    #[test]
    fn fills_missing_ancestors_oldest_first() {
        let (processor, genesis_root) = new_processor();

        let b3 = Hash256::from_low_u64_be(3);
        let b4 = Hash256::from_low_u64_be(4);
        let b6 = Hash256::from_low_u64_be(6);
        let b8 = Hash256::from_low_u64_be(8);

        store_block(&processor.store, b3, 1, genesis_root);
        store_block(&processor.store, b4, 2, b3);
        store_block(&processor.store, b6, 3, b4);
        store_block(&processor.store, b8, 4, b6);

        let inserted = processor.fill_missing_blocks(Slot::new(4), b8).unwrap();
        assert_eq!(inserted, vec![b3, b4, b6, b8]);

        // Already known: a second call is a no-op.
        let inserted_again = processor.fill_missing_blocks(Slot::new(4), b8).unwrap();
        assert!(inserted_again.is_empty());
    }

    #[test]
    fn backfill_fails_when_an_ancestor_is_absent_from_the_store() {
        let (processor, _genesis_root) = new_processor();

        let orphan_child = Hash256::from_low_u64_be(42);
        // orphan_child's parent was never persisted anywhere.
        store_block(&processor.store, orphan_child, 1, Hash256::from_low_u64_be(99));

        let err = processor.fill_missing_blocks(Slot::new(1), orphan_child).unwrap_err();
        assert!(matches!(err, BeaconChainError::Fatal(_)));
    }

    #[test]
    fn backfill_rejects_a_chain_whose_root_is_not_the_finalized_sibling() {
        use types::{Checkpoint, Epoch};

        let store = Arc::new(MemoryStore::new());
        let genesis_root = Hash256::from_low_u64_be(1);
        let genesis_block = BeaconBlock { slot: Slot::new(0), parent_root: Hash256::zero(), ..Default::default() };
        let genesis_state = BeaconState { block_roots: vec![Hash256::zero(); 8], ..Default::default() };
        store_block(&store, genesis_root, 0, Hash256::zero());
        store.save_state(genesis_root, genesis_state.clone()).unwrap();
        store.save_genesis_block_root(genesis_root).unwrap();

        // Finalized checkpoint points at a sibling root genesis never descends from.
        let sibling_root = Hash256::from_low_u64_be(111);
        store.save_finalized_checkpoint(Checkpoint::new(Epoch::new(0), sibling_root)).unwrap();

        let spec = ChainSpec::minimal();
        let fc_store = BeaconForkChoiceStore::from_store(store.clone(), genesis_root, genesis_state.balances.clone()).unwrap();
        let fork_choice: ForkChoice<_, ArrayBackend> =
            ForkChoice::from_genesis(fc_store, genesis_root, &genesis_block, &genesis_state, spec.clone());

        let processor: BlockProcessor<_, MockEngine, _, _, ArrayBackend> = BlockProcessor::with_config(
            store.clone(),
            Arc::new(MockEngine::new(MockResponse::Valid)),
            Arc::new(NoopTransition),
            Arc::new(AlwaysValid),
            fork_choice,
            spec,
            ChainConfig::default(),
            test_logger(),
        );
        processor.state_regen().put(genesis_root, Arc::new(genesis_state));

        let b8 = Hash256::from_low_u64_be(8);
        store_block(&store, b8, 1, genesis_root);

        let err = processor.fill_missing_blocks(Slot::new(1), b8).unwrap_err();
        assert!(matches!(
            err,
            BeaconChainError::InvalidBlock(InvalidBlockReason::NotDescendantOfFinalized { .. })
        ));
    }
}
