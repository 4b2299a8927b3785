use crate::error::{Error, InvalidAttestation, InvalidBlock, SAFE_SLOTS_TO_UPDATE_JUSTIFIED};
use crate::queued_attestation::{dequeue_attestations, QueuedAttestation};
use crate::store::ForkChoiceStore;
use proto_array::{BlockDescriptor, ForkChoiceBackend, ProtoArrayForkChoice, ValidationStatus};
use types::{
    BeaconBlock, BeaconState, ChainSpec, Checkpoint, Epoch, Hash256, IndexedAttestation, Slot,
};

fn compute_start_slot_at_epoch(epoch: Epoch, slots_per_epoch: u64) -> Slot {
    epoch.start_slot(slots_per_epoch)
}

pub fn compute_slots_since_epoch_start(slot: Slot, slots_per_epoch: u64) -> Slot {
    slot - slot.epoch(slots_per_epoch).start_slot(slots_per_epoch)
}

/// Called whenever the current time increases by at least one slot.
///
/// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#on_tick
fn on_tick<T: ForkChoiceStore>(
    store: &mut T,
    time: Slot,
    slots_per_epoch: u64,
) -> Result<(), Error<T::Error>> {
    let previous_slot = store.get_current_slot();

    if time > previous_slot + 1 {
        return Err(Error::InconsistentOnTick { previous_slot, time });
    }

    store.set_current_slot(time);

    let current_slot = store.get_current_slot();
    if !(current_slot > previous_slot && compute_slots_since_epoch_start(current_slot, slots_per_epoch).as_u64() == 0)
    {
        return Ok(());
    }

    if store.best_justified_checkpoint().epoch > store.justified_checkpoint().epoch {
        store
            .set_justified_checkpoint_to_best_justified_checkpoint()
            .map_err(Error::ForkChoiceStoreError)?;
    }

    Ok(())
}

/// Implementation of the beacon-chain fork-choice rule: wraps [`ProtoArrayForkChoice`] and adds
/// justified/finalized checkpoint bookkeeping, proposer boost and the current-slot attestation
/// queue, over a [`ForkChoiceStore`] the caller provides.
pub struct ForkChoice<T, B> {
    fc_store: T,
    proto_array: ProtoArrayForkChoice<B>,
    /// Resolves the `0x00..00` alias back to genesis.
    genesis_block_root: Hash256,
    queued_attestations: Vec<QueuedAttestation>,
    /// Root of the block currently granted proposer boost, if any, and the slot it was granted
    /// in (so it can be cleared at the next slot boundary).
    proposer_boost_root: Option<(Hash256, Slot)>,
    spec: ChainSpec,
}

impl<T, B> ForkChoice<T, B>
where
    T: ForkChoiceStore,
    B: ForkChoiceBackend,
{
    pub fn from_genesis(
        fc_store: T,
        genesis_block_root: Hash256,
        genesis_block: &BeaconBlock,
        genesis_state: &BeaconState,
        spec: ChainSpec,
    ) -> Self {
        let finalized_block_slot = genesis_block.slot;
        let justified_epoch = genesis_state.current_epoch(spec.slots_per_epoch);
        let finalized_epoch = justified_epoch;

        let proto_array = ProtoArrayForkChoice::new(
            finalized_block_slot,
            genesis_block_root,
            genesis_block_root,
            justified_epoch,
            finalized_epoch,
        );

        Self {
            fc_store,
            proto_array,
            genesis_block_root,
            queued_attestations: vec![],
            proposer_boost_root: None,
            spec,
        }
    }

    pub fn from_components(
        fc_store: T,
        proto_array: ProtoArrayForkChoice<B>,
        genesis_block_root: Hash256,
        queued_attestations: Vec<QueuedAttestation>,
        spec: ChainSpec,
    ) -> Self {
        Self {
            fc_store,
            proto_array,
            genesis_block_root,
            queued_attestations,
            proposer_boost_root: None,
            spec,
        }
    }

    fn remove_alias(&self, root: Hash256) -> Hash256 {
        if root == Hash256::zero() {
            self.genesis_block_root
        } else {
            root
        }
    }

    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#get_ancestor
    pub fn get_ancestor(&self, block_root: Hash256, ancestor_slot: Slot) -> Result<Hash256, Error<T::Error>> {
        let block = self
            .proto_array
            .get_block(&block_root)
            .ok_or(Error::MissingProtoArrayBlock(block_root))?;

        if block.slot > ancestor_slot {
            self.proto_array
                .ancestor_at_slot(block_root, ancestor_slot)
                .map_err(Error::from)
        } else {
            Ok(block_root)
        }
    }

    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#get_head
    pub fn get_head(&mut self, current_slot: Slot) -> Result<Hash256, Error<T::Error>> {
        self.update_time(current_slot)?;

        let justified_epoch = self.fc_store.justified_checkpoint().epoch;
        let finalized_epoch = self.fc_store.finalized_checkpoint().epoch;

        self.proto_array
            .process_changes(self.fc_store.justified_balances(), justified_epoch, finalized_epoch)
            .map_err(Error::from)?;

        let justified_root = self.remove_alias(self.fc_store.justified_checkpoint().root);

        self.proto_array
            .find_head(justified_root, justified_epoch, finalized_epoch)
            .map_err(Error::from)
    }

    /// Whether the head returned by the most recent [`Self::get_head`] call is optimistic (i.e.
    /// its execution payload, or an ancestor's, has not yet been confirmed `VALID`).
    pub fn is_optimistic(&self, root: &Hash256) -> Result<bool, Error<T::Error>> {
        match self.proto_array.validation_status(root) {
            Some(ValidationStatus::Valid) => Ok(false),
            Some(_) => Ok(true),
            None => Err(Error::MissingProtoArrayBlock(*root)),
        }
    }

    /// Grant `root` a transient weight boost for the remainder of `current_slot`, provided the
    /// boost request arrives within the acceptance window. `total_active_balance` is the
    /// justified-epoch active balance total used to size the boost.
    pub fn boost_proposer(
        &mut self,
        root: Hash256,
        current_slot: Slot,
        seconds_into_slot: u64,
        total_active_balance: u64,
    ) -> Result<(), Error<T::Error>> {
        if seconds_into_slot >= self.spec.proposer_boost_window_seconds() {
            return Ok(());
        }

        let boost_weight = total_active_balance
            .saturating_mul(self.spec.proposer_score_boost)
            / 100;
        self.proto_array.boost_proposer(root, boost_weight);
        self.proposer_boost_root = Some((root, current_slot));

        Ok(())
    }

    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#should_update_justified_checkpoint
    fn should_update_justified_checkpoint(
        &mut self,
        current_slot: Slot,
        new_justified_checkpoint: &Checkpoint,
    ) -> Result<bool, Error<T::Error>> {
        self.update_time(current_slot)?;

        if compute_slots_since_epoch_start(self.fc_store.get_current_slot(), self.spec.slots_per_epoch).as_u64()
            < SAFE_SLOTS_TO_UPDATE_JUSTIFIED
        {
            return Ok(true);
        }

        let justified_slot = compute_start_slot_at_epoch(self.fc_store.justified_checkpoint().epoch, self.spec.slots_per_epoch);
        if self.get_ancestor(new_justified_checkpoint.root, justified_slot)?
            != self.fc_store.justified_checkpoint().root
        {
            return Ok(false);
        }

        Ok(true)
    }

    /// Make fork choice aware of `block` and advance justified/finalized checkpoints as implied
    /// by `state`. Does not itself validate the block; the caller (the block processor) must
    /// already have run state transition and execution-payload validation.
    ///
    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#on_block
    pub fn on_block(
        &mut self,
        current_slot: Slot,
        block: &BeaconBlock,
        block_root: Hash256,
        state: &BeaconState,
        validation_status: ValidationStatus,
    ) -> Result<(), Error<T::Error>> {
        let current_slot = self.update_time(current_slot)?;

        if self.proto_array.contains_block(&block_root) {
            return Ok(());
        }

        if block.slot > current_slot {
            return Err(Error::InvalidBlock(InvalidBlock::FutureSlot {
                present_slot: current_slot,
                block_slot: block.slot,
            }));
        }

        if state.current_justified_checkpoint.epoch > self.fc_store.justified_checkpoint().epoch {
            if state.current_justified_checkpoint.epoch > self.fc_store.best_justified_checkpoint().epoch {
                self.fc_store
                    .set_best_justified_checkpoint(state.current_justified_checkpoint);
            }
            if self.should_update_justified_checkpoint(current_slot, &state.current_justified_checkpoint)? {
                self.fc_store
                    .set_justified_checkpoint(state.current_justified_checkpoint)
                    .map_err(Error::UnableToSetJustifiedCheckpoint)?;
            }
        }

        if state.finalized_checkpoint.epoch > self.fc_store.finalized_checkpoint().epoch {
            self.fc_store.set_finalized_checkpoint(state.finalized_checkpoint);
            let finalized_slot = compute_start_slot_at_epoch(self.fc_store.finalized_checkpoint().epoch, self.spec.slots_per_epoch);

            if state.current_justified_checkpoint.epoch > self.fc_store.justified_checkpoint().epoch
                || self.get_ancestor(self.fc_store.justified_checkpoint().root, finalized_slot)?
                    != self.fc_store.finalized_checkpoint().root
            {
                self.fc_store
                    .set_justified_checkpoint(state.current_justified_checkpoint)
                    .map_err(Error::UnableToSetJustifiedCheckpoint)?;
            }
        }

        let target_slot = block.slot.epoch(self.spec.slots_per_epoch).start_slot(self.spec.slots_per_epoch);
        let target_root = if block.slot == target_slot {
            block_root
        } else {
            state
                .get_block_root(target_slot)
                .map_err(|_| Error::MissingProtoArrayBlock(block_root))?
        };

        self.proto_array.process_block(BlockDescriptor {
            slot: block.slot,
            root: block_root,
            parent_root: Some(block.parent_root),
            target_root,
            state_root: block.state_root,
            payload_hash: block
                .execution_payload
                .as_ref()
                .map(|p| p.block_hash)
                .unwrap_or_else(Hash256::zero),
            justified_epoch: state.current_justified_checkpoint.epoch,
            finalized_epoch: state.finalized_checkpoint.epoch,
            weight: 0,
            validation_status,
        })?;

        Ok(())
    }

    fn validate_on_attestation(&self, indexed_attestation: &IndexedAttestation) -> Result<(), InvalidAttestation> {
        if indexed_attestation.attesting_indices.is_empty() {
            return Err(InvalidAttestation::EmptyAggregationBitfield);
        }

        let slot_now = self.fc_store.get_current_slot();
        let epoch_now = slot_now.epoch(self.spec.slots_per_epoch);
        let target = indexed_attestation.data.target;

        if target.epoch > epoch_now {
            return Err(InvalidAttestation::FutureEpoch {
                attestation_epoch: target.epoch,
                current_epoch: epoch_now,
            });
        } else if target.epoch.as_u64() + 1 < epoch_now.as_u64() {
            return Err(InvalidAttestation::PastEpoch {
                attestation_epoch: target.epoch,
                current_epoch: epoch_now,
            });
        }

        if target.epoch != indexed_attestation.data.slot.epoch(self.spec.slots_per_epoch) {
            return Err(InvalidAttestation::BadTargetEpoch);
        }

        if !self.proto_array.contains_block(&target.root) {
            return Err(InvalidAttestation::UnknownTargetRoot(target.root));
        }

        let block = self
            .proto_array
            .get_block(&indexed_attestation.data.beacon_block_root)
            .ok_or(InvalidAttestation::UnknownHeadBlock {
                beacon_block_root: indexed_attestation.data.beacon_block_root,
            })?;

        if block.target_root != target.root {
            return Err(InvalidAttestation::InvalidTarget {
                attestation: target.root,
                block: block.target_root,
            });
        }

        if block.slot > indexed_attestation.data.slot {
            return Err(InvalidAttestation::AttestsToFutureBlock {
                block: block.slot,
                attestation: indexed_attestation.data.slot,
            });
        }

        Ok(())
    }

    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#on_attestation
    pub fn on_attestation(
        &mut self,
        current_slot: Slot,
        attestation: &IndexedAttestation,
    ) -> Result<(), Error<T::Error>> {
        self.update_time(current_slot)?;

        if attestation.data.beacon_block_root == Hash256::zero() {
            return Ok(());
        }

        self.validate_on_attestation(attestation)?;

        if attestation.data.slot < self.fc_store.get_current_slot() {
            for validator_index in attestation.attesting_indices.iter() {
                self.proto_array.process_attestation(
                    *validator_index as usize,
                    attestation.data.beacon_block_root,
                    attestation.target_epoch(),
                );
            }
        } else {
            self.queued_attestations.push(QueuedAttestation::from(attestation));
        }

        Ok(())
    }

    /// Calls `on_tick` for every slot between the store's current slot and `current_slot`, then
    /// drains any now-eligible queued attestations.
    pub fn update_time(&mut self, current_slot: Slot) -> Result<Slot, Error<T::Error>> {
        while self.fc_store.get_current_slot() < current_slot {
            let previous_slot = self.fc_store.get_current_slot();
            on_tick(&mut self.fc_store, previous_slot + 1, self.spec.slots_per_epoch)?;

            if let Some((_, boost_slot)) = self.proposer_boost_root {
                if self.fc_store.get_current_slot() > boost_slot {
                    self.proto_array.clear_proposer_boost();
                    self.proposer_boost_root = None;
                }
            }
        }

        self.process_attestation_queue()?;

        Ok(self.fc_store.get_current_slot())
    }

    fn process_attestation_queue(&mut self) -> Result<(), Error<T::Error>> {
        for attestation in dequeue_attestations(self.fc_store.get_current_slot(), &mut self.queued_attestations) {
            for validator_index in attestation.attesting_indices.iter() {
                self.proto_array
                    .process_attestation(*validator_index as usize, attestation.block_root, attestation.target_epoch);
            }
        }

        Ok(())
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.proto_array.contains_block(block_root)
    }

    pub fn get_block(&self, block_root: &Hash256) -> Option<BlockDescriptor> {
        self.proto_array.get_block(block_root)
    }

    pub fn fc_store(&self) -> &T {
        &self.fc_store
    }

    pub fn fc_store_mut(&mut self) -> &mut T {
        &mut self.fc_store
    }

    pub fn genesis_block_root(&self) -> &Hash256 {
        &self.genesis_block_root
    }

    pub fn queued_attestations(&self) -> &[QueuedAttestation] {
        &self.queued_attestations
    }

    /// Reclassify `root` and its ancestors up the chain as `Valid`, per an engine `NewPayload`/
    /// `ForkchoiceUpdated` response of `VALID`.
    pub fn update_with_valid(&mut self, root: Hash256) -> Result<(), Error<T::Error>> {
        self.proto_array.update_with_valid(root).map_err(Error::from)
    }

    /// Mark `root` `Invalid` per an engine `INVALID` response, removing it and every descendant.
    /// Returns the removed roots.
    pub fn update_with_invalid(&mut self, root: Hash256) -> Result<Vec<Hash256>, Error<T::Error>> {
        self.proto_array.update_with_invalid(root).map_err(Error::from)
    }

    /// Prune the DAG down to the current finalized checkpoint.
    pub fn prune(&mut self) -> Result<usize, Error<T::Error>> {
        let finalized_root = self.fc_store.finalized_checkpoint().root;
        self.proto_array.maybe_prune(finalized_root).map_err(Error::from)
    }
}
