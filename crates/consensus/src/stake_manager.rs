//! Stake Manager - validator ledger maintenance and validator set selection
//!
//! Flow per finalized block:
//! 1. Collect stake `Transfer` events since the last processed block
//! 2. Apply mints and burns to the ledger
//! 3. Resolve signing keys of touched validators from the root chain
//! 4. Persist the ledger as one record
//!
//! At epoch boundaries the consensus layer asks for the delta between the
//! current active set and the top validators of the ledger.

use std::collections::BTreeSet;
use std::sync::Arc;

use chain_types::{AccountSet, Address, Bitmap, TransferEvent, ValidatorSetDelta};
use num_traits::Zero;
use rootchain_bridge::ValidatorRegistry;
use state_store::{FullValidatorSet, StakeStore};

use crate::backend::Blockchain;
use crate::error::ConsensusError;
use crate::events_getter::EventsGetter;
use crate::types::{PostBlockRequest, PostEpochRequest};

/// Keeps the validator ledger in sync with the stake contract
pub struct StakeManager {
    store: StakeStore,
    /// Root-chain validator registry, source of signing keys
    registry: ValidatorRegistry,
    events: EventsGetter<TransferEvent>,
}

impl StakeManager {
    pub fn new(
        store: StakeStore,
        registry: ValidatorRegistry,
        blockchain: Arc<dyn Blockchain>,
        stake_contract: Address,
    ) -> Self {
        Self {
            store,
            registry,
            events: EventsGetter::new(blockchain, stake_contract),
        }
    }

    /// Seed the ledger from the genesis active set at epoch 1
    pub fn post_epoch(&self, req: &PostEpochRequest) -> Result<(), ConsensusError> {
        if req.new_epoch_id != 1 {
            return Ok(());
        }

        let genesis = FullValidatorSet::genesis(&req.validator_set);
        self.store.insert_full_validator_set(&genesis)?;

        tracing::info!(
            "Validator ledger initialized with {} genesis validators",
            genesis.validators.len()
        );

        Ok(())
    }

    /// Apply the stake events of a finalized block (and any skipped blocks
    /// before it) to the ledger.
    ///
    /// Must run once per block in block order; events would be applied twice
    /// on re-invocation.
    pub fn post_block(&self, req: &PostBlockRequest) -> Result<(), ConsensusError> {
        let mut full = self.store.get_full_validator_set()?;
        let block = req.header.number;

        let events = self
            .events
            .events_from_blocks(full.block_number, &req.header, &req.receipts)?;

        let mut touched = BTreeSet::new();
        for event in &events {
            if event.is_stake() {
                tracing::debug!("Stake of {} for validator {}", event.value, event.to);
                full.validators.add_stake(event.to, &event.value);
                touched.insert(event.to);
            } else if event.is_unstake() {
                tracing::debug!("Unstake of {} for validator {}", event.value, event.from);
                let shortfall = full.validators.remove_stake(event.from, &event.value);
                if !shortfall.is_zero() {
                    tracing::error!(
                        "Unstake of {} for validator {} exceeds its stake by {}, clamped to zero",
                        event.value,
                        event.from,
                        shortfall
                    );
                }
                if full.validators.get(&event.from).is_some() {
                    touched.insert(event.from);
                }
            } else {
                tracing::warn!(
                    "Ignoring stake transfer from {} to {} in block {}",
                    event.from,
                    event.to,
                    block
                );
            }
        }

        for (address, validator) in full.validators.iter_mut() {
            if !touched.contains(address) {
                continue;
            }
            if validator.bls_key.is_none() {
                match self.registry.get_bls_key(*address) {
                    Ok(key) => validator.bls_key = Some(key),
                    Err(e) => {
                        tracing::warn!("Could not get BLS key for validator {}: {}", address, e)
                    }
                }
            }
            validator.refresh_active();
        }

        if !events.is_empty() {
            full.updated_at_block_number = block;
        }
        full.block_number = block;
        full.epoch_id = req.epoch;

        self.store.insert_full_validator_set(&full)?;

        tracing::debug!(
            "Stake manager processed block {}: {} transfer events, {} validators in ledger",
            block,
            events.len(),
            full.validators.len()
        );

        Ok(())
    }

    /// Delta from `old_set` to the top `max_size` active validators of the ledger.
    ///
    /// Every node derives the same delta from the same ledger: selection is
    /// ordered by voting power descending, then address ascending.
    pub fn update_validator_set(
        &self,
        epoch: u64,
        max_size: usize,
        old_set: &AccountSet,
    ) -> Result<ValidatorSetDelta, ConsensusError> {
        let full = self.store.get_full_validator_set()?;
        let new_set = full.validators.get_sorted(max_size);

        let mut removed = Bitmap::new();
        for (index, validator) in old_set.iter().enumerate() {
            if !new_set.contains(&validator.address) {
                removed.set(index);
            }
        }

        let mut added = AccountSet::default();
        let mut updated = AccountSet::default();
        for validator in &new_set {
            match old_set.get(&validator.address) {
                None => {
                    let mut validator = validator.clone();
                    if validator.bls_key.is_none() {
                        let key = self.registry.get_bls_key(validator.address).map_err(|source| {
                            ConsensusError::UnresolvableKey {
                                address: validator.address,
                                source,
                            }
                        })?;
                        validator.bls_key = Some(key);
                    }
                    added.push(validator);
                }
                Some(previous) if previous.voting_power != validator.voting_power => {
                    let mut validator = validator.clone();
                    if validator.bls_key.is_none() {
                        validator.bls_key = previous.bls_key.clone();
                    }
                    updated.push(validator);
                }
                Some(_) => {}
            }
        }

        let delta = ValidatorSetDelta {
            added,
            updated,
            removed,
        };

        tracing::info!("Validator set delta for epoch {}: {}", epoch, delta);

        if tracing::enabled!(tracing::Level::DEBUG) {
            match old_set.apply_delta(&delta) {
                Ok(next) => {
                    for validator in &next {
                        tracing::debug!("Next validator set member: {}", validator);
                    }
                }
                Err(e) => tracing::warn!("Could not apply validator set delta: {}", e),
            }
        }

        Ok(delta)
    }

    /// Every validator in the ledger, active or not
    pub fn get_all_validators(&self) -> Result<AccountSet, ConsensusError> {
        Ok(self.store.get_all_validators()?)
    }
}
