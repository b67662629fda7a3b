//! Hooks the consensus engine drives the core through

use std::sync::Arc;

use chain_types::{AccountSet, Address, ValidatorSetDelta};
use rootchain_bridge::{CheckpointCommitter, TxRelayer, TxSigner, ValidatorRegistry};
use state_store::StateStore;

use crate::backend::{Blockchain, ConsensusBackend, SignatureVerifier};
use crate::checkpoint_manager::{CheckpointManager, ExitProof};
use crate::error::ConsensusError;
use crate::stake_manager::StakeManager;
use crate::types::{ConsensusConfig, PostBlockRequest, PostEpochRequest};

/// Validator-set capability the consensus engine calls into.
///
/// `on_finalized_block` is invoked exactly once per block, in block order,
/// from a single thread.
pub trait ValidatorSetHooks: Send + Sync {
    fn on_new_epoch(&self, req: &PostEpochRequest) -> Result<(), ConsensusError>;

    fn on_finalized_block(&self, req: &PostBlockRequest) -> Result<(), ConsensusError>;

    fn compute_validator_set_delta(
        &self,
        epoch: u64,
        max_size: usize,
        current_set: &AccountSet,
    ) -> Result<ValidatorSetDelta, ConsensusError>;
}

/// The real core: ledger, exit store and checkpoints
pub struct SidechainCore {
    stake_manager: StakeManager,
    checkpoint_manager: CheckpointManager,
}

impl SidechainCore {
    pub fn new(stake_manager: StakeManager, checkpoint_manager: CheckpointManager) -> Self {
        Self {
            stake_manager,
            checkpoint_manager,
        }
    }

    pub fn stake_manager(&self) -> &StakeManager {
        &self.stake_manager
    }

    pub fn checkpoint_manager(&self) -> &CheckpointManager {
        &self.checkpoint_manager
    }

    pub fn config(&self) -> &ConsensusConfig {
        self.checkpoint_manager.config()
    }

    /// Every validator in the ledger, active or not
    pub fn get_all_validators(&self) -> Result<AccountSet, ConsensusError> {
        self.stake_manager.get_all_validators()
    }

    pub fn generate_exit_proof(&self, exit_id: u64) -> Result<ExitProof, ConsensusError> {
        self.checkpoint_manager.generate_exit_proof(exit_id)
    }

    pub fn generate_slash_exit_proofs(&self) -> Result<Vec<ExitProof>, ConsensusError> {
        self.checkpoint_manager.generate_slash_exit_proofs()
    }
}

impl ValidatorSetHooks for SidechainCore {
    fn on_new_epoch(&self, req: &PostEpochRequest) -> Result<(), ConsensusError> {
        tracing::info!(
            "New epoch {} with {} active validators",
            req.new_epoch_id,
            req.validator_set.len()
        );
        self.stake_manager.post_epoch(req)
    }

    fn on_finalized_block(&self, req: &PostBlockRequest) -> Result<(), ConsensusError> {
        self.stake_manager.post_block(req)?;
        self.checkpoint_manager.post_block(req)
    }

    fn compute_validator_set_delta(
        &self,
        epoch: u64,
        max_size: usize,
        current_set: &AccountSet,
    ) -> Result<ValidatorSetDelta, ConsensusError> {
        // The configured bound caps whatever the engine asks for
        let max_size = max_size.min(self.config().max_validator_set_size);
        self.stake_manager
            .update_validator_set(epoch, max_size, current_set)
    }
}

/// No-op hooks for running consensus without a root chain
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyHooks;

impl ValidatorSetHooks for DummyHooks {
    fn on_new_epoch(&self, _req: &PostEpochRequest) -> Result<(), ConsensusError> {
        Ok(())
    }

    fn on_finalized_block(&self, _req: &PostBlockRequest) -> Result<(), ConsensusError> {
        Ok(())
    }

    fn compute_validator_set_delta(
        &self,
        _epoch: u64,
        _max_size: usize,
        _current_set: &AccountSet,
    ) -> Result<ValidatorSetDelta, ConsensusError> {
        Ok(ValidatorSetDelta::default())
    }
}

/// External services the core talks to
#[derive(Clone)]
pub struct Collaborators {
    pub relayer: Arc<dyn TxRelayer>,
    pub signer: Arc<dyn TxSigner>,
    pub blockchain: Arc<dyn Blockchain>,
    pub backend: Arc<dyn ConsensusBackend>,
    pub verifier: Arc<dyn SignatureVerifier>,
}

/// Builder for SidechainCore
pub struct SidechainCoreBuilder {
    config: ConsensusConfig,
}

impl SidechainCoreBuilder {
    pub fn new() -> Self {
        Self {
            config: ConsensusConfig::default(),
        }
    }

    pub fn config(mut self, config: ConsensusConfig) -> Self {
        self.config = config;
        self
    }

    pub fn checkpoint_interval(mut self, interval: u64) -> Self {
        self.config.checkpoint_interval = interval;
        self
    }

    pub fn submit_checkpoints(mut self, enabled: bool) -> Self {
        self.config.submit_checkpoints = enabled;
        self
    }

    pub fn max_validator_set_size(mut self, size: usize) -> Self {
        self.config.max_validator_set_size = size;
        self
    }

    pub fn stake_contract(mut self, address: Address) -> Self {
        self.config.stake_contract = address;
        self
    }

    pub fn exit_contract(mut self, address: Address) -> Self {
        self.config.exit_contract = address;
        self
    }

    pub fn root_contracts(mut self, stake_manager: Address, checkpoint_manager: Address) -> Self {
        self.config.root_stake_manager = stake_manager;
        self.config.root_checkpoint_manager = checkpoint_manager;
        self
    }

    pub fn build(self, store: &StateStore, collaborators: Collaborators) -> SidechainCore {
        let config = self.config;

        let registry = ValidatorRegistry::new(
            collaborators.relayer.clone(),
            collaborators.signer.address(),
            config.root_stake_manager,
        );
        let stake_manager = StakeManager::new(
            store.stake().clone(),
            registry,
            collaborators.blockchain.clone(),
            config.stake_contract,
        );

        let committer = CheckpointCommitter::new(
            collaborators.relayer,
            collaborators.signer,
            config.root_checkpoint_manager,
        );
        let checkpoint_manager = CheckpointManager::new(
            config,
            store.exit_events().clone(),
            committer,
            collaborators.blockchain,
            collaborators.backend,
            collaborators.verifier,
        );

        SidechainCore::new(stake_manager, checkpoint_manager)
    }
}

impl Default for SidechainCoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
