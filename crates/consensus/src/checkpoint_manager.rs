//! Checkpoint Manager - exit event capture, checkpoint submission and exit proofs
//!
//! Flow per finalized block:
//! 1. Save the block's exit events, backfilling any blocks missed since the
//!    last saved one
//! 2. Walk from the root chain's highest checkpoint to this block and submit
//!    every due block in order
//!
//! Exit proofs are served on demand from the stored events and the root
//! chain's checkpoint coverage.

use std::sync::Arc;

use chain_types::{AccountSet, ExitEvent, Hash, Header, Receipt};
use rootchain_bridge::{Checkpoint, CheckpointCommitter, CheckpointMetadata, SubmitCheckpoint};
use serde::{Deserialize, Serialize};
use state_store::ExitEventStore;

use crate::backend::{Blockchain, ConsensusBackend, SignatureVerifier};
use crate::error::ConsensusError;
use crate::events_getter::EventsGetter;
use crate::merkle::{verify_proof, MerkleError, MerkleTree};
use crate::types::{ConsensusConfig, PostBlockRequest};

/// Inclusion proof of one exit event in a submitted checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitProof {
    pub exit_event: ExitEvent,
    /// Position of the event among the checkpoint's leaves
    pub leaf_index: usize,
    /// Number of leaves in the checkpoint's tree
    pub leaf_count: usize,
    /// Sibling hashes from the leaf up to the root
    pub path: Vec<Hash>,
    /// Event root committed in the checkpoint
    pub root: Hash,
    /// Checkpoint block covering the event
    pub checkpoint_block: u64,
}

impl ExitProof {
    /// Check the proof against its own root
    pub fn verify(&self) -> Result<(), MerkleError> {
        verify_proof(
            self.leaf_index,
            self.leaf_count,
            &self.exit_event.encode(),
            &self.path,
            &self.root,
        )
    }
}

pub struct CheckpointManager {
    config: ConsensusConfig,
    store: ExitEventStore,
    committer: CheckpointCommitter,
    backend: Arc<dyn ConsensusBackend>,
    verifier: Arc<dyn SignatureVerifier>,
    exit_events: EventsGetter<ExitEvent>,
}

impl CheckpointManager {
    pub fn new(
        config: ConsensusConfig,
        store: ExitEventStore,
        committer: CheckpointCommitter,
        blockchain: Arc<dyn Blockchain>,
        backend: Arc<dyn ConsensusBackend>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let exit_events = EventsGetter::new(blockchain, config.exit_contract);
        Self {
            config,
            store,
            committer,
            backend,
            verifier,
            exit_events,
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn committer(&self) -> &CheckpointCommitter {
        &self.committer
    }

    /// Whether block `number` must be checkpointed
    pub fn is_checkpoint_block(&self, number: u64, is_epoch_ending: bool) -> bool {
        self.config.is_checkpoint_block(number, is_epoch_ending)
    }

    pub fn post_block(&self, req: &PostBlockRequest) -> Result<(), ConsensusError> {
        self.save_exit_events(req)?;

        if self.config.submit_checkpoints {
            let submitted = self.submit_checkpoints(&req.header, req.is_epoch_ending_block)?;
            if !submitted.is_empty() {
                tracing::debug!("Submitted checkpoints for blocks {:?}", submitted);
            }
        }

        Ok(())
    }

    /// Save exit events of the finalized block and of every block skipped
    /// since the last saved one, in ascending order.
    pub fn save_exit_events(&self, req: &PostBlockRequest) -> Result<(), ConsensusError> {
        let current = req.header.number;
        let last_saved = self.store.get_last_saved()?;

        if last_saved + 1 < current {
            tracing::info!(
                "Backfilling exit events of blocks {} to {}",
                last_saved + 1,
                current - 1
            );

            let missed = (last_saved + 1..current)
                .map(|number| self.exit_events.header(number))
                .collect::<Result<Vec<Header>, _>>()?;

            for (i, header) in missed.iter().enumerate() {
                // An epoch ends where the following block's epoch differs
                let next_epoch = missed.get(i + 1).map(Header::epoch).unwrap_or(req.epoch);
                let receipts = self.exit_events.receipts(header)?;
                self.save_block_exit_events(
                    header.number,
                    header.epoch(),
                    header.epoch() != next_epoch,
                    &receipts,
                )?;
            }
        }

        self.save_block_exit_events(current, req.epoch, req.is_epoch_ending_block, &req.receipts)
    }

    fn save_block_exit_events(
        &self,
        block: u64,
        epoch: u64,
        is_epoch_ending: bool,
        receipts: &[Receipt],
    ) -> Result<(), ConsensusError> {
        // Exits of an epoch-ending block settle under the next epoch
        let (epoch, block_number) = if is_epoch_ending {
            (epoch + 1, block + 1)
        } else {
            (epoch, block)
        };

        let events: Vec<ExitEvent> = self
            .exit_events
            .events_from_receipts(block, receipts)?
            .into_iter()
            .map(|event| event.with_position(epoch, block_number))
            .collect();

        for event in &events {
            tracing::debug!(
                "Exit event {} from {} to {} filed under epoch {}, block {}",
                event.id,
                event.sender,
                event.receiver,
                event.epoch,
                event.block_number
            );
        }

        self.store.insert_exit_events(&events, block)?;

        Ok(())
    }

    /// Submit every due block after the root chain's highest checkpoint up to
    /// `latest`, in increasing order. Returns the submitted block numbers.
    ///
    /// Blocks this node already submitted are skipped even when the root
    /// chain view still lags behind. The first failure aborts the walk.
    pub fn submit_checkpoints(
        &self,
        latest: &Header,
        is_epoch_ending: bool,
    ) -> Result<Vec<u64>, ConsensusError> {
        let last_checkpoint = self
            .committer
            .current_checkpoint_block()?
            .max(self.committer.last_submitted_block().unwrap_or_default());
        let mut submitted = Vec::new();

        if last_checkpoint >= latest.number {
            return Ok(submitted);
        }

        let mut header = if last_checkpoint + 1 == latest.number {
            latest.clone()
        } else {
            self.exit_events.header(last_checkpoint + 1)?
        };

        for number in last_checkpoint + 1..=latest.number {
            let (ending, following) = if number == latest.number {
                (is_epoch_ending, None)
            } else {
                let following = if number + 1 == latest.number {
                    latest.clone()
                } else {
                    self.exit_events.header(number + 1)?
                };
                (header.epoch() != following.epoch(), Some(following))
            };

            if self.is_checkpoint_block(number, ending) {
                self.encode_and_send(&header, ending)?;
                submitted.push(number);
            }

            if let Some(following) = following {
                header = following;
            }
        }

        Ok(submitted)
    }

    fn encode_and_send(&self, header: &Header, is_epoch_ending: bool) -> Result<(), ConsensusError> {
        let number = header.number;
        let epoch = header.epoch();

        let seal = header
            .extra
            .committed
            .as_ref()
            .ok_or(ConsensusError::MissingCommittedSeal(number))?;

        let current_set = self.backend.validators_at(number).map_err(|source| {
            ConsensusError::collaborator(format!("get validators at block {}", number), source)
        })?;

        let new_validator_set = if is_epoch_ending {
            match &header.extra.validators {
                Some(delta) => current_set
                    .apply_delta(delta)
                    .map_err(|source| ConsensusError::InvalidDelta { block: number, source })?,
                None => current_set.clone(),
            }
        } else {
            AccountSet::default()
        };

        let submit = SubmitCheckpoint {
            metadata: CheckpointMetadata {
                block_hash: header.hash,
                block_round: header.extra.checkpoint.block_round,
                current_validator_set_hash: current_set.hash(),
            },
            checkpoint: Checkpoint {
                epoch,
                block_number: number,
                event_root: self.build_event_root_at(epoch, number)?,
            },
            signature: seal.aggregated_signature.clone(),
            new_validator_set,
            bitmap: seal.bitmap.clone(),
        };

        self.verifier
            .verify_committed(&current_set, seal, &submit.signing_hash())
            .map_err(|source| ConsensusError::InvalidSeal { block: number, source })?;

        let event_root = submit.checkpoint.event_root;
        self.committer.submit(submit)?;

        tracing::info!(
            "Checkpoint for block {} (epoch {}, event root {}) accepted by root chain",
            number,
            epoch,
            event_root
        );

        Ok(())
    }

    /// Merkle root over all exit events of `epoch`, zero hash when there are none
    pub fn build_event_root(&self, epoch: u64) -> Result<Hash, ConsensusError> {
        self.build_event_root_at(epoch, u64::MAX)
    }

    /// Merkle root over the exit events of `epoch` filed at or before `block`
    pub fn build_event_root_at(&self, epoch: u64, block: u64) -> Result<Hash, ConsensusError> {
        let events = self.store.get_exit_events(epoch, |e| e.block_number <= block)?;
        Ok(event_root(&events)?)
    }

    /// Inclusion proof of exit `exit_id` in the checkpoint covering it
    pub fn generate_exit_proof(&self, exit_id: u64) -> Result<ExitProof, ConsensusError> {
        let exit_event = self.store.get_exit_event(exit_id)?;

        let checkpoint_block = self
            .committer
            .checkpoint_block_for(exit_event.block_number)?
            .ok_or(ConsensusError::NotYetCheckpointed(exit_id))?;

        build_exit_proof(&self.store, exit_event, checkpoint_block)
    }

    /// Inclusion proofs of every exit event in the root chain's latest
    /// checkpoint, in leaf order. Empty before the first checkpoint.
    pub fn generate_slash_exit_proofs(&self) -> Result<Vec<ExitProof>, ConsensusError> {
        let checkpoint_block = self.committer.current_checkpoint_block()?;
        if checkpoint_block == 0 {
            return Ok(Vec::new());
        }

        let epoch = self.exit_events.header(checkpoint_block)?.epoch();
        let events = self
            .store
            .get_exit_events(epoch, |e| e.block_number <= checkpoint_block)?;
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let tree = MerkleTree::new(events.iter().map(ExitEvent::encode))?;
        let proofs = events
            .into_iter()
            .enumerate()
            .map(|(leaf_index, exit_event)| {
                Ok(ExitProof {
                    exit_event,
                    leaf_index,
                    leaf_count: tree.leaf_count(),
                    path: tree.generate_proof(leaf_index)?,
                    root: tree.root(),
                    checkpoint_block,
                })
            })
            .collect::<Result<Vec<_>, MerkleError>>()?;

        tracing::debug!(
            "Generated {} slash exit proofs for checkpoint block {} (epoch {})",
            proofs.len(),
            checkpoint_block,
            epoch
        );

        Ok(proofs)
    }
}

/// Merkle root over exit events in the given order, zero hash when empty
pub fn event_root(events: &[ExitEvent]) -> Result<Hash, MerkleError> {
    if events.is_empty() {
        return Ok(Hash::ZERO);
    }

    let tree = MerkleTree::new(events.iter().map(ExitEvent::encode))?;
    Ok(tree.root())
}

/// Inclusion proof of a stored exit event in the checkpoint at `checkpoint_block`.
///
/// The tree covers the event's epoch up to the checkpoint block, the same
/// leaves the checkpoint's event root was built from.
pub fn build_exit_proof(
    store: &ExitEventStore,
    exit_event: ExitEvent,
    checkpoint_block: u64,
) -> Result<ExitProof, ConsensusError> {
    let events = store.get_exit_events(exit_event.epoch, |e| e.block_number <= checkpoint_block)?;
    let tree = MerkleTree::new(events.iter().map(ExitEvent::encode))?;

    let leaf_index = tree
        .leaf_index(&exit_event.encode())
        .ok_or(MerkleError::NotAMember)?;
    let path = tree.generate_proof(leaf_index)?;

    tracing::debug!(
        "Generated proof for exit {} at leaf {} of checkpoint block {}",
        exit_event.id,
        leaf_index,
        checkpoint_block
    );

    Ok(ExitProof {
        exit_event,
        leaf_index,
        leaf_count: tree.leaf_count(),
        path,
        root: tree.root(),
        checkpoint_block,
    })
}
