//! Checkpoint Committer - submits sidechain checkpoints to the root chain

use std::sync::Arc;

use chain_types::Address;
use parking_lot::RwLock;

use crate::contracts::{decode_output, CheckpointBlockResponse, RootChainCall, SubmitCheckpoint};
use crate::error::BridgeError;
use crate::relayer::{RootReceipt, TxRelayer, TxSigner};

/// Talks to the root-chain checkpoint manager contract
pub struct CheckpointCommitter {
    relayer: Arc<dyn TxRelayer>,
    /// Signer for submission transactions
    signer: Arc<dyn TxSigner>,
    /// Root-chain checkpoint manager contract
    checkpoint_manager: Address,
    /// Last block this node submitted successfully
    last_submitted_block: RwLock<Option<u64>>,
}

impl CheckpointCommitter {
    pub fn new(
        relayer: Arc<dyn TxRelayer>,
        signer: Arc<dyn TxSigner>,
        checkpoint_manager: Address,
    ) -> Self {
        Self {
            relayer,
            signer,
            checkpoint_manager,
            last_submitted_block: RwLock::new(None),
        }
    }

    pub fn checkpoint_manager(&self) -> Address {
        self.checkpoint_manager
    }

    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    fn view<T: borsh::BorshDeserialize>(&self, call: RootChainCall) -> Result<T, BridgeError> {
        let output = self
            .relayer
            .call(self.signer.address(), self.checkpoint_manager, &call.encode())
            .map_err(|source| BridgeError::Call {
                function: call.name(),
                source,
            })?;

        decode_output(call.name(), &output)
    }

    /// Highest sidechain block already checkpointed on the root chain
    pub fn current_checkpoint_block(&self) -> Result<u64, BridgeError> {
        self.view(RootChainCall::CurrentCheckpointBlockNumber)
    }

    /// Checkpoint block covering `block_number`, `None` if not yet submitted
    pub fn checkpoint_block_for(&self, block_number: u64) -> Result<Option<u64>, BridgeError> {
        let response: CheckpointBlockResponse =
            self.view(RootChainCall::GetCheckpointBlock { block_number })?;

        Ok(response.is_found.then_some(response.checkpoint_block))
    }

    /// Send a checkpoint and wait for its receipt
    pub fn submit(&self, checkpoint: SubmitCheckpoint) -> Result<RootReceipt, BridgeError> {
        let block_number = checkpoint.checkpoint.block_number;
        let call = RootChainCall::SubmitCheckpoint(checkpoint);

        let receipt = self
            .relayer
            .send_transaction(self.checkpoint_manager, call.encode(), self.signer.as_ref())
            .map_err(|source| BridgeError::Send {
                function: call.name(),
                source,
            })?;

        if !receipt.is_success() {
            return Err(BridgeError::SubmissionFailed(block_number));
        }

        *self.last_submitted_block.write() = Some(block_number);

        tracing::info!(
            "Checkpoint submitted for block {}, tx {}",
            block_number,
            receipt.tx_hash
        );

        Ok(receipt)
    }

    /// Last block this node submitted, if any
    pub fn last_submitted_block(&self) -> Option<u64> {
        *self.last_submitted_block.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::Checkpoint;
    use chain_types::{Hash, ReceiptStatus};
    use parking_lot::Mutex;

    struct FixedSigner;

    impl TxSigner for FixedSigner {
        fn address(&self) -> Address {
            Address::new([0xaa; 20])
        }

        fn sign(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
            Ok(Hash::digest(payload).0.to_vec())
        }
    }

    /// Answers view calls from a fixed output and records sent inputs
    struct ScriptedRelayer {
        view_output: Vec<u8>,
        status: ReceiptStatus,
        sent: Mutex<Vec<RootChainCall>>,
    }

    impl TxRelayer for ScriptedRelayer {
        fn call(&self, _from: Address, _to: Address, _input: &[u8]) -> anyhow::Result<Vec<u8>> {
            Ok(self.view_output.clone())
        }

        fn send_transaction(
            &self,
            _to: Address,
            input: Vec<u8>,
            _signer: &dyn TxSigner,
        ) -> anyhow::Result<RootReceipt> {
            self.sent.lock().push(RootChainCall::decode(&input)?);
            Ok(RootReceipt {
                status: self.status,
                tx_hash: Hash::digest(&input),
            })
        }
    }

    fn committer(view_output: Vec<u8>, status: ReceiptStatus) -> (Arc<ScriptedRelayer>, CheckpointCommitter) {
        let relayer = Arc::new(ScriptedRelayer {
            view_output,
            status,
            sent: Mutex::new(Vec::new()),
        });
        let committer =
            CheckpointCommitter::new(relayer.clone(), Arc::new(FixedSigner), Address::new([0xcc; 20]));
        (relayer, committer)
    }

    #[test]
    fn test_current_checkpoint_block() {
        let (_, committer) = committer(borsh::to_vec(&16u64).unwrap(), ReceiptStatus::Success);
        assert_eq!(committer.current_checkpoint_block().unwrap(), 16);
    }

    #[test]
    fn test_checkpoint_block_not_found() {
        let response = CheckpointBlockResponse {
            is_found: false,
            checkpoint_block: 0,
        };
        let (_, committer) = committer(borsh::to_vec(&response).unwrap(), ReceiptStatus::Success);
        assert_eq!(committer.checkpoint_block_for(5).unwrap(), None);
    }

    #[test]
    fn test_submit_records_last_block() {
        let (relayer, committer) = committer(Vec::new(), ReceiptStatus::Success);
        let submit = SubmitCheckpoint {
            checkpoint: Checkpoint {
                epoch: 1,
                block_number: 8,
                event_root: Hash::ZERO,
            },
            ..Default::default()
        };

        committer.submit(submit.clone()).unwrap();
        assert_eq!(committer.last_submitted_block(), Some(8));
        assert_eq!(relayer.sent.lock().as_slice(), &[RootChainCall::SubmitCheckpoint(submit)]);
    }

    #[test]
    fn test_failed_receipt_is_error() {
        let (_, committer) = committer(Vec::new(), ReceiptStatus::Failed);
        let mut submit = SubmitCheckpoint::default();
        submit.checkpoint.block_number = 3;

        let err = committer.submit(submit).unwrap_err();
        assert!(matches!(err, BridgeError::SubmissionFailed(3)));
        assert_eq!(committer.last_submitted_block(), None);
    }
}
