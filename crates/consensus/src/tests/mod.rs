//! Integration tests for the consensus core, driven through mock collaborators


use std::collections::HashMap;
use std::sync::Arc;

use chain_types::{
    AccountSet, Address, BigUint, Bitmap, BlsPublicKey, CommittedSeal, ExitEvent, ExtraData, Hash,
    Header, Log, Receipt, ReceiptStatus, TransferEvent, ValidatorMetadata,
};
use parking_lot::Mutex;
use rootchain_bridge::{
    CheckpointBlockResponse, RootChainCall, RootReceipt, SubmitCheckpoint, TxRelayer, TxSigner,
    ValidatorInfo,
};
use state_store::StateStore;

use crate::backend::{Blockchain, ConsensusBackend, SignatureVerifier};
use crate::hooks::{Collaborators, SidechainCore, SidechainCoreBuilder, ValidatorSetHooks};
use crate::types::{ConsensusConfig, PostBlockRequest, PostEpochRequest};

pub(crate) const STAKE_CONTRACT: Address = Address([0x51; 20]);
pub(crate) const EXIT_CONTRACT: Address = Address([0xe1; 20]);

pub(crate) fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

pub(crate) fn bls_key(byte: u8) -> BlsPublicKey {
    BlsPublicKey(vec![byte; 48])
}

pub(crate) fn validator(byte: u8, power: u64) -> ValidatorMetadata {
    ValidatorMetadata::new(addr(byte), BigUint::from(power), Some(bls_key(byte)))
}

pub(crate) fn stake_log(to: Address, amount: u64) -> Log {
    TransferEvent {
        from: Address::ZERO,
        to,
        value: BigUint::from(amount),
    }
    .to_log(STAKE_CONTRACT)
}

pub(crate) fn unstake_log(from: Address, amount: u64) -> Log {
    TransferEvent {
        from,
        to: Address::ZERO,
        value: BigUint::from(amount),
    }
    .to_log(STAKE_CONTRACT)
}

pub(crate) fn exit_log(id: u64) -> Log {
    ExitEvent {
        id,
        epoch: 0,
        block_number: 0,
        sender: addr(0xa0),
        receiver: addr(0xb0),
        data: id.to_be_bytes().to_vec(),
    }
    .to_log(EXIT_CONTRACT)
}

/// Epoch of block `n` when every epoch is two blocks long: blocks 1, 3, 5, ...
/// end their epoch.
pub(crate) fn epoch_of(number: u64) -> u64 {
    number / 2 + 1
}

pub(crate) fn is_epoch_ending(number: u64) -> bool {
    epoch_of(number) != epoch_of(number + 1)
}

/// Finalized-chain mock; records which blocks were fetched
#[derive(Default)]
pub(crate) struct MockBlockchain {
    headers: Mutex<HashMap<u64, Header>>,
    receipts: Mutex<HashMap<Hash, Vec<Receipt>>>,
    pub fetched: Mutex<Vec<u64>>,
}

impl MockBlockchain {
    pub fn insert_block(&self, header: Header, receipts: Vec<Receipt>) {
        self.receipts.lock().insert(header.hash, receipts);
        self.headers.lock().insert(header.number, header);
    }
}

impl Blockchain for MockBlockchain {
    fn header_by_number(&self, number: u64) -> Option<Header> {
        self.fetched.lock().push(number);
        self.headers.lock().get(&number).cloned()
    }

    fn receipts_by_hash(&self, hash: &Hash) -> anyhow::Result<Vec<Receipt>> {
        self.receipts
            .lock()
            .get(hash)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no receipts for block {}", hash))
    }
}

/// Root-chain mock: validator registry plus checkpoint manager contract
#[derive(Default)]
pub(crate) struct MockRootChain {
    keys: Mutex<HashMap<Address, Vec<u8>>>,
    current_checkpoint: Mutex<u64>,
    pub submitted: Mutex<Vec<SubmitCheckpoint>>,
    pub fail_sends: Mutex<bool>,
    pub fail_calls: Mutex<bool>,
}

impl MockRootChain {
    pub fn register(&self, address: Address, key: BlsPublicKey) {
        self.keys.lock().insert(address, key.0);
    }

    pub fn set_current_checkpoint(&self, block: u64) {
        *self.current_checkpoint.lock() = block;
    }

    pub fn submitted_blocks(&self) -> Vec<u64> {
        self.submitted
            .lock()
            .iter()
            .map(|s| s.checkpoint.block_number)
            .collect()
    }
}

impl TxRelayer for MockRootChain {
    fn call(&self, _from: Address, _to: Address, input: &[u8]) -> anyhow::Result<Vec<u8>> {
        if *self.fail_calls.lock() {
            anyhow::bail!("root chain unreachable");
        }

        let output = match RootChainCall::decode(input)? {
            RootChainCall::GetValidator { validator } => {
                let info = ValidatorInfo {
                    bls_key: self.keys.lock().get(&validator).cloned().unwrap_or_default(),
                    ..Default::default()
                };
                borsh::to_vec(&info)?
            }
            RootChainCall::CurrentCheckpointBlockNumber => {
                borsh::to_vec(&*self.current_checkpoint.lock())?
            }
            RootChainCall::GetCheckpointBlock { block_number } => {
                let found = self
                    .submitted
                    .lock()
                    .iter()
                    .map(|s| s.checkpoint.block_number)
                    .find(|b| *b >= block_number);
                borsh::to_vec(&CheckpointBlockResponse {
                    is_found: found.is_some(),
                    checkpoint_block: found.unwrap_or_default(),
                })?
            }
            RootChainCall::SubmitCheckpoint(_) => anyhow::bail!("submit is not a view"),
        };

        Ok(output)
    }

    fn send_transaction(
        &self,
        _to: Address,
        input: Vec<u8>,
        _signer: &dyn TxSigner,
    ) -> anyhow::Result<RootReceipt> {
        if *self.fail_sends.lock() {
            anyhow::bail!("connection reset");
        }

        let tx_hash = Hash::digest(&input);
        let RootChainCall::SubmitCheckpoint(submit) = RootChainCall::decode(&input)? else {
            anyhow::bail!("unexpected transaction");
        };

        let mut current = self.current_checkpoint.lock();
        if submit.checkpoint.block_number <= *current {
            return Ok(RootReceipt {
                status: ReceiptStatus::Failed,
                tx_hash,
            });
        }

        *current = submit.checkpoint.block_number;
        self.submitted.lock().push(submit);

        Ok(RootReceipt {
            status: ReceiptStatus::Success,
            tx_hash,
        })
    }
}

pub(crate) struct StaticBackend {
    pub validators: AccountSet,
}

impl ConsensusBackend for StaticBackend {
    fn validators_at(&self, _number: u64) -> anyhow::Result<AccountSet> {
        Ok(self.validators.clone())
    }
}

/// Accepts any seal and records the messages it was asked about
#[derive(Default)]
pub(crate) struct RecordingVerifier {
    pub messages: Mutex<Vec<Hash>>,
    pub reject: Mutex<bool>,
}

impl SignatureVerifier for RecordingVerifier {
    fn verify_committed(
        &self,
        _validators: &AccountSet,
        seal: &CommittedSeal,
        message: &Hash,
    ) -> anyhow::Result<()> {
        self.messages.lock().push(*message);
        if *self.reject.lock() || seal.bitmap.is_empty() {
            anyhow::bail!("quorum not reached");
        }
        Ok(())
    }
}

pub(crate) struct TestSigner;

impl TxSigner for TestSigner {
    fn address(&self) -> Address {
        addr(0xfe)
    }

    fn sign(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(Hash::digest(payload).as_bytes().to_vec())
    }
}

pub(crate) fn genesis_set() -> AccountSet {
    AccountSet::new(vec![validator(1, 100), validator(2, 100), validator(3, 100)])
}

/// A sidechain with two-block epochs, a mocked root chain and a temporary store
pub(crate) struct TestChain {
    pub store: StateStore,
    pub blockchain: Arc<MockBlockchain>,
    pub root: Arc<MockRootChain>,
    pub verifier: Arc<RecordingVerifier>,
    pub core: SidechainCore,
    parent: Hash,
}

impl TestChain {
    pub fn new(config: ConsensusConfig) -> Self {
        Self::with_store(config, StateStore::temporary().unwrap())
    }

    pub fn with_store(config: ConsensusConfig, store: StateStore) -> Self {
        let blockchain = Arc::new(MockBlockchain::default());
        let root = Arc::new(MockRootChain::default());
        let verifier = Arc::new(RecordingVerifier::default());

        let core = SidechainCoreBuilder::new()
            .config(config)
            .stake_contract(STAKE_CONTRACT)
            .exit_contract(EXIT_CONTRACT)
            .build(
                &store,
                Collaborators {
                    relayer: root.clone(),
                    signer: Arc::new(TestSigner),
                    blockchain: blockchain.clone(),
                    backend: Arc::new(StaticBackend {
                        validators: genesis_set(),
                    }),
                    verifier: verifier.clone(),
                },
            );

        Self {
            store,
            blockchain,
            root,
            verifier,
            core,
            parent: Hash::ZERO,
        }
    }

    /// Default test chain: epoch-end checkpoints only, genesis ledger seeded
    pub fn started() -> Self {
        let chain = Self::new(ConsensusConfig {
            checkpoint_interval: 100,
            ..Default::default()
        });
        chain.start();
        chain
    }

    pub fn start(&self) {
        self.core
            .on_new_epoch(&PostEpochRequest {
                new_epoch_id: 1,
                validator_set: genesis_set(),
            })
            .unwrap();
    }

    /// Build the next header, signed by the whole genesis set
    pub fn next_header(&mut self, number: u64) -> Header {
        let mut bitmap = Bitmap::new();
        for i in 0..genesis_set().len() {
            bitmap.set(i);
        }

        let mut extra = ExtraData {
            committed: Some(CommittedSeal {
                bitmap,
                aggregated_signature: vec![0x5e; 96],
            }),
            ..Default::default()
        };
        extra.checkpoint.epoch_number = epoch_of(number);
        extra.checkpoint.block_round = 0;

        let header = Header::new(number, self.parent, extra);
        self.parent = header.hash;
        header
    }

    /// Finalize a block made of one successful receipt per log
    pub fn produce(&mut self, number: u64, logs: Vec<Log>) -> PostBlockRequest {
        let header = self.next_header(number);
        let receipts: Vec<Receipt> = logs.into_iter().map(|l| Receipt::success(vec![l])).collect();
        self.blockchain.insert_block(header.clone(), receipts.clone());

        PostBlockRequest {
            header,
            receipts,
            epoch: epoch_of(number),
            is_epoch_ending_block: is_epoch_ending(number),
        }
    }

    /// Produce and process a block
    pub fn finalize(&mut self, number: u64, logs: Vec<Log>) {
        let req = self.produce(number, logs);
        self.core.on_finalized_block(&req).unwrap();
    }
}
