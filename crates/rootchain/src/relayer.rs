//! Blocking root-chain transport, implemented outside this workspace

use chain_types::{Address, Hash, ReceiptStatus};

/// Receipt of a transaction included on the root chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootReceipt {
    pub status: ReceiptStatus,
    pub tx_hash: Hash,
}

impl RootReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Signs root-chain transactions; key custody stays with the implementor
pub trait TxSigner: Send + Sync {
    fn address(&self) -> Address;

    fn sign(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Root-chain RPC access.
///
/// Both calls block until the root chain answers. Timeouts and retries
/// belong to the implementation; errors are returned as-is.
pub trait TxRelayer: Send + Sync {
    /// Execute a view function and return its raw output
    fn call(&self, from: Address, to: Address, input: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Sign, send and wait for the receipt of a state-changing call
    fn send_transaction(
        &self,
        to: Address,
        input: Vec<u8>,
        signer: &dyn TxSigner,
    ) -> anyhow::Result<RootReceipt>;
}
