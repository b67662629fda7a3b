//! Collaborators supplied by the surrounding node

use chain_types::{AccountSet, CommittedSeal, Hash, Header, Receipt};

/// Read access to the node's finalized chain
pub trait Blockchain: Send + Sync {
    fn header_by_number(&self, number: u64) -> Option<Header>;

    fn receipts_by_hash(&self, hash: &Hash) -> anyhow::Result<Vec<Receipt>>;
}

/// Validator sets as tracked by the consensus engine
pub trait ConsensusBackend: Send + Sync {
    /// Active validator set that finalized block `number`
    fn validators_at(&self, number: u64) -> anyhow::Result<AccountSet>;
}

/// Stateless aggregated-signature check.
///
/// Cryptography lives in the implementation; this crate only decides what
/// is verified against which validator set.
pub trait SignatureVerifier: Send + Sync {
    fn verify_committed(
        &self,
        validators: &AccountSet,
        seal: &CommittedSeal,
        message: &Hash,
    ) -> anyhow::Result<()>;
}
