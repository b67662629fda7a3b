//! Fixed-width identifiers and opaque key material

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Length of an account address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a hash digest in bytes
pub const HASH_LENGTH: usize = 32;

/// A 20-byte account identifier.
///
/// Ordering is plain byte order, which is the tie-breaker used when two
/// validators carry equal voting power.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    /// Counterparty of mint (stake) and burn (unstake) transfers
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    pub fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
        let arr: [u8; ADDRESS_LENGTH] = bytes.try_into().map_err(|_| TypesError::InvalidLength {
            kind: "address",
            expected: ADDRESS_LENGTH,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Left-pad the address into a 32-byte log topic
    pub fn to_topic(&self) -> Hash {
        let mut topic = [0u8; HASH_LENGTH];
        topic[HASH_LENGTH - ADDRESS_LENGTH..].copy_from_slice(&self.0);
        Hash(topic)
    }

    /// Take the low 20 bytes of a log topic
    pub fn from_topic(topic: &Hash) -> Self {
        let mut addr = [0u8; ADDRESS_LENGTH];
        addr.copy_from_slice(&topic.0[HASH_LENGTH - ADDRESS_LENGTH..]);
        Self(addr)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

/// A 32-byte digest
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Hash(pub [u8; HASH_LENGTH]);

impl Hash {
    /// Root of an empty exit-event tree
    pub const ZERO: Hash = Hash([0u8; HASH_LENGTH]);

    pub fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// blake3 digest of `data`
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Encode a u64 as a big-endian, left-padded topic
    pub fn from_u64(value: u64) -> Self {
        let mut out = [0u8; HASH_LENGTH];
        out[HASH_LENGTH - 8..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    /// Read the low 8 bytes as a big-endian u64.
    ///
    /// Returns `None` if any of the high bytes are set.
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..HASH_LENGTH - 8].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&self.0[HASH_LENGTH - 8..]);
        Some(u64::from_be_bytes(low))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Opaque BLS public key bytes.
///
/// Parsing and verification live behind the injected signature verifier.
#[derive(Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BlsPublicKey(pub Vec<u8>);

impl BlsPublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsPublicKey(0x{})", hex::encode(&self.0))
    }
}
