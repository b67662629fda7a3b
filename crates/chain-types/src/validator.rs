//! Validator metadata, ordered validator sets and the positional set delta

use std::cmp::Ordering;
use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::primitives::{Address, BlsPublicKey, Hash};

/// Stake and identity record of a single validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorMetadata {
    pub address: Address,
    /// Stake-derived weight, never negative
    pub voting_power: BigUint,
    /// Signing key, `None` until resolved from the root chain
    pub bls_key: Option<BlsPublicKey>,
    /// Always `voting_power > 0`
    pub is_active: bool,
}

impl ValidatorMetadata {
    pub fn new(address: Address, voting_power: BigUint, bls_key: Option<BlsPublicKey>) -> Self {
        let is_active = !voting_power.is_zero();
        Self {
            address,
            voting_power,
            bls_key,
            is_active,
        }
    }

    /// Re-derive the active flag from the voting power
    pub fn refresh_active(&mut self) {
        self.is_active = !self.voting_power.is_zero();
    }

    /// Total order used for validator selection: voting power descending,
    /// then address bytes ascending.
    pub fn selection_cmp(&self, other: &Self) -> Ordering {
        other
            .voting_power
            .cmp(&self.voting_power)
            .then_with(|| self.address.cmp(&other.address))
    }
}

impl fmt::Display for ValidatorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self
            .bls_key
            .as_ref()
            .map(|k| hex::encode(k.as_bytes()))
            .unwrap_or_default();
        write!(f, "{}:{}:{}:{}", self.address, self.voting_power, key, self.is_active)
    }
}

// BigUint has no borsh impl; voting power travels as big-endian bytes.
impl BorshSerialize for ValidatorMetadata {
    fn serialize<W: borsh::io::Write>(&self, writer: &mut W) -> Result<(), borsh::io::Error> {
        BorshSerialize::serialize(&self.address, writer)?;
        BorshSerialize::serialize(&self.voting_power.to_bytes_be(), writer)?;
        BorshSerialize::serialize(&self.bls_key, writer)?;
        BorshSerialize::serialize(&self.is_active, writer)
    }
}

impl BorshDeserialize for ValidatorMetadata {
    fn deserialize_reader<R: borsh::io::Read>(reader: &mut R) -> Result<Self, borsh::io::Error> {
        let address = Address::deserialize_reader(reader)?;
        let power_bytes = Vec::<u8>::deserialize_reader(reader)?;
        let bls_key = Option::<BlsPublicKey>::deserialize_reader(reader)?;
        let is_active = bool::deserialize_reader(reader)?;
        Ok(Self {
            address,
            voting_power: BigUint::from_bytes_be(&power_bytes),
            bls_key,
            is_active,
        })
    }
}

/// Ordered list of validators; position matters for the removal bitmap
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct AccountSet(pub Vec<ValidatorMetadata>);

impl AccountSet {
    pub fn new(validators: Vec<ValidatorMetadata>) -> Self {
        Self(validators)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatorMetadata> {
        self.0.iter()
    }

    pub fn push(&mut self, validator: ValidatorMetadata) {
        self.0.push(validator);
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.0.iter().map(|v| v.address).collect()
    }

    pub fn index_of(&self, address: &Address) -> Option<usize> {
        self.0.iter().position(|v| v.address == *address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.index_of(address).is_some()
    }

    pub fn get(&self, address: &Address) -> Option<&ValidatorMetadata> {
        self.0.iter().find(|v| v.address == *address)
    }

    /// blake3 digest over the canonical encoding of the whole set
    pub fn hash(&self) -> Hash {
        let bytes = borsh::to_vec(self).expect("AccountSet serialization should not fail");
        Hash::digest(&bytes)
    }

    /// Build the next active set from this one and a delta.
    ///
    /// Removed positions are dropped first, added validators are appended in
    /// delta order, updated validators replace their entry in place.
    pub fn apply_delta(&self, delta: &ValidatorSetDelta) -> Result<AccountSet, TypesError> {
        if delta.is_empty() {
            return Ok(self.clone());
        }

        if let Some(index) = delta.removed.iter_set().find(|i| *i >= self.len()) {
            return Err(TypesError::RemovedIndexOutOfRange {
                index,
                len: self.len(),
            });
        }

        let mut next: Vec<ValidatorMetadata> = self
            .0
            .iter()
            .enumerate()
            .filter(|(i, _)| !delta.removed.is_set(*i))
            .map(|(_, v)| v.clone())
            .collect();

        for added in delta.added.iter() {
            if next.iter().any(|v| v.address == added.address) {
                return Err(TypesError::AddedValidatorExists(added.address.to_string()));
            }
            next.push(added.clone());
        }

        for updated in delta.updated.iter() {
            let slot = next
                .iter_mut()
                .find(|v| v.address == updated.address)
                .ok_or_else(|| TypesError::UpdatedValidatorMissing(updated.address.to_string()))?;
            *slot = updated.clone();
        }

        Ok(AccountSet(next))
    }
}

impl From<Vec<ValidatorMetadata>> for AccountSet {
    fn from(validators: Vec<ValidatorMetadata>) -> Self {
        Self(validators)
    }
}

impl<'a> IntoIterator for &'a AccountSet {
    type Item = &'a ValidatorMetadata;
    type IntoIter = std::slice::Iter<'a, ValidatorMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Bit-per-position set. Bit `i` lives in byte `i / 8` under mask `1 << (i % 8)`.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Bitmap(pub Vec<u8>);

impl Bitmap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of addressable bits
    pub fn len(&self) -> usize {
        self.0.len() * 8
    }

    /// True when no bit is set
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn set(&mut self, index: usize) {
        let byte = index / 8;
        if byte >= self.0.len() {
            self.0.resize(byte + 1, 0);
        }
        self.0[byte] |= 1 << (index % 8);
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.0
            .get(index / 8)
            .map(|b| b & (1 << (index % 8)) != 0)
            .unwrap_or(false)
    }

    /// Indices of all set bits, ascending
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |i| self.is_set(*i))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Minimal diff transforming one ordered active set into the next
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ValidatorSetDelta {
    /// Validators entering the set, with resolved signing keys
    pub added: AccountSet,
    /// Validators in both sets whose voting power changed
    pub updated: AccountSet,
    /// Positions in the previous ordered set that are dropped
    pub removed: Bitmap,
}

impl ValidatorSetDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

impl fmt::Display for ValidatorSetDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let removed: Vec<usize> = self.removed.iter_set().collect();
        write!(
            f,
            "added={:?} updated={:?} removed={:?}",
            self.added.addresses(),
            self.updated.addresses(),
            removed
        )
    }
}
