//! Binary Merkle tree over exit events
//!
//! Leaves are `blake3(0x00 ‖ data)`, inner nodes `blake3(0x01 ‖ left ‖ right)`.
//! A level with an odd node count promotes its last node unchanged, so a
//! proof carries no sibling for that level and verification needs the leaf
//! count to know where those gaps are.

use chain_types::Hash;
use thiserror::Error;

const LEAF_TAG: u8 = 0x00;
const NODE_TAG: u8 = 0x01;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("Merkle tree needs at least one leaf")]
    EmptyTree,

    #[error("Leaf index {index} out of range for {leaves} leaves")]
    IndexOutOfRange { index: usize, leaves: usize },

    #[error("not a member of merkle tree")]
    NotAMember,
}

fn hash_leaf(data: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_TAG]);
    hasher.update(data);
    Hash(*hasher.finalize().as_bytes())
}

fn hash_node(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_TAG]);
    hasher.update(left.as_ref());
    hasher.update(right.as_ref());
    Hash(*hasher.finalize().as_bytes())
}

/// All levels of the tree, leaves first, root last
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    pub fn new<I, D>(leaves: I) -> Result<Self, MerkleError>
    where
        I: IntoIterator<Item = D>,
        D: AsRef<[u8]>,
    {
        let mut level: Vec<Hash> = leaves.into_iter().map(|d| hash_leaf(d.as_ref())).collect();
        if level.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let mut levels = Vec::new();
        while level.len() > 1 {
            let next = level
                .chunks(2)
                .map(|pair| match pair.get(1) {
                    Some(right) => hash_node(&pair[0], right),
                    None => pair[0],
                })
                .collect();
            levels.push(level);
            level = next;
        }
        levels.push(level);

        Ok(Self { levels })
    }

    pub fn root(&self) -> Hash {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Position of the first leaf with this data
    pub fn leaf_index(&self, data: &[u8]) -> Option<usize> {
        let leaf = hash_leaf(data);
        self.levels[0].iter().position(|h| *h == leaf)
    }

    /// Sibling hashes from leaf `index` up to (excluding) the root. Levels
    /// where the node is promoted contribute nothing.
    pub fn generate_proof(&self, index: usize) -> Result<Vec<Hash>, MerkleError> {
        if index >= self.leaf_count() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                leaves: self.leaf_count(),
            });
        }

        let mut proof = Vec::with_capacity(self.levels.len() - 1);
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            if let Some(sibling) = level.get(position ^ 1) {
                proof.push(*sibling);
            }
            position /= 2;
        }

        Ok(proof)
    }
}

/// Recompute the root from a leaf and its path and compare it with `root`.
/// `leaf_count` is the size of the tree the path was taken from.
pub fn verify_proof(
    index: usize,
    leaf_count: usize,
    leaf: &[u8],
    proof: &[Hash],
    root: &Hash,
) -> Result<(), MerkleError> {
    if index >= leaf_count {
        return Err(MerkleError::NotAMember);
    }

    let mut computed = hash_leaf(leaf);
    let mut position = index;
    let mut width = leaf_count;
    let mut siblings = proof.iter();

    while width > 1 {
        let promoted = position == width - 1 && width % 2 == 1;
        if !promoted {
            let sibling = siblings.next().ok_or(MerkleError::NotAMember)?;
            computed = if position % 2 == 0 {
                hash_node(&computed, sibling)
            } else {
                hash_node(sibling, &computed)
            };
        }
        position /= 2;
        width = (width + 1) / 2;
    }

    if siblings.next().is_some() || computed != *root {
        return Err(MerkleError::NotAMember);
    }

    Ok(())
}
