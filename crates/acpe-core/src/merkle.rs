//! Merkle tree over fixed-size chunks.
//!
//! Leaves are `SHA-256(0x00 ‖ chunk)`, inner nodes `SHA-256(0x01 ‖ left ‖ right)`.
//! An odd node at the end of a level is promoted unchanged. Empty input is a
//! single empty chunk.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, Result};

/// Default chunk size for share integrity trees.
pub const DEFAULT_MERKLE_CHUNK_SIZE: usize = 4096;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// A 32-byte tree node.
pub type NodeHash = [u8; 32];

fn leaf_hash(chunk: &[u8]) -> NodeHash {
    let mut h = Sha256::new();
    h.update([LEAF_PREFIX]);
    h.update(chunk);
    h.finalize().into()
}

fn node_hash(left: &NodeHash, right: &NodeHash) -> NodeHash {
    let mut h = Sha256::new();
    h.update([NODE_PREFIX]);
    h.update(left);
    h.update(right);
    h.finalize().into()
}

/// Which side a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// Inclusion proof for one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub chunk_index: usize,
    pub siblings: Vec<(Side, NodeHash)>,
}

/// A fully built tree; keeps every level.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<NodeHash>>,
    chunk_size: usize,
}

impl MerkleTree {
    /// Build a tree over `data` split into `chunk_size` pieces.
    pub fn build(data: &[u8], chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CryptoError::Malformed("zero merkle chunk size".into()));
        }
        let leaves: Vec<NodeHash> = if data.is_empty() {
            vec![leaf_hash(&[])]
        } else {
            data.chunks(chunk_size).map(leaf_hash).collect()
        };

        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let next = level
                .chunks(2)
                .map(|pair| match pair {
                    [l, r] => node_hash(l, r),
                    _ => pair[0],
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { levels, chunk_size })
    }

    /// The root hash.
    pub fn root(&self) -> NodeHash {
        // `build` always leaves a single-node top level.
        self.levels
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or_else(|| leaf_hash(&[]))
    }

    pub fn chunk_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Inclusion proof for chunk `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.chunk_count() {
            return None;
        }
        let mut siblings = Vec::new();
        let mut i = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = if i % 2 == 0 {
                level.get(i + 1).map(|h| (Side::Right, *h))
            } else {
                Some((Side::Left, level[i - 1]))
            };
            siblings.extend(sibling);
            i /= 2;
        }
        Some(MerkleProof {
            chunk_index: index,
            siblings,
        })
    }
}

/// Root of `data` without keeping the tree.
pub fn merkle_root(data: &[u8], chunk_size: usize) -> Result<NodeHash> {
    MerkleTree::build(data, chunk_size).map(|t| t.root())
}

/// Check that `chunk` is included under `root`.
pub fn verify_proof(root: &NodeHash, chunk: &[u8], proof: &MerkleProof) -> bool {
    let computed = proof
        .siblings
        .iter()
        .fold(leaf_hash(chunk), |acc, (side, sibling)| match side {
            Side::Left => node_hash(sibling, &acc),
            Side::Right => node_hash(&acc, sibling),
        });
    bool::from(crate::hash::ct_eq(&computed, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_deterministic() {
        let data = vec![3u8; 10_000];
        assert_eq!(merkle_root(&data, 4096).unwrap(), merkle_root(&data, 4096).unwrap());
    }

    #[test]
    fn test_single_byte_change_changes_root() {
        let mut data = vec![3u8; 10_000];
        let before = merkle_root(&data, 1024).unwrap();
        data[9_999] ^= 1;
        assert_ne!(before, merkle_root(&data, 1024).unwrap());
    }

    #[test]
    fn test_chunk_size_changes_root() {
        let data = vec![3u8; 100];
        assert_ne!(merkle_root(&data, 10).unwrap(), merkle_root(&data, 20).unwrap());
    }

    #[test]
    fn test_empty_input() {
        let tree = MerkleTree::build(&[], 16).unwrap();
        assert_eq!(tree.chunk_count(), 1);
        let proof = tree.proof(0).unwrap();
        assert!(verify_proof(&tree.root(), &[], &proof));
    }

    #[test]
    fn test_proofs_verify_for_every_chunk() {
        let data: Vec<u8> = (0..=254u8).cycle().take(7 * 16 + 3).collect();
        let tree = MerkleTree::build(&data, 16).unwrap();
        assert_eq!(tree.chunk_count(), 8);
        for (i, chunk) in data.chunks(16).enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify_proof(&tree.root(), chunk, &proof), "chunk {i}");
            assert!(!verify_proof(&tree.root(), b"forged", &proof));
        }
        assert!(tree.proof(8).is_none());
    }

    #[test]
    fn test_odd_leaf_count() {
        let data = vec![9u8; 5 * 8];
        let tree = MerkleTree::build(&data, 8).unwrap();
        let proof = tree.proof(4).unwrap();
        assert!(verify_proof(&tree.root(), &data[32..], &proof));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(MerkleTree::build(b"x", 0).is_err());
    }
}
