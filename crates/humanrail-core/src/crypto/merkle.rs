//! Merkle tree over 32-byte leaf hashes
//!
//! Receipt batches commit to their receipt hashes with a binary SHA-256 tree.
//! Leaves are already digests, so they are used as-is at the bottom level.
//! Internal nodes are `H(left || right)`; an unpaired node is promoted to the
//! next level unchanged.

use super::hash::hash;
use serde::{Deserialize, Serialize};

/// Maximum depth of a tree (up to 2^32 leaves).
pub const MAX_MERKLE_DEPTH: u32 = 32;

/// Inclusion proof for one leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Sibling hashes from leaf to root. Levels where the node was promoted
    /// contribute no entry.
    pub sibling_path: Vec<[u8; 32]>,
    /// Index of the leaf in the original list
    pub leaf_index: u32,
    /// Number of leaves in the tree
    pub tree_size: u32,
}

/// Structural problems with a deserialized proof.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleValidationError {
    /// More siblings than any tree can have
    #[error("Sibling path length {actual} exceeds maximum depth {max}")]
    PathTooLong {
        /// Supplied path length
        actual: u32,
        /// Limit
        max: u32,
    },

    /// Leaf index does not fit the tree
    #[error("Leaf index {index} is out of bounds for tree size {size}")]
    LeafIndexOutOfBounds {
        /// Supplied index
        index: u32,
        /// Tree size
        size: u32,
    },

    /// Tree has no leaves
    #[error("Empty tree")]
    EmptyTree,
}

impl MerkleProof {
    /// Check proof invariants before verification.
    pub fn validate(&self) -> Result<(), MerkleValidationError> {
        if self.sibling_path.len() > MAX_MERKLE_DEPTH as usize {
            return Err(MerkleValidationError::PathTooLong {
                actual: self.sibling_path.len() as u32,
                max: MAX_MERKLE_DEPTH,
            });
        }
        if self.tree_size == 0 {
            return Err(MerkleValidationError::EmptyTree);
        }
        if self.leaf_index >= self.tree_size {
            return Err(MerkleValidationError::LeafIndexOutOfBounds {
                index: self.leaf_index,
                size: self.tree_size,
            });
        }
        Ok(())
    }
}

fn combine(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    hash(&combined)
}

fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => combine(left, right),
            // unpaired node is promoted unchanged
            _ => pair[0],
        })
        .collect()
}

/// Root over `leaves`. An empty list yields the all-zero root.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Inclusion proof for `leaves[leaf_index]`, or `None` if the index is out of range.
pub fn merkle_proof(leaves: &[[u8; 32]], leaf_index: usize) -> Option<MerkleProof> {
    if leaf_index >= leaves.len() {
        return None;
    }

    let mut level = leaves.to_vec();
    let mut index = leaf_index;
    let mut sibling_path = Vec::new();

    while level.len() > 1 {
        let sibling = index ^ 1;
        if sibling < level.len() {
            sibling_path.push(level[sibling]);
        }
        level = next_level(&level);
        index /= 2;
    }

    Some(MerkleProof {
        sibling_path,
        leaf_index: leaf_index as u32,
        tree_size: leaves.len() as u32,
    })
}

/// Verify that `leaf` is included under `root`.
///
/// The tree shape is reconstructed from `tree_size` so promoted levels are
/// skipped exactly as they were when the proof was generated.
pub fn verify_merkle_proof(proof: &MerkleProof, root: &[u8; 32], leaf: &[u8; 32]) -> bool {
    if proof.validate().is_err() {
        return false;
    }

    let mut current = *leaf;
    let mut index = proof.leaf_index as usize;
    let mut width = proof.tree_size as usize;
    let mut siblings = proof.sibling_path.iter();

    while width > 1 {
        let sibling = index ^ 1;
        if sibling < width {
            let Some(sibling_hash) = siblings.next() else {
                return false;
            };
            current = if index % 2 == 0 {
                combine(&current, sibling_hash)
            } else {
                combine(sibling_hash, &current)
            };
        }
        index /= 2;
        width = width.div_ceil(2);
    }

    siblings.next().is_none() && &current == root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u8) -> Vec<[u8; 32]> {
        (0..n).map(|i| hash(&[i])).collect()
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let l = leaves(1);
        assert_eq!(merkle_root(&l), l[0]);
        let proof = merkle_proof(&l, 0).unwrap();
        assert!(proof.sibling_path.is_empty());
        assert!(verify_merkle_proof(&proof, &l[0], &l[0]));
    }

    #[test]
    fn test_empty_root_is_zero() {
        assert_eq!(merkle_root(&[]), [0u8; 32]);
        assert!(merkle_proof(&[], 0).is_none());
    }

    #[test]
    fn test_odd_node_promoted() {
        let l = leaves(3);
        let expected = combine(&combine(&l[0], &l[1]), &l[2]);
        assert_eq!(merkle_root(&l), expected);
    }

    #[test]
    fn test_every_leaf_verifies() {
        for n in 1..=10u8 {
            let l = leaves(n);
            let root = merkle_root(&l);
            for (i, leaf) in l.iter().enumerate() {
                let proof = merkle_proof(&l, i).unwrap();
                assert!(verify_merkle_proof(&proof, &root, leaf), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn test_wrong_leaf_rejected() {
        let l = leaves(5);
        let root = merkle_root(&l);
        let proof = merkle_proof(&l, 2).unwrap();
        assert!(!verify_merkle_proof(&proof, &root, &l[3]));
    }

    #[test]
    fn test_malformed_proof_rejected() {
        let l = leaves(4);
        let root = merkle_root(&l);
        let mut proof = merkle_proof(&l, 1).unwrap();
        proof.leaf_index = 9;
        assert_eq!(
            proof.validate(),
            Err(MerkleValidationError::LeafIndexOutOfBounds { index: 9, size: 4 })
        );
        assert!(!verify_merkle_proof(&proof, &root, &l[1]));
    }
}
