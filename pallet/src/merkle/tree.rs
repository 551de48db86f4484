use codec::{Decode, Encode};
use frame_support::pallet_prelude::RuntimeDebug;
use scale_info::TypeInfo;
use sp_std::{vec, vec::Vec};

use crate::hash::hash_pair;
use crate::merkle::zeroes::{zero_hashes, ZERO_LEAF};
use crate::merkle::MerkleError;
use crate::types::HashBytes;

/// Dense authenticated binary tree of fixed depth, used as the per-process
/// rollup accumulator. Leaf 0 is reserved and pre-set to the zero sentinel
/// at construction, which pins the empty-tree root to a known constant.
///
/// Only the leaves are persisted; ancestor hashes are recomputed on demand,
/// which keeps the stored record small at the cost of hashing work bounded
/// by the (small, configured) depth.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct CommitmentTree {
    depth: u8,
    leaves: Vec<HashBytes>,
}

impl CommitmentTree {
    pub fn new(depth: u8) -> Self {
        CommitmentTree {
            depth,
            leaves: vec![ZERO_LEAF],
        }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Total number of addressable leaves, sentinel included. Depths of 32
    /// or more saturate at `u32::MAX` instead of wrapping the shift.
    pub fn capacity(&self) -> u32 {
        1u32.checked_shl(self.depth.into()).unwrap_or(u32::MAX)
    }

    /// Writes `value` at `index`, implicitly zero-filling any gap. Ancestors
    /// are not cached, so no rehashing happens here.
    pub fn set_leaf(&mut self, index: u32, value: HashBytes) -> Result<(), MerkleError> {
        if index >= self.capacity() {
            return Err(MerkleError::LeafOutOfRange);
        }
        let index = index as usize;
        if index >= self.leaves.len() {
            self.leaves.resize(index + 1, ZERO_LEAF);
        }
        self.leaves[index] = value;
        Ok(())
    }

    pub fn root(&self) -> Result<HashBytes, MerkleError> {
        let levels = self.levels()?;
        levels[self.depth as usize]
            .first()
            .copied()
            .ok_or(MerkleError::HashFailed)
    }

    /// Inclusion witness for the leaf at `index`: one sibling per level,
    /// ordered leaf to root.
    pub fn witness(&self, index: u32) -> Result<InclusionProof, MerkleError> {
        if index >= self.capacity() {
            return Err(MerkleError::LeafOutOfRange);
        }
        let zeroes = zero_hashes(self.depth as usize)?;
        let levels = self.levels()?;
        let mut siblings = Vec::with_capacity(self.depth as usize);
        let mut idx = index as usize;
        for level in 0..self.depth as usize {
            let sibling = idx ^ 1;
            siblings.push(levels[level].get(sibling).copied().unwrap_or(zeroes[level]));
            idx >>= 1;
        }
        Ok(InclusionProof { siblings })
    }

    /// All node levels from the leaves up to the root. Right-hand gaps take
    /// the zero-subtree hash of their level.
    fn levels(&self) -> Result<Vec<Vec<HashBytes>>, MerkleError> {
        let zeroes = zero_hashes(self.depth as usize)?;
        let mut levels = Vec::with_capacity(self.depth as usize + 1);
        let mut nodes = self.leaves.clone();
        for level in 0..self.depth as usize {
            levels.push(nodes.clone());
            let mut next = Vec::with_capacity((nodes.len() + 1) / 2);
            for pair in nodes.chunks(2) {
                let left = pair[0];
                let right = if pair.len() == 2 { pair[1] } else { zeroes[level] };
                next.push(hash_pair(&left, &right).map_err(|_| MerkleError::HashFailed)?);
            }
            nodes = next;
        }
        levels.push(nodes);
        Ok(levels)
    }
}

/// Opaque sibling path proving a leaf's inclusion under a root. Recomputing
/// the root from the leaf and comparing is the sole authentication
/// primitive; a claimed tree state is never taken on trust.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct InclusionProof {
    siblings: Vec<HashBytes>,
}

impl InclusionProof {
    pub fn verify(
        &self,
        index: u32,
        value: &HashBytes,
        expected_root: &HashBytes,
    ) -> Result<bool, MerkleError> {
        let mut acc = *value;
        let mut idx = index;
        for sibling in &self.siblings {
            acc = if idx & 1 == 0 {
                hash_pair(&acc, sibling)
            } else {
                hash_pair(sibling, &acc)
            }
            .map_err(|_| MerkleError::HashFailed)?;
            idx >>= 1;
        }
        Ok(acc == *expected_root)
    }
}
