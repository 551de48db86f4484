use codec::{Decode, Encode};
use frame_support::pallet_prelude::RuntimeDebug;
use scale_info::TypeInfo;
use sp_std::{collections::btree_map::BTreeMap, vec::Vec};

use crate::hash::{hash_pair, hash_triple};
use crate::merkle::zeroes::zero_hashes;
use crate::merkle::MerkleError;
use crate::types::{HashBytes, NullifierStatus, PublicKey};

/// Depth of the sparse nullifier key space: one level per key bit, so any
/// 256-bit key addresses a distinct leaf.
pub const NULLIFIER_TREE_DEPTH: usize = 256;

/// Canonical lookup key for an (elector, plan) pair.
pub fn nullifier_key(elector: &PublicKey, plan_uid: &HashBytes) -> Result<HashBytes, MerkleError> {
    hash_triple(&elector.x, &elector.y, plan_uid).map_err(|_| MerkleError::HashFailed)
}

/// Bit of `key` at `position`, counting from the most significant bit.
/// Bit 0 decides the branch at the root.
fn key_bit(key: &HashBytes, position: usize) -> u8 {
    (key[position / 8] >> (7 - position % 8)) & 1
}

/// Sibling path for one key in the nullifier map, ordered leaf to root.
/// The map never stores entries on chain; callers prove "key k holds value
/// v under root r" with one of these, and every mutation goes through
/// [`NullifierWitness::transition`].
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct NullifierWitness {
    pub siblings: Vec<HashBytes>,
}

impl NullifierWitness {
    /// Root the map would have if `key` held `value`, per this sibling path.
    pub fn compute_root(
        &self,
        key: &HashBytes,
        value: &HashBytes,
    ) -> Result<HashBytes, MerkleError> {
        if self.siblings.len() != NULLIFIER_TREE_DEPTH {
            return Err(MerkleError::MalformedWitness);
        }
        let mut acc = *value;
        for (level, sibling) in self.siblings.iter().enumerate() {
            let bit = key_bit(key, NULLIFIER_TREE_DEPTH - 1 - level);
            acc = if bit == 0 {
                hash_pair(&acc, sibling)
            } else {
                hash_pair(sibling, &acc)
            }
            .map_err(|_| MerkleError::HashFailed)?;
        }
        Ok(acc)
    }

    pub fn verify(
        &self,
        key: &HashBytes,
        status: NullifierStatus,
        expected_root: &HashBytes,
    ) -> Result<bool, MerkleError> {
        Ok(self.compute_root(key, &status.leaf())? == *expected_root)
    }

    /// Witnessed read: the status this path proves for `key` under `root`,
    /// if any.
    pub fn read(
        &self,
        key: &HashBytes,
        root: &HashBytes,
    ) -> Result<Option<NullifierStatus>, MerkleError> {
        for status in [
            NullifierStatus::Unassigned,
            NullifierStatus::Assigned,
            NullifierStatus::Voted,
        ] {
            if self.verify(key, status, root)? {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    /// Verifies `old` against `current_root`, then returns the root the map
    /// has once `key` holds `new`. The only mutation path; an unverified
    /// claim of the prior value is never accepted.
    pub fn transition(
        &self,
        key: &HashBytes,
        old: NullifierStatus,
        new: NullifierStatus,
        current_root: &HashBytes,
    ) -> Result<HashBytes, MerkleError> {
        if !self.verify(key, old, current_root)? {
            return Err(MerkleError::StaleWitness);
        }
        self.compute_root(key, &new.leaf())
    }
}

/// In-memory sparse map, used off chain to assign electors and to produce
/// the witnesses submitted alongside batches. Absent keys default to
/// UNASSIGNED (the zero leaf).
#[derive(Clone, Default, RuntimeDebug)]
pub struct NullifierMap {
    entries: BTreeMap<HashBytes, NullifierStatus>,
}

impl NullifierMap {
    pub fn new() -> Self {
        NullifierMap {
            entries: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: HashBytes, status: NullifierStatus) {
        self.entries.insert(key, status);
    }

    pub fn get(&self, key: &HashBytes) -> NullifierStatus {
        self.entries
            .get(key)
            .copied()
            .unwrap_or(NullifierStatus::Unassigned)
    }

    pub fn root(&self) -> Result<HashBytes, MerkleError> {
        let zeroes = zero_hashes(NULLIFIER_TREE_DEPTH)?;
        let entries: Vec<(&HashBytes, &NullifierStatus)> = self.entries.iter().collect();
        Self::subtree_hash(0, &entries, &zeroes)
    }

    /// Sibling path for `key`, against the current contents of the map.
    pub fn witness(&self, key: &HashBytes) -> Result<NullifierWitness, MerkleError> {
        let zeroes = zero_hashes(NULLIFIER_TREE_DEPTH)?;
        let mut entries: Vec<(&HashBytes, &NullifierStatus)> = self.entries.iter().collect();
        let mut siblings = Vec::with_capacity(NULLIFIER_TREE_DEPTH);
        for level in 0..NULLIFIER_TREE_DEPTH {
            let split = entries.partition_point(|(k, _)| key_bit(k, level) == 0);
            let (followed, others) = if key_bit(key, level) == 0 {
                (&entries[..split], &entries[split..])
            } else {
                (&entries[split..], &entries[..split])
            };
            siblings.push(Self::subtree_hash(level + 1, others, &zeroes)?);
            entries = followed.to_vec();
        }
        // Stored root-to-leaf while descending; witnesses fold leaf-to-root.
        siblings.reverse();
        Ok(NullifierWitness { siblings })
    }

    /// Root of the subtree `level` branches below the root that contains
    /// exactly `entries`. BTreeMap iteration is byte-ascending, which equals
    /// MSB-first bit order, so a partition point splits left/right children.
    fn subtree_hash(
        level: usize,
        entries: &[(&HashBytes, &NullifierStatus)],
        zeroes: &[HashBytes],
    ) -> Result<HashBytes, MerkleError> {
        if entries.is_empty() {
            return Ok(zeroes[NULLIFIER_TREE_DEPTH - level]);
        }
        if level == NULLIFIER_TREE_DEPTH {
            return Ok(entries[0].1.leaf());
        }
        let split = entries.partition_point(|(key, _)| key_bit(key, level) == 0);
        let left = Self::subtree_hash(level + 1, &entries[..split], zeroes)?;
        let right = Self::subtree_hash(level + 1, &entries[split..], zeroes)?;
        hash_pair(&left, &right).map_err(|_| MerkleError::HashFailed)
    }
}
