use sp_std::vec::Vec;

use crate::hash::hash_pair;
use crate::merkle::MerkleError;
use crate::types::HashBytes;

/// The all-zero leaf. Doubles as the UNASSIGNED nullifier encoding, so keys
/// that were never written read back as never assigned.
pub const ZERO_LEAF: HashBytes = [0u8; 32];

/// Zero-subtree roots by height: index 0 is the empty leaf, index `h` the
/// root of a height-`h` tree whose leaves are all zero.
pub fn zero_hashes(depth: usize) -> Result<Vec<HashBytes>, MerkleError> {
    let mut zeroes = Vec::with_capacity(depth + 1);
    let mut node = ZERO_LEAF;
    zeroes.push(node);
    for _ in 0..depth {
        node = hash_pair(&node, &node).map_err(|_| MerkleError::HashFailed)?;
        zeroes.push(node);
    }
    Ok(zeroes)
}
