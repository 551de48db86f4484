//! Poseidon hashing over BN254, circom-parameterized. Every authenticated
//! structure in this pallet hashes through these helpers so that roots stay
//! comparable with externally generated commitments.

use ark_bn254::Fr;
use ark_ff::{BigInt, PrimeField};
use light_poseidon::{Poseidon, PoseidonBytesHasher};

pub use light_poseidon::PoseidonError;

pub const HASH_LEN: usize = 32;

use crate::types::HashBytes;

/// Parses a 32-byte big-endian value as a canonical BN254 scalar. Values at
/// or above the field modulus come back `None`; the hasher rejects exactly
/// the same inputs, so anything accepted here is safe to hash later.
pub fn parse_scalar(bytes: &HashBytes) -> Option<Fr> {
    let mut limbs = [0u64; 4];
    for (limb, chunk) in limbs.iter_mut().zip(bytes.rchunks(8)) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        *limb = u64::from_be_bytes(buf);
    }
    Fr::from_bigint(BigInt::new(limbs))
}

/// Two-to-one node hash used by the merkle structures.
pub fn hash_pair(left: &HashBytes, right: &HashBytes) -> Result<HashBytes, PoseidonError> {
    let mut hasher = Poseidon::<Fr>::new_circom(2)?;
    hasher.hash_bytes_be(&[left.as_slice(), right.as_slice()])
}

/// Three-input hash, used to derive nullifier keys from an elector key and
/// a plan uid.
pub fn hash_triple(
    a: &HashBytes,
    b: &HashBytes,
    c: &HashBytes,
) -> Result<HashBytes, PoseidonError> {
    let mut hasher = Poseidon::<Fr>::new_circom(3)?;
    hasher.hash_bytes_be(&[a.as_slice(), b.as_slice(), c.as_slice()])
}
