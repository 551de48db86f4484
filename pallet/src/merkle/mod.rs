pub mod map;
pub mod tree;
pub mod zeroes;

pub use map::{nullifier_key, NullifierMap, NullifierWitness, NULLIFIER_TREE_DEPTH};
pub use tree::{CommitmentTree, InclusionProof};

/// Faults surfaced by the authenticated structures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MerkleError {
    /// The leaf index lies outside the tree's capacity.
    LeafOutOfRange,
    /// The witness does not carry one sibling per tree level.
    MalformedWitness,
    /// The claimed prior value does not verify against the current root.
    StaleWitness,
    /// A freshly written leaf failed to reproduce the recomputed root.
    Inconsistency,
    /// The hash function did not succeed.
    HashFailed,
}
