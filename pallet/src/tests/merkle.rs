use sp_std::vec;

use crate::hash::{hash_pair, parse_scalar};
use crate::merkle::zeroes::zero_hashes;
use crate::merkle::{
    nullifier_key, CommitmentTree, MerkleError, NullifierMap, NullifierWitness,
    NULLIFIER_TREE_DEPTH,
};
use crate::tests::{elector_key, PLAN_UID};
use crate::types::{HashBytes, NullifierStatus};

fn leaf(seed: u8) -> HashBytes {
    [seed; 32]
}

/// The empty tree's root is the zero-subtree hash at its depth, independent
/// of how the tree was built.
#[test]
fn empty_tree_root() {
    let tree = CommitmentTree::new(3);
    assert_eq!(tree.root().unwrap(), zero_hashes(3).unwrap()[3]);
    assert_eq!(tree.capacity(), 8);
}

#[test]
fn tree_witness_round_trip() {
    let mut tree = CommitmentTree::new(3);
    tree.set_leaf(1, leaf(5)).unwrap();
    tree.set_leaf(2, leaf(6)).unwrap();
    tree.set_leaf(5, leaf(7)).unwrap();
    let root = tree.root().unwrap();

    for (index, value) in [(1, leaf(5)), (2, leaf(6)), (5, leaf(7))] {
        let proof = tree.witness(index).unwrap();
        assert!(proof.verify(index, &value, &root).unwrap());
    }

    // Wrong value, wrong position and wrong root all fail.
    let proof = tree.witness(2).unwrap();
    assert!(!proof.verify(2, &leaf(9), &root).unwrap());
    assert!(!proof.verify(3, &leaf(6), &root).unwrap());
    assert!(!proof.verify(2, &leaf(6), &leaf(1)).unwrap());
}

#[test]
fn tree_leaf_out_of_range() {
    let mut tree = CommitmentTree::new(3);
    assert_eq!(tree.set_leaf(8, leaf(1)), Err(MerkleError::LeafOutOfRange));
    assert_eq!(
        tree.witness(8).unwrap_err(),
        MerkleError::LeafOutOfRange
    );
}

/// The root depends only on leaf contents, not on write order.
#[test]
fn tree_root_ignores_write_order() {
    let mut forward = CommitmentTree::new(3);
    forward.set_leaf(1, leaf(5)).unwrap();
    forward.set_leaf(4, leaf(6)).unwrap();

    let mut backward = CommitmentTree::new(3);
    backward.set_leaf(4, leaf(6)).unwrap();
    backward.set_leaf(1, leaf(5)).unwrap();

    assert_eq!(forward.root().unwrap(), backward.root().unwrap());
}

/// Keys never written read back UNASSIGNED, provably so.
#[test]
fn map_default_unassigned() {
    let map = NullifierMap::new();
    let key = nullifier_key(&elector_key(1), &PLAN_UID).unwrap();

    assert_eq!(map.get(&key), NullifierStatus::Unassigned);

    let root = map.root().unwrap();
    let witness = map.witness(&key).unwrap();
    assert!(witness
        .verify(&key, NullifierStatus::Unassigned, &root)
        .unwrap());
    assert_eq!(
        witness.read(&key, &root).unwrap(),
        Some(NullifierStatus::Unassigned)
    );

    // An empty map's root is the zero-subtree hash at full depth.
    assert_eq!(root, zero_hashes(NULLIFIER_TREE_DEPTH).unwrap()[NULLIFIER_TREE_DEPTH]);
}

/// A witness transition reproduces the root the rebuilt map computes.
#[test]
fn map_transition_matches_rebuild() {
    let key_a = nullifier_key(&elector_key(1), &PLAN_UID).unwrap();
    let key_b = nullifier_key(&elector_key(3), &PLAN_UID).unwrap();

    let mut map = NullifierMap::new();
    map.set(key_a, NullifierStatus::Assigned);
    map.set(key_b, NullifierStatus::Assigned);

    let witness = map.witness(&key_a).unwrap();
    let new_root = witness
        .transition(
            &key_a,
            NullifierStatus::Assigned,
            NullifierStatus::Voted,
            &map.root().unwrap(),
        )
        .unwrap();

    map.set(key_a, NullifierStatus::Voted);
    assert_eq!(new_root, map.root().unwrap());

    // The other entry is still provable under the new root.
    let witness_b = map.witness(&key_b).unwrap();
    assert!(witness_b
        .verify(&key_b, NullifierStatus::Assigned, &new_root)
        .unwrap());
}

/// A transition whose claimed prior value does not verify is rejected.
#[test]
fn map_stale_transition_rejected() {
    let key = nullifier_key(&elector_key(1), &PLAN_UID).unwrap();

    let mut map = NullifierMap::new();
    map.set(key, NullifierStatus::Voted);
    let root = map.root().unwrap();
    let witness = map.witness(&key).unwrap();

    assert_eq!(
        witness.transition(&key, NullifierStatus::Assigned, NullifierStatus::Voted, &root),
        Err(MerkleError::StaleWitness)
    );
}

#[test]
fn map_witness_wrong_length() {
    let key = nullifier_key(&elector_key(1), &PLAN_UID).unwrap();
    let witness = NullifierWitness {
        siblings: vec![[0u8; 32]; NULLIFIER_TREE_DEPTH - 1],
    };
    assert_eq!(
        witness.compute_root(&key, &NullifierStatus::Assigned.leaf()),
        Err(MerkleError::MalformedWitness)
    );
}

/// Keys separate electors and plans.
#[test]
fn nullifier_key_distinct() {
    let key = nullifier_key(&elector_key(1), &PLAN_UID).unwrap();
    assert_eq!(key, nullifier_key(&elector_key(1), &PLAN_UID).unwrap());
    assert_ne!(key, nullifier_key(&elector_key(3), &PLAN_UID).unwrap());
    assert_ne!(key, nullifier_key(&elector_key(1), &[3u8; 32]).unwrap());
}

#[test]
fn tree_capacity_saturates() {
    assert_eq!(CommitmentTree::new(3).capacity(), 8);
    assert_eq!(CommitmentTree::new(31).capacity(), 1u32 << 31);
    assert_eq!(CommitmentTree::new(32).capacity(), u32::MAX);
    assert_eq!(CommitmentTree::new(200).capacity(), u32::MAX);
}

/// The scalar parser and the hasher agree on what is representable.
#[test]
fn nonscalar_input_rejected() {
    let oversized = [0xffu8; 32];
    assert!(parse_scalar(&oversized).is_none());
    assert!(parse_scalar(&[0u8; 32]).is_some());
    assert!(parse_scalar(&leaf(0x2f)).is_some());
    assert!(hash_pair(&oversized, &leaf(1)).is_err());
}

#[test]
fn hash_pair_order_sensitive() {
    let a = leaf(1);
    let b = leaf(2);
    assert_eq!(hash_pair(&a, &b).unwrap(), hash_pair(&a, &b).unwrap());
    assert_ne!(hash_pair(&a, &b).unwrap(), hash_pair(&b, &a).unwrap());
}
