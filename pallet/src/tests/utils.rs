use frame_support::assert_ok;

use crate::merkle::{nullifier_key, NullifierMap};
use crate::mock::*;
use crate::types::{HashBytes, NullifierStatus, PublicKey, VotesBatch};

// Poseidon rejects 32-byte inputs at or above the BN254 scalar modulus, so
// every hashed test constant keeps its leading byte well below 0x30.
pub const PLAN_UID: HashBytes = [1u8; 32];
pub const COMMUNITY_UID: HashBytes = [2u8; 32];

pub fn elector_key(seed: u8) -> PublicKey {
    PublicKey {
        x: [seed; 32],
        y: [seed + 1; 32],
    }
}

pub fn votes_batch(elector: PublicKey, seed: u8) -> VotesBatch {
    VotesBatch {
        community_uid: COMMUNITY_UID,
        plan_uid: PLAN_UID,
        elector_key: elector,
        batch_uid: [seed; 32],
        commitment: [seed; 32],
        size: 10,
        submitted_at: 1_700_000_000 + seed as u64,
    }
}

/// A nullifier map with every given elector assigned under `PLAN_UID`.
pub fn assigned_electors(electors: &[PublicKey]) -> NullifierMap {
    let mut map = NullifierMap::new();
    for elector in electors {
        let key = nullifier_key(elector, &PLAN_UID).unwrap();
        map.set(key, NullifierStatus::Assigned);
    }
    map
}

pub fn create_default_process(admin: u64, map: &NullifierMap) {
    assert_ok!(PlanVoting::create_process(
        RuntimeOrigin::signed(admin),
        PLAN_UID,
        COMMUNITY_UID,
        map.root().unwrap(),
    ));
}

/// Submits a batch for an assigned elector to process 0 and mirrors the
/// on-chain ASSIGNED -> VOTED transition into the local map, keeping it in
/// step with the stored nullifier root for later witnesses.
pub fn submit_assigned_batch(
    map: &mut NullifierMap,
    account: u64,
    elector: PublicKey,
    seed: u8,
) -> VotesBatch {
    let key = nullifier_key(&elector, &PLAN_UID).unwrap();
    let witness = map.witness(&key).unwrap();
    let batch = votes_batch(elector, seed);
    assert_ok!(PlanVoting::submit_batch(
        RuntimeOrigin::signed(account),
        0,
        batch.clone(),
        witness,
    ));
    map.set(key, NullifierStatus::Voted);
    batch
}
