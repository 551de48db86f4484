use frame_support::pallet_prelude::*;

use crate::merkle::{CommitmentTree, MerkleError};

pub type HashBytes = [u8; crate::hash::HASH_LEN];
pub type ProcessId = u32;
pub type BlockNumber = u64;

/// Cursor into a process's batch channel: the number of entries already
/// consumed by rollups. Anything at or before it is never re-processed.
pub type Watermark = u32;

/// Public identity of an elector, a 256-bit curve point pair.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct PublicKey {
    pub x: HashBytes,
    pub y: HashBytes,
}

/// Lifecycle of a voting process. `Ended` and `Canceled` are terminal: no
/// further batches or rollups, reads stay available.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub enum ProcessState {
    Active,
    Ended,
    Canceled,
}

/// Voting state of one (elector, plan) pair in the nullifier map.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub enum NullifierStatus {
    Unassigned,
    Assigned,
    Voted,
}

impl NullifierStatus {
    /// Leaf encoding: the discriminant as a 32-byte big-endian word. The
    /// zero leaf is `Unassigned`, so keys never written read back as never
    /// assigned.
    pub fn leaf(&self) -> HashBytes {
        let mut bytes = [0u8; 32];
        bytes[31] = match self {
            NullifierStatus::Unassigned => 0,
            NullifierStatus::Assigned => 1,
            NullifierStatus::Voted => 2,
        };
        bytes
    }
}

/// One elector's submission for one voting plan. `commitment` is the root
/// of the elector's private per-batch vote tree; this pallet accumulates
/// commitments and never inspects vote contents.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct VotesBatch {
    /// The community where the voting process is happening.
    pub community_uid: HashBytes,

    /// The plan (voting process) the credential is being voted under.
    pub plan_uid: HashBytes,

    /// The elector who produced this batch.
    pub elector_key: PublicKey,

    /// Caller-generated, globally unique. Off-chain consumers dedupe on it.
    pub batch_uid: HashBytes,

    /// Root of the batch's vote tree, opaque here.
    pub commitment: HashBytes,

    /// Declared number of votes in the batch, not verified here.
    pub size: u32,

    /// Submission time, UTC seconds.
    pub submitted_at: u64,
}

/// Fold state of the commitment tree across all batches processed so far.
/// `count` doubles as the cursor for the next free leaf.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct RollupAccumulator {
    pub commitment_root: HashBytes,
    pub count: u32,
}

/// One instance per voting plan. Every mutating extrinsic re-reads this
/// record, checks its preconditions against the latest committed state and
/// writes the whole update back in a single storage commit, so the root,
/// count and watermark can never be observed partially advanced.
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo)]
#[scale_info(skip_type_params(T))]
pub struct VotingProcess<T: crate::Config> {
    pub plan_uid: HashBytes,

    pub community_uid: HashBytes,

    /// The account that created the process; the only one allowed to close
    /// or cancel it.
    pub admin: T::AccountId,

    /// The number of the block in which the process was created.
    pub created_at: BlockNumber,

    pub state: ProcessState,

    /// Root of the nullifier map recording per-elector voting state.
    pub nullifier_root: HashBytes,

    /// The batch-rollup accumulator tree.
    pub tree: CommitmentTree,

    pub accumulator: RollupAccumulator,

    pub watermark: Watermark,
}

pub trait ProcessProvider<T: crate::Config>: Sized {
    /// Folds one accepted batch commitment into the next free leaf and
    /// self-checks the write with a fresh inclusion proof.
    fn fold_commitment(self, commitment: &HashBytes) -> Result<Self, MerkleError>;

    fn is_active(&self) -> bool;

    fn matches_plan(&self, batch: &VotesBatch) -> bool;

    fn end(self) -> Self;

    fn cancel(self) -> Self;
}

impl<T: crate::Config> ProcessProvider<T> for VotingProcess<T> {
    fn fold_commitment(mut self, commitment: &HashBytes) -> Result<Self, MerkleError> {
        // Leaf 0 stays the empty sentinel.
        let index = self.accumulator.count + 1;
        self.tree.set_leaf(index, *commitment)?;
        let new_root = self.tree.root()?;

        // The write and the witness must agree; a mismatch means the tree
        // itself is corrupted and the whole rollup attempt is abandoned.
        let proof = self.tree.witness(index)?;
        if !proof.verify(index, commitment, &new_root)? {
            return Err(MerkleError::Inconsistency);
        }

        self.accumulator.count = index;
        self.accumulator.commitment_root = new_root;
        Ok(self)
    }

    fn is_active(&self) -> bool {
        self.state == ProcessState::Active
    }

    fn matches_plan(&self, batch: &VotesBatch) -> bool {
        batch.community_uid == self.community_uid && batch.plan_uid == self.plan_uid
    }

    fn end(mut self) -> Self {
        self.state = ProcessState::Ended;
        self
    }

    fn cancel(mut self) -> Self {
        self.state = ProcessState::Canceled;
        self
    }
}
