#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;

pub mod hash;
pub mod merkle;
pub mod types;

#[cfg(test)]
mod mock;

#[cfg(test)]
mod tests;

pub const LOG_TARGET: &str = "runtime::plan-voting";

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_system::pallet_prelude::*;
    use sp_runtime::traits::SaturatedConversion;
    use sp_std::vec::Vec;

    use crate::merkle::{nullifier_key, CommitmentTree, MerkleError, NullifierWitness};
    use crate::types::{
        HashBytes, NullifierStatus, ProcessId, ProcessProvider, ProcessState, PublicKey,
        RollupAccumulator, VotesBatch, VotingProcess, Watermark,
    };

    const STORAGE_VERSION: StorageVersion = StorageVersion::new(0);

    #[pallet::pallet]
    #[pallet::storage_version(STORAGE_VERSION)]
    #[pallet::without_storage_info]
    pub struct Pallet<T>(_);

    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// The overarching event type.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Depth of the per-process commitment tree. A process admits at
        /// most 2^depth - 1 batches, since leaf 0 is the reserved sentinel.
        /// Beyond that a deployment must shard into multiple trees.
        /// Supported range is 1..=31; deeper trees saturate their capacity
        /// at `u32::MAX` leaves.
        #[pallet::constant]
        type CommitmentTreeDepth: Get<u8>;

        /// Upper bound on batches folded by a single rollup call. Zero
        /// drains the whole backlog at once.
        #[pallet::constant]
        type MaxBatchesPerRollup: Get<u32>;
    }

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// An account bound its elector public key.
        ElectorRegistered {
            /// The elector account.
            who: T::AccountId,
            /// The public key of the elector.
            public_key: PublicKey,
        },

        /// A new voting process was created.
        ProcessCreated {
            /// The process index.
            process_id: ProcessId,
            /// The account administering the process.
            admin: T::AccountId,
            /// The plan being voted under.
            plan_uid: HashBytes,
            /// The owning community.
            community_uid: HashBytes,
        },

        /// A votes batch passed validation and was appended to the channel.
        /// Consumers see at-least-once delivery and dedupe on `batch_uid`.
        VotesBatchReceived {
            /// The process index.
            process_id: ProcessId,
            /// The accepted batch.
            batch: VotesBatch,
        },

        /// A rollup folded pending channel entries into the commitment tree.
        RollupExecuted {
            /// The process index.
            process_id: ProcessId,
            /// The commitment root after the fold.
            commitment_root: HashBytes,
            /// The advanced channel cursor.
            watermark: Watermark,
            /// How many batches this call folded.
            processed: u32,
        },

        /// The voting process was closed normally.
        ProcessEnded { process_id: ProcessId },

        /// The voting process was terminated abnormally.
        ProcessCanceled { process_id: ProcessId },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// An elector key is already bound for this account.
        ElectorAlreadyRegistered,

        /// Voting process does not exist.
        ProcessDoesNotExist,

        /// The process is no longer active.
        ProcessClosed,

        /// The batch's declared community or plan does not match the process.
        PlanMismatch,

        /// The witness does not prove the elector is assigned and yet to
        /// vote. Covers never-assigned electors, electors that already
        /// voted, and witnesses gone stale against the current root.
        NotEligible,

        /// Submitter is not the elector of record for the batch.
        IdentityMismatch,

        /// Caller is not the process admin.
        NotProcessAdmin,

        /// The batch commitment is not a canonical field element and could
        /// never be folded into the commitment tree.
        InvalidCommitment,

        /// The commitment tree has no free leaves for further batches.
        BatchLimitReached,

        /// The witness does not carry one sibling per nullifier tree level.
        MalformedWitness,

        /// A freshly folded leaf failed to reproduce the recomputed root.
        /// This is a corrupted tree, not a bad input; the attempt aborts
        /// with no partial effect.
        RollupInconsistency,

        /// The hash function did not succeed.
        HashFailed,
    }

    impl<T> From<MerkleError> for Error<T> {
        fn from(error: MerkleError) -> Self {
            match error {
                MerkleError::LeafOutOfRange => Error::BatchLimitReached,
                MerkleError::MalformedWitness => Error::MalformedWitness,
                MerkleError::StaleWitness => Error::NotEligible,
                MerkleError::Inconsistency => Error::RollupInconsistency,
                MerkleError::HashFailed => Error::HashFailed,
            }
        }
    }

    /// Map of ids to voting processes.
    #[pallet::storage]
    #[pallet::getter(fn processes)]
    pub type Processes<T: Config> =
        CountedStorageMap<_, Twox64Concat, ProcessId, VotingProcess<T>>;

    /// Append-only, per-process channel of accepted batches. Delivery order
    /// is the canonical fold order: entries are never removed or reordered,
    /// and two reducers fed the same prefix compute the same root.
    #[pallet::storage]
    #[pallet::getter(fn batch_channel)]
    pub type BatchChannel<T: Config> =
        StorageMap<_, Twox64Concat, ProcessId, Vec<VotesBatch>, ValueQuery>;

    /// Map of accounts to their registered elector keys.
    #[pallet::storage]
    #[pallet::getter(fn electors)]
    pub type Electors<T: Config> = StorageMap<_, Blake2_128Concat, T::AccountId, PublicKey>;

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Bind the caller's account to its elector public key. The identity
        /// check of `submit_batch` compares against this binding.
        ///
        /// Emits `ElectorRegistered`.
        #[pallet::call_index(0)]
        #[pallet::weight(T::DbWeight::get().reads_writes(1, 1))]
        pub fn register_elector(origin: OriginFor<T>, public_key: PublicKey) -> DispatchResult {
            let sender = ensure_signed(origin)?;

            ensure!(
                !Electors::<T>::contains_key(&sender),
                Error::<T>::ElectorAlreadyRegistered
            );

            Electors::<T>::insert(&sender, public_key);

            Self::deposit_event(Event::ElectorRegistered {
                who: sender,
                public_key,
            });

            Ok(())
        }

        /// Create a voting process for a plan. `nullifier_root` commits to
        /// the electors assigned off chain before voting opened; the caller
        /// becomes the process admin.
        ///
        /// Emits `ProcessCreated`.
        #[pallet::call_index(1)]
        #[pallet::weight(T::DbWeight::get().reads_writes(2, 1))]
        pub fn create_process(
            origin: OriginFor<T>,
            plan_uid: HashBytes,
            community_uid: HashBytes,
            nullifier_root: HashBytes,
        ) -> DispatchResult {
            let sender = ensure_signed(origin)?;

            let tree = CommitmentTree::new(T::CommitmentTreeDepth::get());
            let commitment_root = tree.root().map_err(Error::<T>::from)?;

            let process_id = Processes::<T>::count();
            let created_at = <frame_system::Pallet<T>>::block_number().saturated_into::<u64>();
            Processes::<T>::insert(
                process_id,
                VotingProcess {
                    plan_uid,
                    community_uid,
                    admin: sender.clone(),
                    created_at,
                    state: ProcessState::Active,
                    nullifier_root,
                    tree,
                    accumulator: RollupAccumulator {
                        commitment_root,
                        count: 0,
                    },
                    watermark: 0,
                },
            );

            Self::deposit_event(Event::ProcessCreated {
                process_id,
                admin: sender,
                plan_uid,
                community_uid,
            });

            Ok(())
        }

        /// Submit one elector's votes batch. Preconditions are checked in
        /// order and the first failure rejects with nothing mutated: the
        /// process must be active, the batch must name this plan and
        /// community, the witness must prove the elector ASSIGNED under the
        /// recorded nullifier root, and the sender must be the elector of
        /// record. On success the nullifier entry moves to VOTED and the
        /// batch lands on the channel, as one atomic step.
        ///
        /// Emits `VotesBatchReceived`.
        #[pallet::call_index(2)]
        #[pallet::weight(T::DbWeight::get().reads_writes(4, 2))]
        pub fn submit_batch(
            origin: OriginFor<T>,
            process_id: ProcessId,
            batch: VotesBatch,
            witness: NullifierWitness,
        ) -> DispatchResult {
            let sender = ensure_signed(origin)?;

            let Some(mut process) = Processes::<T>::get(process_id) else {
                Err(Error::<T>::ProcessDoesNotExist)?
            };

            ensure!(process.is_active(), Error::<T>::ProcessClosed);
            ensure!(process.matches_plan(&batch), Error::<T>::PlanMismatch);

            // VOTED and UNASSIGNED electors both fail this proof.
            let key =
                nullifier_key(&batch.elector_key, &batch.plan_uid).map_err(Error::<T>::from)?;
            let eligible = witness
                .verify(&key, NullifierStatus::Assigned, &process.nullifier_root)
                .map_err(Error::<T>::from)?;
            ensure!(eligible, Error::<T>::NotEligible);

            let Some(registered) = Electors::<T>::get(&sender) else {
                Err(Error::<T>::IdentityMismatch)?
            };
            ensure!(registered == batch.elector_key, Error::<T>::IdentityMismatch);

            // An unhashable commitment must never reach the channel, or
            // every later rollup would fail at the same leaf and the
            // watermark could never advance past it.
            ensure!(
                crate::hash::parse_scalar(&batch.commitment).is_some(),
                Error::<T>::InvalidCommitment
            );

            // Leaf 0 is the sentinel, so the tree admits capacity - 1 batches.
            let enqueued = BatchChannel::<T>::decode_len(process_id).unwrap_or(0) as u32;
            ensure!(
                enqueued + 1 < process.tree.capacity(),
                Error::<T>::BatchLimitReached
            );

            process.nullifier_root = witness
                .transition(
                    &key,
                    NullifierStatus::Assigned,
                    NullifierStatus::Voted,
                    &process.nullifier_root,
                )
                .map_err(Error::<T>::from)?;

            Processes::<T>::insert(process_id, process);
            BatchChannel::<T>::append(process_id, batch.clone());

            log::debug!(
                target: LOG_TARGET,
                "process {process_id}: accepted batch {:?} at channel position {enqueued}",
                batch.batch_uid,
            );

            Self::deposit_event(Event::VotesBatchReceived { process_id, batch });

            Ok(())
        }

        /// Fold channel entries past the persisted watermark into the
        /// commitment tree, in delivery order. Permissionless, and
        /// idempotent when nothing is pending: the root and watermark come
        /// back unchanged with zero processed.
        ///
        /// Emits `RollupExecuted`.
        #[pallet::call_index(3)]
        #[pallet::weight(T::DbWeight::get().reads_writes(2, 1))]
        pub fn rollup(origin: OriginFor<T>, process_id: ProcessId) -> DispatchResult {
            ensure_signed(origin)?;

            let Some(mut process) = Processes::<T>::get(process_id) else {
                Err(Error::<T>::ProcessDoesNotExist)?
            };

            ensure!(process.is_active(), Error::<T>::ProcessClosed);

            let channel = BatchChannel::<T>::get(process_id);
            let from = process.watermark as usize;
            let mut pending: &[VotesBatch] = channel.get(from..).unwrap_or(&[]);

            let bound = T::MaxBatchesPerRollup::get() as usize;
            if bound > 0 && pending.len() > bound {
                pending = &pending[..bound];
            }

            for batch in pending {
                process = process
                    .fold_commitment(&batch.commitment)
                    .map_err(Error::<T>::from)?;
            }

            let processed = pending.len() as u32;
            process.watermark += processed;

            let commitment_root = process.accumulator.commitment_root;
            let watermark = process.watermark;
            Processes::<T>::insert(process_id, process);

            log::debug!(
                target: LOG_TARGET,
                "process {process_id}: folded {processed} batches, watermark now {watermark}",
            );

            Self::deposit_event(Event::RollupExecuted {
                process_id,
                commitment_root,
                watermark,
                processed,
            });

            Ok(())
        }

        /// Close the voting process normally. Terminal: submissions and
        /// rollups reject from here on, reads stay available.
        ///
        /// Emits `ProcessEnded`.
        #[pallet::call_index(4)]
        #[pallet::weight(T::DbWeight::get().reads_writes(1, 1))]
        pub fn end_process(origin: OriginFor<T>, process_id: ProcessId) -> DispatchResult {
            let sender = ensure_signed(origin)?;

            let Some(process) = Processes::<T>::get(process_id) else {
                Err(Error::<T>::ProcessDoesNotExist)?
            };

            ensure!(process.admin == sender, Error::<T>::NotProcessAdmin);
            ensure!(process.is_active(), Error::<T>::ProcessClosed);

            Processes::<T>::insert(process_id, process.end());

            Self::deposit_event(Event::ProcessEnded { process_id });

            Ok(())
        }

        /// Terminate the voting process abnormally. Terminal, like
        /// `end_process`.
        ///
        /// Emits `ProcessCanceled`.
        #[pallet::call_index(5)]
        #[pallet::weight(T::DbWeight::get().reads_writes(1, 1))]
        pub fn cancel_process(origin: OriginFor<T>, process_id: ProcessId) -> DispatchResult {
            let sender = ensure_signed(origin)?;

            let Some(process) = Processes::<T>::get(process_id) else {
                Err(Error::<T>::ProcessDoesNotExist)?
            };

            ensure!(process.admin == sender, Error::<T>::NotProcessAdmin);
            ensure!(process.is_active(), Error::<T>::ProcessClosed);

            Processes::<T>::insert(process_id, process.cancel());

            Self::deposit_event(Event::ProcessCanceled { process_id });

            Ok(())
        }
    }
}
