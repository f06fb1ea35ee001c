//! Vote aggregation
//!
//! Casting a vote is an upsert on the `(voter, target)` pair plus an
//! adjustment of the target's cached `vote_count` by the difference between
//! the new and the previous polarity. Both writes happen in one
//! [`Storage::atomic`] unit:
//!
//! ```text
//! lock target ──► lock vote(voter, target)
//!                   │
//!        ┌──────────┼─────────────────────┐
//!        ▼          ▼                     ▼
//!   no vote     same polarity       other polarity
//!   delta=+p    delta=0 (no write)  delta=p_new-p_old
//!        │                                │
//!        └────► put vote + put target ◄───┘
//!                     commit
//! ```
//!
//! Every writer takes the target lock first, so votes on one target are
//! serialized by the store and the voter/target uniqueness check cannot race.

use crate::{
    types::{Polarity, TargetRef, UserId, Vote, VoteTarget},
    Error, Result, Storage,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Result of one `cast_vote` call
#[derive(Debug, Clone, PartialEq)]
pub struct VoteReceipt {
    /// Vote as stored after the call
    pub vote: Vote,

    /// Change applied to the target's vote count
    pub delta: i64,

    /// Target's vote count after the call
    pub vote_count: i64,
}

impl VoteReceipt {
    /// Whether the call re-asserted an existing vote without writing
    pub fn is_noop(&self) -> bool {
        self.delta == 0
    }
}

/// Applies votes to targets
#[derive(Debug, Clone)]
pub struct VoteAggregator {
    storage: Arc<Storage>,
}

impl VoteAggregator {
    /// Create aggregator over a store
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Register a votable entity with a zero count.
    ///
    /// Registering an existing target returns it unchanged.
    pub fn register_target(&self, target: TargetRef) -> Result<VoteTarget> {
        self.storage.atomic(|txn| {
            if let Some(existing) = txn.lock_target(&target)? {
                return Ok(existing);
            }

            let record = VoteTarget {
                target,
                vote_count: 0,
                created_at: Utc::now(),
            };
            txn.put_target(&record)?;

            tracing::debug!(target = %target, "Vote target registered");
            Ok(record)
        })
    }

    /// Cast or change a vote
    pub fn cast_vote(
        &self,
        voter: &UserId,
        target: TargetRef,
        polarity: Polarity,
    ) -> Result<VoteReceipt> {
        voter.validate()?;

        self.storage.atomic(|txn| {
            let mut counter = txn
                .lock_target(&target)?
                .ok_or(Error::TargetNotFound(target))?;

            let now = Utc::now();
            let (vote, delta) = match txn.lock_vote(voter, &target)? {
                None => {
                    let vote = Vote {
                        vote_id: Uuid::now_v7(),
                        voter: voter.clone(),
                        target,
                        polarity,
                        created_at: now,
                        updated_at: now,
                    };
                    (vote, polarity.value())
                }
                Some(existing) => {
                    let delta = polarity.value() - existing.polarity.value();
                    if delta == 0 {
                        tracing::debug!(
                            voter = %voter,
                            target = %target,
                            "Vote re-asserted, nothing to write"
                        );
                        return Ok(VoteReceipt {
                            vote: existing,
                            delta,
                            vote_count: counter.vote_count,
                        });
                    }
                    let vote = Vote {
                        polarity,
                        updated_at: now,
                        ..existing
                    };
                    (vote, delta)
                }
            };

            counter.vote_count = counter.vote_count.checked_add(delta).ok_or_else(|| {
                Error::InvariantViolation(format!("vote count overflow on {}", target))
            })?;

            txn.put_vote(&vote)?;
            txn.put_target(&counter)?;

            tracing::debug!(
                voter = %voter,
                target = %target,
                delta,
                vote_count = counter.vote_count,
                "Vote applied"
            );

            Ok(VoteReceipt {
                vote,
                delta,
                vote_count: counter.vote_count,
            })
        })
    }

    /// Current vote of `voter` on `target`, if any
    pub fn get_vote(&self, voter: &UserId, target: &TargetRef) -> Result<Option<Vote>> {
        self.storage.get_vote(voter, target)
    }

    /// Target with its cached count
    pub fn get_target(&self, target: &TargetRef) -> Result<VoteTarget> {
        self.storage.get_target(target)
    }

    /// Every vote held by `voter`
    pub fn votes_by_voter(&self, voter: &UserId) -> Result<Vec<Vote>> {
        self.storage.votes_by_voter(voter)
    }

    /// Sum of polarities over the vote log of `target`
    pub fn recount(&self, target: &TargetRef) -> Result<i64> {
        // Make a missing target an error rather than a zero
        self.storage.get_target(target)?;

        Ok(self
            .storage
            .votes_for_target(target)?
            .iter()
            .map(|vote| vote.polarity.value())
            .sum())
    }
}
