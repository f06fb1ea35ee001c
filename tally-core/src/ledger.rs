//! Main ledger orchestration layer
//!
//! This module ties together storage, vote aggregation, donations and audit
//! into the async API the routing layer calls. Store work is blocking
//! (RocksDB row locks may wait), so every call runs on Tokio's blocking pool.
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use tally_core::{Config, Ledger, Polarity, TargetKind, TargetRef, UserId};
//!
//! #[tokio::main]
//! async fn main() -> tally_core::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     let chapter = TargetRef::new(TargetKind::Chapter, 12);
//!     ledger.register_target(chapter).await?;
//!
//!     let vote = ledger
//!         .cast_vote(UserId::new("alice"), chapter, Polarity::Upvote)
//!         .await?;
//!     assert_eq!(vote.polarity, Polarity::Upvote);
//!
//!     ledger.open_account(UserId::new("alice"), Decimal::from(20)).await?;
//!     ledger.open_account(UserId::new("bob"), Decimal::ZERO).await?;
//!     ledger
//!         .donate(UserId::new("alice"), UserId::new("bob"), Decimal::from(5), None)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    audit::{AccountAudit, AuditReport, Auditor, TargetAudit},
    donations::DonationLedger,
    metrics::Metrics,
    types::{Account, Donation, Polarity, TargetRef, Transaction, UserId, Vote, VoteTarget},
    votes::VoteAggregator,
    Config, Error, Result, Storage,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Main ledger interface
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Shared store
    storage: Arc<Storage>,

    /// Vote aggregation
    votes: VoteAggregator,

    /// Donation ledger
    donations: DonationLedger,

    /// Consistency audit
    auditor: Auditor,

    /// Metrics (if enabled)
    metrics: Option<Metrics>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::open(&config)?);

        let metrics = if config.metrics_enabled {
            Some(Metrics::new().map_err(|e| Error::Config(format!("metrics: {}", e)))?)
        } else {
            None
        };

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            "Ledger opened"
        );

        Ok(Self {
            votes: VoteAggregator::new(storage.clone()),
            donations: DonationLedger::new(storage.clone(), config.donations.clone()),
            auditor: Auditor::new(storage.clone()),
            storage,
            metrics,
            config,
        })
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics collector, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    // Votes

    /// Register a votable entity
    pub async fn register_target(&self, target: TargetRef) -> Result<VoteTarget> {
        let votes = self.votes.clone();
        blocking(move || votes.register_target(target)).await
    }

    /// Cast or change a vote and return the stored vote
    pub async fn cast_vote(
        &self,
        voter: UserId,
        target: TargetRef,
        polarity: Polarity,
    ) -> Result<Vote> {
        let votes = self.votes.clone();
        let started = Instant::now();

        let receipt = self.observe(
            blocking(move || votes.cast_vote(&voter, target, polarity)).await,
            started,
        )?;

        if let Some(metrics) = &self.metrics {
            metrics.record_vote(receipt.delta);
        }

        Ok(receipt.vote)
    }

    /// Current vote of `voter` on `target`
    pub async fn get_vote(&self, voter: UserId, target: TargetRef) -> Result<Option<Vote>> {
        let votes = self.votes.clone();
        blocking(move || votes.get_vote(&voter, &target)).await
    }

    /// Target with its cached count
    pub async fn get_target(&self, target: TargetRef) -> Result<VoteTarget> {
        let votes = self.votes.clone();
        blocking(move || votes.get_target(&target)).await
    }

    /// Every vote held by `voter`
    pub async fn votes_by_voter(&self, voter: UserId) -> Result<Vec<Vote>> {
        let votes = self.votes.clone();
        blocking(move || votes.votes_by_voter(&voter)).await
    }

    // Donations

    /// Open an account
    pub async fn open_account(&self, user: UserId, opening_balance: Decimal) -> Result<Account> {
        let donations = self.donations.clone();
        blocking(move || donations.open_account(&user, opening_balance)).await
    }

    /// Account with its current balance
    pub async fn get_account(&self, user: UserId) -> Result<Account> {
        let donations = self.donations.clone();
        blocking(move || donations.get_account(&user)).await
    }

    /// Transfer `amount` from `sender` to `receiver`
    pub async fn donate(
        &self,
        sender: UserId,
        receiver: UserId,
        amount: Decimal,
        message: Option<String>,
    ) -> Result<Donation> {
        let donations = self.donations.clone();
        let started = Instant::now();

        let donation = self.observe(
            blocking(move || donations.donate(&sender, &receiver, amount, message)).await,
            started,
        )?;

        tracing::info!(
            donation_id = %donation.donation_id,
            sender = %donation.sender,
            receiver = %donation.receiver,
            amount = %donation.amount,
            "Donation recorded"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_donation();
        }

        Ok(donation)
    }

    /// Donation by ID
    pub async fn get_donation(&self, donation_id: Uuid) -> Result<Option<Donation>> {
        let donations = self.donations.clone();
        blocking(move || donations.get_donation(donation_id)).await
    }

    /// Donations received by `user`
    pub async fn donations_received(&self, user: UserId) -> Result<Vec<Donation>> {
        let donations = self.donations.clone();
        blocking(move || donations.donations_received(&user)).await
    }

    /// Donations sent by `user`
    pub async fn donations_sent(&self, user: UserId) -> Result<Vec<Donation>> {
        let donations = self.donations.clone();
        blocking(move || donations.donations_sent(&user)).await
    }

    /// Transaction history of `user`, newest first
    pub async fn transactions(&self, user: UserId) -> Result<Vec<Transaction>> {
        let donations = self.donations.clone();
        blocking(move || donations.transactions(&user)).await
    }

    // Audit

    /// Compare a target's cached count with its vote log
    pub async fn audit_target(&self, target: TargetRef) -> Result<TargetAudit> {
        let auditor = self.auditor.clone();
        blocking(move || auditor.audit_target(&target)).await
    }

    /// Compare an account's balance with its transaction log
    pub async fn audit_account(&self, user: UserId) -> Result<AccountAudit> {
        let auditor = self.auditor.clone();
        blocking(move || auditor.audit_account(&user)).await
    }

    /// Audit everything, optionally repairing vote counts
    pub async fn audit_all(&self, repair: bool) -> Result<AuditReport> {
        let auditor = self.auditor.clone();
        blocking(move || auditor.audit_all(repair)).await
    }

    /// Rewrite a target's cached count from its vote log
    pub async fn repair_target(&self, target: TargetRef) -> Result<TargetAudit> {
        let auditor = self.auditor.clone();
        blocking(move || auditor.repair_target(&target)).await
    }

    /// Storage statistics
    pub async fn stats(&self) -> Result<crate::storage::StorageStats> {
        let storage = self.storage.clone();
        blocking(move || storage.get_stats()).await
    }

    /// Record the latency of a write and count conflicts, whatever the outcome
    fn observe<T>(&self, result: Result<T>, started: Instant) -> Result<T> {
        if let Some(metrics) = &self.metrics {
            metrics.record_duration(started.elapsed().as_secs_f64());
        }

        if let Err(e) = &result {
            if e.is_retryable() {
                tracing::warn!(error = %e, "Atomic unit aborted, caller may retry");
                if let Some(metrics) = &self.metrics {
                    metrics.record_conflict();
                }
            }
        }
        result
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TargetKind;
    use tempfile::TempDir;

    fn create_test_ledger() -> (Ledger, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        (Ledger::open(config).unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_ledger_open() {
        let (ledger, _temp) = create_test_ledger();
        assert!(ledger.metrics().is_some());
        assert_eq!(ledger.stats().await.unwrap().total_votes, 0);
    }

    #[tokio::test]
    async fn test_vote_flow() {
        let (ledger, _temp) = create_test_ledger();
        let target = TargetRef::new(TargetKind::Content, 1);
        let alice = UserId::new("alice");

        ledger.register_target(target).await.unwrap();
        ledger
            .cast_vote(alice.clone(), target, Polarity::Upvote)
            .await
            .unwrap();
        ledger
            .cast_vote(alice.clone(), target, Polarity::Upvote)
            .await
            .unwrap();
        let vote = ledger
            .cast_vote(alice.clone(), target, Polarity::Downvote)
            .await
            .unwrap();

        assert_eq!(vote.polarity, Polarity::Downvote);
        assert_eq!(ledger.get_target(target).await.unwrap().vote_count, -1);
        assert_eq!(ledger.votes_by_voter(alice).await.unwrap().len(), 1);

        let metrics = ledger.metrics().unwrap();
        assert_eq!(metrics.votes_total.get(), 2);
        assert_eq!(metrics.vote_noops.get(), 1);
        assert_eq!(metrics.vote_flips.get(), 1);

        let repaired = ledger.repair_target(target).await.unwrap();
        assert!(repaired.consistent());
        assert_eq!(repaired.recomputed, -1);
    }

    #[tokio::test]
    async fn test_donation_flow() {
        let (ledger, _temp) = create_test_ledger();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        ledger.open_account(alice.clone(), Decimal::from(100)).await.unwrap();
        ledger.open_account(bob.clone(), Decimal::ZERO).await.unwrap();

        let donation = ledger
            .donate(alice.clone(), bob.clone(), Decimal::from(50), None)
            .await
            .unwrap();

        assert_eq!(ledger.get_account(bob.clone()).await.unwrap().balance, Decimal::from(50));
        assert_eq!(
            ledger.donations_received(bob.clone()).await.unwrap(),
            vec![donation.clone()]
        );
        assert_eq!(
            ledger.get_donation(donation.donation_id).await.unwrap(),
            Some(donation)
        );
        assert_eq!(ledger.transactions(alice.clone()).await.unwrap().len(), 2);
        assert!(ledger.audit_account(alice).await.unwrap().consistent());
        assert_eq!(ledger.metrics().unwrap().donations_total.get(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_classified() {
        let (ledger, _temp) = create_test_ledger();
        let missing = TargetRef::new(TargetKind::ForumComment, 1);

        let err = ledger
            .cast_vote(UserId::new("alice"), missing, Polarity::Upvote)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);

        ledger.open_account(UserId::new("alice"), Decimal::ONE).await.unwrap();
        let err = ledger
            .donate(UserId::new("alice"), UserId::new("alice"), Decimal::ONE, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);

        // Rejected writes are still timed
        let metrics = ledger.metrics().unwrap();
        assert_eq!(metrics.operation_duration.get_sample_count(), 2);
        assert_eq!(metrics.votes_total.get(), 0);
        assert_eq!(metrics.donations_total.get(), 0);
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.metrics_enabled = false;

        let ledger = Ledger::open(config).unwrap();
        assert!(ledger.metrics().is_none());
        assert!(ledger.audit_all(false).await.unwrap().is_clean());
    }
}
