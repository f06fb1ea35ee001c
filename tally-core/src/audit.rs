//! Consistency audit for derived aggregates
//!
//! Vote counts and balances are caches of their event logs. The audit
//! recomputes both from scratch and reports any drift. Vote counts can be
//! repaired in place because the vote log is authoritative; balances are
//! only reported.

use crate::{
    types::{TargetRef, UserId},
    Error, Result, Storage,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// Stored vs recomputed vote count of one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetAudit {
    /// Audited target
    pub target: TargetRef,
    /// Cached `vote_count`
    pub stored: i64,
    /// Sum of polarities over the vote log
    pub recomputed: i64,
}

impl TargetAudit {
    /// Cache matches log
    pub fn consistent(&self) -> bool {
        self.stored == self.recomputed
    }
}

/// Stored balance vs ledger sum of one account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountAudit {
    /// Audited account
    pub user_id: UserId,
    /// Cached balance
    pub stored: Decimal,
    /// Sum of the account's transaction legs
    pub ledger_sum: Decimal,
}

impl AccountAudit {
    /// Cache matches log
    pub fn consistent(&self) -> bool {
        self.stored == self.ledger_sum
    }
}

/// Result of a full audit
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    /// Number of targets checked
    pub targets_checked: usize,
    /// Number of accounts checked
    pub accounts_checked: usize,
    /// Targets whose count drifted
    pub target_drift: Vec<TargetAudit>,
    /// Accounts whose balance drifted
    pub account_drift: Vec<AccountAudit>,
    /// Targets rewritten by a repair pass
    pub repaired: Vec<TargetRef>,
}

impl AuditReport {
    /// No drift left after the audit (repaired targets count as fixed)
    pub fn is_clean(&self) -> bool {
        self.account_drift.is_empty()
            && self
                .target_drift
                .iter()
                .all(|drift| self.repaired.contains(&drift.target))
    }
}

/// Recomputes aggregates from their logs
#[derive(Debug, Clone)]
pub struct Auditor {
    storage: Arc<Storage>,
}

impl Auditor {
    /// Create auditor over a store
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Audit one target.
    ///
    /// The count and the vote log are read under the target lock, so a vote
    /// committing mid-audit cannot show up as drift.
    pub fn audit_target(&self, target: &TargetRef) -> Result<TargetAudit> {
        self.check_target(target, false)
    }

    /// Audit one account under its row lock
    pub fn audit_account(&self, user: &UserId) -> Result<AccountAudit> {
        self.storage.atomic(|txn| {
            let stored = txn
                .lock_account(user)?
                .ok_or_else(|| Error::AccountNotFound(user.clone()))?
                .balance;

            Ok(AccountAudit {
                user_id: user.clone(),
                stored,
                ledger_sum: self.storage.ledger_sum(user)?,
            })
        })
    }

    /// Audit every target and account, optionally repairing vote counts
    pub fn audit_all(&self, repair: bool) -> Result<AuditReport> {
        let mut report = AuditReport::default();

        for target in self.storage.targets()? {
            report.targets_checked += 1;
            let audit = self.check_target(&target.target, repair)?;
            if audit.consistent() {
                continue;
            }

            tracing::warn!(
                target = %audit.target,
                stored = audit.stored,
                recomputed = audit.recomputed,
                "Vote count drift"
            );

            if repair {
                report.repaired.push(audit.target);
            }
            report.target_drift.push(audit);
        }

        for account in self.storage.accounts()? {
            report.accounts_checked += 1;
            let audit = self.audit_account(&account.user_id)?;
            if !audit.consistent() {
                tracing::warn!(
                    user = %audit.user_id,
                    stored = %audit.stored,
                    ledger_sum = %audit.ledger_sum,
                    "Balance drift"
                );
                report.account_drift.push(audit);
            }
        }

        Ok(report)
    }

    /// Rewrite a target's count from its vote log
    pub fn repair_target(&self, target: &TargetRef) -> Result<TargetAudit> {
        self.check_target(target, true)
    }

    /// Compare a target's count with its log while holding the target lock.
    ///
    /// Every vote write takes the same lock first, so no vote can land
    /// between reading the count and scanning the log.
    fn check_target(&self, target: &TargetRef, repair: bool) -> Result<TargetAudit> {
        self.storage.atomic(|txn| {
            let mut counter = txn
                .lock_target(target)?
                .ok_or(Error::TargetNotFound(*target))?;

            let audit = TargetAudit {
                target: *target,
                stored: counter.vote_count,
                recomputed: self.recompute(target)?,
            };

            if repair && !audit.consistent() {
                counter.vote_count = audit.recomputed;
                txn.put_target(&counter)?;
                tracing::info!(
                    target = %target,
                    from = audit.stored,
                    to = audit.recomputed,
                    "Vote count repaired"
                );
            }

            Ok(audit)
        })
    }

    fn recompute(&self, target: &TargetRef) -> Result<i64> {
        Ok(self
            .storage
            .votes_for_target(target)?
            .iter()
            .map(|vote| vote.polarity.value())
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Polarity, TargetKind};
    use crate::{Config, DonationLedger, VoteAggregator};
    use tempfile::TempDir;

    fn test_store() -> (Arc<Storage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Arc::new(Storage::open(&config).unwrap()), temp_dir)
    }

    fn corrupt_count(storage: &Storage, target: TargetRef, vote_count: i64) {
        storage
            .atomic(|txn| {
                let mut counter = txn.lock_target(&target)?.unwrap();
                counter.vote_count = vote_count;
                txn.put_target(&counter)
            })
            .unwrap();
    }

    #[test]
    fn test_clean_store() {
        let (storage, _temp) = test_store();
        let votes = VoteAggregator::new(storage.clone());
        let donations = DonationLedger::new(storage.clone(), Default::default());

        let target = TargetRef::new(TargetKind::Content, 1);
        votes.register_target(target).unwrap();
        votes
            .cast_vote(&UserId::new("alice"), target, Polarity::Upvote)
            .unwrap();

        donations.open_account(&UserId::new("alice"), Decimal::from(10)).unwrap();
        donations.open_account(&UserId::new("bob"), Decimal::ZERO).unwrap();
        donations
            .donate(&UserId::new("alice"), &UserId::new("bob"), Decimal::from(4), None)
            .unwrap();

        let report = Auditor::new(storage).audit_all(false).unwrap();
        assert_eq!(report.targets_checked, 1);
        assert_eq!(report.accounts_checked, 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_detects_and_repairs_count_drift() {
        let (storage, _temp) = test_store();
        let votes = VoteAggregator::new(storage.clone());
        let target = TargetRef::new(TargetKind::ForumPost, 8);
        votes.register_target(target).unwrap();
        votes
            .cast_vote(&UserId::new("alice"), target, Polarity::Downvote)
            .unwrap();

        corrupt_count(&storage, target, 12);

        let auditor = Auditor::new(storage.clone());
        let report = auditor.audit_all(false).unwrap();
        assert!(!report.is_clean());
        assert_eq!(
            report.target_drift,
            vec![TargetAudit {
                target,
                stored: 12,
                recomputed: -1
            }]
        );

        let report = auditor.audit_all(true).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.repaired, vec![target]);
        assert_eq!(storage.get_target(&target).unwrap().vote_count, -1);
    }

    #[test]
    fn test_detects_balance_drift() {
        let (storage, _temp) = test_store();
        let donations = DonationLedger::new(storage.clone(), Default::default());
        let alice = UserId::new("alice");
        donations.open_account(&alice, Decimal::from(3)).unwrap();

        storage
            .atomic(|txn| {
                let mut account = txn.lock_account(&alice)?.unwrap();
                account.balance += Decimal::ONE;
                txn.put_account(&account)
            })
            .unwrap();

        let audit = Auditor::new(storage).audit_account(&alice).unwrap();
        assert!(!audit.consistent());
        assert_eq!(audit.stored, Decimal::from(4));
        assert_eq!(audit.ledger_sum, Decimal::from(3));
    }
}
