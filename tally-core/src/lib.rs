//! Tally Core
//!
//! Vote aggregation and donation ledger for a content platform.
//!
//! # Architecture
//!
//! - **Event log + cache**: votes and transaction legs are the source of truth;
//!   `vote_count` and `balance` are cached aggregates of them
//! - **Store-level atomicity**: each record write and its counter update commit
//!   in one RocksDB transaction; no in-process locks
//! - **Closed dispatch**: the six votable entity kinds are one enum
//!
//! # Invariants
//!
//! - Counter consistency: `vote_count` == Σ polarity of the target's votes
//! - At most one vote per (voter, target)
//! - Balance conservation: `balance` == Σ value of the account's legs
//! - Donations and legs are append-only

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod storage;
pub mod votes;
pub mod donations;
pub mod audit;
pub mod ledger;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, ErrorKind, Result};
pub use types::{
    Account, BalanceSnapshot, Donation, Polarity, TargetKind, TargetRef, Transaction,
    TransactionKind, UserId, Vote, VoteTarget,
};
pub use storage::Storage;
pub use votes::{VoteAggregator, VoteReceipt};
pub use donations::DonationLedger;
pub use audit::{AuditReport, Auditor};
pub use ledger::Ledger;
pub use config::Config;
