//! Storage layer using RocksDB
//!
//! The database is opened as a pessimistic `TransactionDB`. Every write that
//! touches more than one record goes through [`Storage::atomic`], which runs a
//! closure against a [`LedgerTxn`] and commits only if the closure succeeds.
//! Reads taken through `LedgerTxn::lock_*` hold a row lock until commit, so a
//! read-modify-write of a counter can never lose a concurrent update.
//!
//! # Column Families
//!
//! - `votes` - Vote records (key: target_key || user_key)
//! - `targets` - Vote targets with cached counts (key: target_key)
//! - `accounts` - Accounts with balances (key: user_key)
//! - `donations` - Donation records (key: donation_id)
//! - `transactions` - Ledger legs (key: transaction_id)
//! - `indices` - Secondary indices; the value is the primary key
//!
//! `target_key` is the kind tag byte followed by the big-endian id.
//! `user_key` is a one-byte length prefix followed by the UTF-8 id, so a
//! user's prefix never matches another user's keys.

use crate::{
    error::{Error, Result},
    types::{Account, Donation, TargetRef, Transaction, UserId, Vote, VoteTarget},
    Config,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, TransactionDB,
    TransactionDBOptions, TransactionOptions, WriteOptions,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Column family names
const CF_VOTES: &str = "votes";
const CF_TARGETS: &str = "targets";
const CF_ACCOUNTS: &str = "accounts";
const CF_DONATIONS: &str = "donations";
const CF_TRANSACTIONS: &str = "transactions";
const CF_INDICES: &str = "indices";

/// Index namespaces inside `indices`
const IDX_VOTER: u8 = b'V';
const IDX_RECEIVED: u8 = b'R';
const IDX_SENT: u8 = b'S';
const IDX_ACCOUNT_TXN: u8 = b'T';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: TransactionDB,
    path: PathBuf,
    lock_timeout_ms: i64,
    deadlock_detect: bool,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.path)
            .field("lock_timeout_ms", &self.lock_timeout_ms)
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let mut txn_db_opts = TransactionDBOptions::default();
        txn_db_opts.set_txn_lock_timeout(config.transactions.lock_timeout_ms);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_VOTES, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_TARGETS, Self::cf_options_counters()),
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_counters()),
            ColumnFamilyDescriptor::new(CF_DONATIONS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = TransactionDB::open_cf_descriptors(&db_opts, &txn_db_opts, path, cf_descriptors)?;

        tracing::info!(
            path = ?path,
            lock_timeout_ms = config.transactions.lock_timeout_ms,
            "Opened RocksDB transaction store"
        );

        Ok(Self {
            db,
            path: path.clone(),
            lock_timeout_ms: config.transactions.lock_timeout_ms,
            deadlock_detect: config.transactions.deadlock_detect,
        })
    }

    // Column family options

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_counters() -> Options {
        let mut opts = Options::default();
        // Counters are read on every write, keep them cheap to decompress
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Atomic write unit

    /// Run `f` inside one RocksDB transaction.
    ///
    /// The transaction commits when `f` returns `Ok`. On `Err` it is dropped
    /// uncommitted and every write made through the [`LedgerTxn`] is discarded.
    /// Lock timeouts and deadlocks surface as [`Error::Conflict`].
    pub fn atomic<T>(&self, f: impl FnOnce(&LedgerTxn<'_>) -> Result<T>) -> Result<T> {
        let mut txn_opts = TransactionOptions::default();
        txn_opts.set_lock_timeout(self.lock_timeout_ms);
        txn_opts.set_deadlock_detect(self.deadlock_detect);

        let unit = LedgerTxn {
            storage: self,
            txn: self.db.transaction_opt(&WriteOptions::default(), &txn_opts),
        };

        let value = f(&unit)?;
        unit.txn.commit()?;

        Ok(value)
    }

    // Point lookups (committed state)

    /// Get vote by voter and target
    pub fn get_vote(&self, voter: &UserId, target: &TargetRef) -> Result<Option<Vote>> {
        self.fetch(CF_VOTES, &vote_key(target, voter)?)
    }

    /// Get vote target
    pub fn get_target(&self, target: &TargetRef) -> Result<VoteTarget> {
        self.fetch(CF_TARGETS, &target_key(target))?
            .ok_or(Error::TargetNotFound(*target))
    }

    /// Get account
    pub fn get_account(&self, user: &UserId) -> Result<Account> {
        self.fetch(CF_ACCOUNTS, &user_key(user)?)?
            .ok_or_else(|| Error::AccountNotFound(user.clone()))
    }

    /// Get donation by ID
    pub fn get_donation(&self, donation_id: Uuid) -> Result<Option<Donation>> {
        self.fetch(CF_DONATIONS, donation_id.as_bytes())
    }

    // Scans

    /// All votes on a target
    pub fn votes_for_target(&self, target: &TargetRef) -> Result<Vec<Vote>> {
        self.scan_prefix(CF_VOTES, &target_key(target))?
            .into_iter()
            .map(|(_, value)| decode(&value))
            .collect()
    }

    /// All votes held by a voter, ordered by target
    pub fn votes_by_voter(&self, voter: &UserId) -> Result<Vec<Vote>> {
        self.follow_index(&index_prefix(IDX_VOTER, voter)?, CF_VOTES)
    }

    /// Donations received by an account, oldest first
    pub fn donations_received(&self, user: &UserId) -> Result<Vec<Donation>> {
        self.follow_index(&index_prefix(IDX_RECEIVED, user)?, CF_DONATIONS)
    }

    /// Donations sent by an account, oldest first
    pub fn donations_sent(&self, user: &UserId) -> Result<Vec<Donation>> {
        self.follow_index(&index_prefix(IDX_SENT, user)?, CF_DONATIONS)
    }

    /// Transaction history of an account, newest first
    pub fn transactions_for(&self, user: &UserId) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> =
            self.follow_index(&index_prefix(IDX_ACCOUNT_TXN, user)?, CF_TRANSACTIONS)?;
        transactions.reverse();
        Ok(transactions)
    }

    /// Sum of every leg recorded for an account
    pub fn ledger_sum(&self, user: &UserId) -> Result<Decimal> {
        self.transactions_for(user)?
            .iter()
            .try_fold(Decimal::ZERO, |sum, leg| sum.checked_add(leg.value))
            .ok_or_else(|| {
                Error::InvariantViolation(format!("ledger sum of {} overflows", user))
            })
    }

    /// Every registered vote target
    pub fn targets(&self) -> Result<Vec<VoteTarget>> {
        self.scan_prefix(CF_TARGETS, &[])?
            .into_iter()
            .map(|(_, value)| decode(&value))
            .collect()
    }

    /// Every registered account
    pub fn accounts(&self) -> Result<Vec<Account>> {
        self.scan_prefix(CF_ACCOUNTS, &[])?
            .into_iter()
            .map(|(_, value)| decode(&value))
            .collect()
    }

    fn fetch<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf_handle(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = self.cf_handle(cf_name)?;
        let mode = if prefix.is_empty() {
            IteratorMode::Start
        } else {
            IteratorMode::From(prefix, Direction::Forward)
        };

        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, mode) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key, value));
        }

        Ok(entries)
    }

    fn follow_index<T: DeserializeOwned>(&self, prefix: &[u8], cf_name: &str) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for (key, primary) in self.scan_prefix(CF_INDICES, prefix)? {
            let record = self.fetch(cf_name, &primary)?.ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "index entry {:?} points at missing {} record",
                    key, cf_name
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_votes: self.scan_prefix(CF_VOTES, &[])?.len() as u64,
            total_targets: self.scan_prefix(CF_TARGETS, &[])?.len() as u64,
            total_accounts: self.scan_prefix(CF_ACCOUNTS, &[])?.len() as u64,
            total_donations: self.scan_prefix(CF_DONATIONS, &[])?.len() as u64,
            total_transactions: self.scan_prefix(CF_TRANSACTIONS, &[])?.len() as u64,
        })
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// One open atomic write unit.
///
/// Every `lock_*` read takes an exclusive row lock that is held until the
/// surrounding [`Storage::atomic`] call commits or rolls back, including for
/// keys that do not exist yet.
pub struct LedgerTxn<'a> {
    storage: &'a Storage,
    txn: rocksdb::Transaction<'a, TransactionDB>,
}

impl std::fmt::Debug for LedgerTxn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerTxn").field("storage", self.storage).finish()
    }
}

impl LedgerTxn<'_> {
    /// Lock and read a vote target
    pub fn lock_target(&self, target: &TargetRef) -> Result<Option<VoteTarget>> {
        self.lock(CF_TARGETS, &target_key(target))
    }

    /// Lock and read the vote of `voter` on `target`
    pub fn lock_vote(&self, voter: &UserId, target: &TargetRef) -> Result<Option<Vote>> {
        self.lock(CF_VOTES, &vote_key(target, voter)?)
    }

    /// Lock and read an account
    pub fn lock_account(&self, user: &UserId) -> Result<Option<Account>> {
        self.lock(CF_ACCOUNTS, &user_key(user)?)
    }

    /// Write a vote target
    pub fn put_target(&self, target: &VoteTarget) -> Result<()> {
        self.put(CF_TARGETS, &target_key(&target.target), target)
    }

    /// Write a vote and its voter index entry
    pub fn put_vote(&self, vote: &Vote) -> Result<()> {
        let key = vote_key(&vote.target, &vote.voter)?;
        self.put(CF_VOTES, &key, vote)?;

        let mut idx = index_prefix(IDX_VOTER, &vote.voter)?;
        idx.extend_from_slice(&target_key(&vote.target));
        self.put_index(&idx, &key)
    }

    /// Write an account
    pub fn put_account(&self, account: &Account) -> Result<()> {
        self.put(CF_ACCOUNTS, &user_key(&account.user_id)?, account)
    }

    /// Write a donation and its sender / receiver index entries
    pub fn put_donation(&self, donation: &Donation) -> Result<()> {
        let key = donation.donation_id.as_bytes();
        self.put(CF_DONATIONS, key, donation)?;

        let suffix = time_ordered_suffix(donation.created_at, donation.donation_id);

        let mut received = index_prefix(IDX_RECEIVED, &donation.receiver)?;
        received.extend_from_slice(&suffix);
        self.put_index(&received, key)?;

        let mut sent = index_prefix(IDX_SENT, &donation.sender)?;
        sent.extend_from_slice(&suffix);
        self.put_index(&sent, key)
    }

    /// Append a ledger leg and its account index entry
    pub fn put_transaction(&self, transaction: &Transaction) -> Result<()> {
        let key = transaction.transaction_id.as_bytes();
        self.put(CF_TRANSACTIONS, key, transaction)?;

        let mut idx = index_prefix(IDX_ACCOUNT_TXN, &transaction.account)?;
        idx.extend_from_slice(&time_ordered_suffix(
            transaction.created_at,
            transaction.transaction_id,
        ));
        self.put_index(&idx, key)
    }

    fn lock<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.storage.cf_handle(cf_name)?;
        match self.txn.get_for_update_cf(cf, key, true)? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], record: &T) -> Result<()> {
        let cf = self.storage.cf_handle(cf_name)?;
        let value = bincode::serialize(record)?;
        self.txn.put_cf(cf, key, value)?;
        Ok(())
    }

    fn put_index(&self, key: &[u8], primary: &[u8]) -> Result<()> {
        let cf = self.storage.cf_handle(CF_INDICES)?;
        self.txn.put_cf(cf, key, primary)?;
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    /// Vote records
    pub total_votes: u64,
    /// Registered vote targets
    pub total_targets: u64,
    /// Registered accounts
    pub total_accounts: u64,
    /// Donation records
    pub total_donations: u64,
    /// Ledger legs
    pub total_transactions: u64,
}

// Key helpers

fn decode<T: DeserializeOwned>(value: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(value)?)
}

fn target_key(target: &TargetRef) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = target.kind.tag();
    key[1..].copy_from_slice(&target.id.to_be_bytes());
    key
}

fn user_key(user: &UserId) -> Result<Vec<u8>> {
    // Valid ids are 1..=255 bytes, so the length fits the prefix byte
    user.validate()?;
    let bytes = user.as_str().as_bytes();

    let mut key = Vec::with_capacity(bytes.len() + 1);
    key.push(bytes.len() as u8);
    key.extend_from_slice(bytes);
    Ok(key)
}

fn vote_key(target: &TargetRef, voter: &UserId) -> Result<Vec<u8>> {
    let mut key = target_key(target).to_vec();
    key.extend_from_slice(&user_key(voter)?);
    Ok(key)
}

fn index_prefix(namespace: u8, user: &UserId) -> Result<Vec<u8>> {
    let mut key = vec![namespace];
    key.extend_from_slice(&user_key(user)?);
    Ok(key)
}

fn time_ordered_suffix(at: DateTime<Utc>, id: Uuid) -> [u8; 24] {
    let nanos = at.timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
    let mut suffix = [0u8; 24];
    suffix[..8].copy_from_slice(&nanos.to_be_bytes());
    suffix[8..].copy_from_slice(id.as_bytes());
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Polarity, TargetKind, TransactionKind};
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_vote(voter: &str, target: TargetRef) -> Vote {
        Vote {
            vote_id: Uuid::now_v7(),
            voter: UserId::new(voter),
            target,
            polarity: Polarity::Upvote,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_transaction(account: &str, value: i64, at: DateTime<Utc>) -> Transaction {
        Transaction {
            transaction_id: Uuid::now_v7(),
            account: UserId::new(account),
            value: Decimal::from(value),
            kind: TransactionKind::IncomingDonation,
            donation_id: None,
            snapshot: None,
            created_at: at,
        }
    }

    #[test]
    fn test_storage_open() {
        let (storage, _temp) = test_storage();
        assert!(storage.db.cf_handle(CF_VOTES).is_some());
        assert!(storage.db.cf_handle(CF_INDICES).is_some());
    }

    #[test]
    fn test_atomic_commit() {
        let (storage, _temp) = test_storage();
        let target = TargetRef::new(TargetKind::Chapter, 3);

        storage
            .atomic(|txn| {
                txn.put_target(&VoteTarget {
                    target,
                    vote_count: 1,
                    created_at: Utc::now(),
                })?;
                txn.put_vote(&test_vote("alice", target))
            })
            .unwrap();

        assert_eq!(storage.get_target(&target).unwrap().vote_count, 1);
        assert!(storage
            .get_vote(&UserId::new("alice"), &target)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_atomic_rollback_on_error() {
        let (storage, _temp) = test_storage();
        let target = TargetRef::new(TargetKind::Content, 9);

        let result: Result<()> = storage.atomic(|txn| {
            txn.put_target(&VoteTarget {
                target,
                vote_count: 5,
                created_at: Utc::now(),
            })?;
            txn.put_vote(&test_vote("bob", target))?;
            Err(Error::Conflict("injected".to_string()))
        });

        assert!(matches!(result, Err(Error::Conflict(_))));
        assert!(matches!(
            storage.get_target(&target),
            Err(Error::TargetNotFound(_))
        ));
        assert!(storage.votes_by_voter(&UserId::new("bob")).unwrap().is_empty());
    }

    #[test]
    fn test_user_prefixes_do_not_collide() {
        let (storage, _temp) = test_storage();
        let target = TargetRef::new(TargetKind::ForumPost, 1);
        let other = TargetRef::new(TargetKind::ForumPost, 2);

        storage
            .atomic(|txn| {
                txn.put_vote(&test_vote("ab", target))?;
                txn.put_vote(&test_vote("abc", other))
            })
            .unwrap();

        let votes = storage.votes_by_voter(&UserId::new("ab")).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].target, target);
    }

    #[test]
    fn test_votes_for_target_scoped_by_kind() {
        let (storage, _temp) = test_storage();
        let chapter = TargetRef::new(TargetKind::Chapter, 42);
        let comment = TargetRef::new(TargetKind::ChapterComment, 42);

        storage
            .atomic(|txn| {
                txn.put_vote(&test_vote("alice", chapter))?;
                txn.put_vote(&test_vote("bob", chapter))?;
                txn.put_vote(&test_vote("carol", comment))
            })
            .unwrap();

        assert_eq!(storage.votes_for_target(&chapter).unwrap().len(), 2);
        assert_eq!(storage.votes_for_target(&comment).unwrap().len(), 1);
    }

    #[test]
    fn test_transactions_newest_first() {
        let (storage, _temp) = test_storage();
        let start = Utc::now();

        storage
            .atomic(|txn| {
                txn.put_transaction(&test_transaction("alice", 1, start))?;
                txn.put_transaction(&test_transaction(
                    "alice",
                    2,
                    start + Duration::milliseconds(5),
                ))?;
                txn.put_transaction(&test_transaction(
                    "alice",
                    3,
                    start + Duration::milliseconds(10),
                ))?;
                txn.put_transaction(&test_transaction("bob", 4, start))
            })
            .unwrap();

        let values: Vec<Decimal> = storage
            .transactions_for(&UserId::new("alice"))
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect();
        assert_eq!(
            values,
            vec![Decimal::from(3), Decimal::from(2), Decimal::from(1)]
        );
    }

    #[test]
    fn test_target_keys_sort_by_kind_then_id() {
        let a = target_key(&TargetRef::new(TargetKind::Content, u64::MAX));
        let b = target_key(&TargetRef::new(TargetKind::Chapter, 0));
        let c = target_key(&TargetRef::new(TargetKind::Chapter, 1));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_oversized_user_ids_are_rejected() {
        let (storage, _temp) = test_storage();
        let long = UserId::new("x".repeat(256));
        let target = TargetRef::new(TargetKind::Content, 1);

        for result in [
            storage.get_account(&long).map(|_| ()),
            storage.get_vote(&long, &target).map(|_| ()),
            storage.transactions_for(&long).map(|_| ()),
            storage.donations_received(&long).map(|_| ()),
            storage.donations_sent(&long).map(|_| ()),
        ] {
            assert!(matches!(result, Err(Error::InvalidInput(_))));
        }

        let written = storage.atomic(|txn| txn.put_vote(&test_vote(long.as_str(), target)));
        assert!(matches!(written, Err(Error::InvalidInput(_))));
        assert_eq!(storage.get_stats().unwrap().total_votes, 0);

        // The longest valid id still round-trips
        let widest = "y".repeat(255);
        storage
            .atomic(|txn| txn.put_vote(&test_vote(&widest, target)))
            .unwrap();
        assert_eq!(storage.votes_by_voter(&UserId::new(widest)).unwrap().len(), 1);
    }

    #[test]
    fn test_ledger_sum() {
        let (storage, _temp) = test_storage();
        let now = Utc::now();

        storage
            .atomic(|txn| {
                txn.put_transaction(&test_transaction("alice", 7, now))?;
                txn.put_transaction(&test_transaction("alice", -3, now))
            })
            .unwrap();

        assert_eq!(
            storage.ledger_sum(&UserId::new("alice")).unwrap(),
            Decimal::from(4)
        );
        assert_eq!(storage.ledger_sum(&UserId::new("bob")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_stats() {
        let (storage, _temp) = test_storage();
        let target = TargetRef::new(TargetKind::Content, 1);

        storage
            .atomic(|txn| txn.put_vote(&test_vote("alice", target)))
            .unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.total_votes, 1);
        assert_eq!(stats.total_donations, 0);
    }
}
