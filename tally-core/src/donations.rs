//! Donation ledger
//!
//! A donation moves `amount` from the sender's balance to the receiver's
//! balance and appends one ledger leg per side. The donation record, both
//! balance updates, both legs and the donation indices are written in one
//! [`Storage::atomic`] unit.
//!
//! # Invariants
//!
//! - Balance conservation: every account's balance equals the sum of its legs
//! - Paired legs: each donation has exactly one `-amount` and one `+amount` leg
//! - Immutability: donations and legs are never modified or deleted

use crate::{
    config::DonationConfig,
    storage::LedgerTxn,
    types::{Account, BalanceSnapshot, Donation, Transaction, TransactionKind, UserId},
    Error, Result, Storage,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Moves value between accounts
#[derive(Debug, Clone)]
pub struct DonationLedger {
    storage: Arc<Storage>,
    rules: DonationConfig,
}

impl DonationLedger {
    /// Create ledger over a store
    pub fn new(storage: Arc<Storage>, rules: DonationConfig) -> Self {
        Self { storage, rules }
    }

    /// Open an account.
    ///
    /// A positive opening balance is recorded as an `opening balance` leg.
    /// Opening an existing account returns it unchanged.
    pub fn open_account(&self, user: &UserId, opening_balance: Decimal) -> Result<Account> {
        user.validate()?;
        if opening_balance < Decimal::ZERO {
            return Err(Error::InvalidInput(
                "Opening balance must not be negative".to_string(),
            ));
        }

        self.storage.atomic(|txn| {
            if let Some(existing) = txn.lock_account(user)? {
                return Ok(existing);
            }

            let now = Utc::now();
            let account = Account {
                user_id: user.clone(),
                balance: opening_balance,
                created_at: now,
            };
            txn.put_account(&account)?;

            if !opening_balance.is_zero() {
                txn.put_transaction(&leg(
                    user,
                    opening_balance,
                    TransactionKind::OpeningBalance,
                    None,
                    BalanceSnapshot {
                        before: Decimal::ZERO,
                        after: opening_balance,
                    },
                    now,
                ))?;
            }

            tracing::debug!(user = %user, balance = %opening_balance, "Account opened");
            Ok(account)
        })
    }

    /// Transfer `amount` from `sender` to `receiver`
    pub fn donate(
        &self,
        sender: &UserId,
        receiver: &UserId,
        amount: Decimal,
        message: Option<String>,
    ) -> Result<Donation> {
        self.validate_donation(sender, receiver, amount, message.as_deref())?;

        self.storage.atomic(|txn| {
            // Lock in a fixed order so opposite transfers cannot deadlock
            let (mut from, mut to) = if sender < receiver {
                let from = lock_existing(txn, sender)?;
                let to = lock_existing(txn, receiver)?;
                (from, to)
            } else {
                let to = lock_existing(txn, receiver)?;
                let from = lock_existing(txn, sender)?;
                (from, to)
            };

            if !self.rules.allow_overdraft && from.balance < amount {
                return Err(Error::InvalidInput(format!(
                    "Insufficient balance: {} available, {} requested",
                    from.balance, amount
                )));
            }

            let now = Utc::now();
            let donation = Donation {
                donation_id: Uuid::now_v7(),
                sender: sender.clone(),
                receiver: receiver.clone(),
                amount,
                message,
                created_at: now,
            };

            let from_after = shift(sender, from.balance, -amount)?;
            let to_after = shift(receiver, to.balance, amount)?;

            let outgoing = leg(
                sender,
                -amount,
                TransactionKind::OutgoingDonation,
                Some(donation.donation_id),
                BalanceSnapshot {
                    before: from.balance,
                    after: from_after,
                },
                now,
            );
            let incoming = leg(
                receiver,
                amount,
                TransactionKind::IncomingDonation,
                Some(donation.donation_id),
                BalanceSnapshot {
                    before: to.balance,
                    after: to_after,
                },
                now,
            );

            from.balance = from_after;
            to.balance = to_after;

            txn.put_donation(&donation)?;
            txn.put_account(&from)?;
            txn.put_account(&to)?;
            txn.put_transaction(&outgoing)?;
            txn.put_transaction(&incoming)?;

            Ok(donation)
        })
    }

    /// Account with its current balance
    pub fn get_account(&self, user: &UserId) -> Result<Account> {
        self.storage.get_account(user)
    }

    /// Donation by ID
    pub fn get_donation(&self, donation_id: Uuid) -> Result<Option<Donation>> {
        self.storage.get_donation(donation_id)
    }

    /// Donations received by `user`, oldest first
    pub fn donations_received(&self, user: &UserId) -> Result<Vec<Donation>> {
        self.storage.donations_received(user)
    }

    /// Donations sent by `user`, oldest first
    pub fn donations_sent(&self, user: &UserId) -> Result<Vec<Donation>> {
        self.storage.donations_sent(user)
    }

    /// Ledger legs of `user`, newest first
    pub fn transactions(&self, user: &UserId) -> Result<Vec<Transaction>> {
        self.storage.transactions_for(user)
    }

    /// Sum of every leg recorded for `user`
    pub fn ledger_sum(&self, user: &UserId) -> Result<Decimal> {
        self.storage.ledger_sum(user)
    }

    fn validate_donation(
        &self,
        sender: &UserId,
        receiver: &UserId,
        amount: Decimal,
        message: Option<&str>,
    ) -> Result<()> {
        sender.validate()?;
        receiver.validate()?;

        if amount <= Decimal::ZERO {
            return Err(Error::InvalidInput("Amount must be positive".to_string()));
        }

        if sender == receiver {
            return Err(Error::InvalidInput(
                "Sender and receiver must differ".to_string(),
            ));
        }

        if let Some(message) = message {
            if message.chars().count() > self.rules.max_message_len {
                return Err(Error::InvalidInput(format!(
                    "Message longer than {} characters",
                    self.rules.max_message_len
                )));
            }
        }

        Ok(())
    }
}

fn lock_existing(txn: &LedgerTxn<'_>, user: &UserId) -> Result<Account> {
    txn.lock_account(user)?
        .ok_or_else(|| Error::AccountNotFound(user.clone()))
}

/// New balance after moving `balance` by exactly `value`.
///
/// Fails on overflow and when the result would be rounded, so a recorded leg
/// always matches the balance change.
fn shift(account: &UserId, balance: Decimal, value: Decimal) -> Result<Decimal> {
    balance
        .checked_add(value)
        .filter(|after| after.checked_sub(balance) == Some(value))
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "Balance of {} cannot move by {} exactly",
                account, value
            ))
        })
}

fn leg(
    account: &UserId,
    value: Decimal,
    kind: TransactionKind,
    donation_id: Option<Uuid>,
    snapshot: BalanceSnapshot,
    at: DateTime<Utc>,
) -> Transaction {
    Transaction {
        transaction_id: Uuid::now_v7(),
        account: account.clone(),
        value,
        kind,
        donation_id,
        snapshot: Some(snapshot),
        created_at: at,
    }
}
