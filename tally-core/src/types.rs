//! Core types for the vote and donation ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode on disk, JSON towards the routing layer)
//! - Exact arithmetic (Decimal for money)
//! - Closed dispatch (enums instead of string tags)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

/// Longest accepted user identifier, in bytes
pub const MAX_USER_ID_LEN: usize = 255;

/// Opaque user identifier (voter, donor, account holder)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reject identifiers that cannot be stored
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }
        if self.0.len() > MAX_USER_ID_LEN {
            return Err(Error::InvalidInput(format!(
                "user id longer than {} bytes",
                MAX_USER_ID_LEN
            )));
        }
        Ok(())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of entity a vote can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum TargetKind {
    /// Literature / content item
    Content = 1,
    /// Chapter of a content item
    Chapter = 2,
    /// Forum post
    ForumPost = 3,
    /// Comment on a chapter
    ChapterComment = 4,
    /// Comment on a content item
    ContentComment = 5,
    /// Comment on a forum post
    ForumComment = 6,
}

impl TargetKind {
    /// All kinds, in tag order
    pub const ALL: [TargetKind; 6] = [
        TargetKind::Content,
        TargetKind::Chapter,
        TargetKind::ForumPost,
        TargetKind::ChapterComment,
        TargetKind::ContentComment,
        TargetKind::ForumComment,
    ];

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::Content => "content",
            TargetKind::Chapter => "chapter",
            TargetKind::ForumPost => "forum-post",
            TargetKind::ChapterComment => "chapter-comment",
            TargetKind::ContentComment => "content-comment",
            TargetKind::ForumComment => "forum-comment",
        }
    }

    /// Storage tag byte
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Decode a storage tag byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "content" | "literature" => Ok(TargetKind::Content),
            "chapter" => Ok(TargetKind::Chapter),
            "forum-post" | "forum" => Ok(TargetKind::ForumPost),
            "chapter-comment" => Ok(TargetKind::ChapterComment),
            "content-comment" | "literature-comment" => Ok(TargetKind::ContentComment),
            "forum-comment" => Ok(TargetKind::ForumComment),
            other => Err(Error::InvalidInput(format!("unknown target kind: {}", other))),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to one votable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRef {
    /// Entity kind
    pub kind: TargetKind,
    /// Entity id within its kind
    pub id: u64,
}

impl TargetRef {
    /// Create new target reference
    pub fn new(kind: TargetKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Signed unit value of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// +1
    Upvote,
    /// -1
    Downvote,
}

impl Polarity {
    /// Signed value
    pub fn value(&self) -> i64 {
        match self {
            Polarity::Upvote => 1,
            Polarity::Downvote => -1,
        }
    }
}

impl TryFrom<i64> for Polarity {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Polarity::Upvote),
            -1 => Ok(Polarity::Downvote),
            other => Err(Error::InvalidInput(format!(
                "polarity must be 1 or -1, got {}",
                other
            ))),
        }
    }
}

impl FromStr for Polarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upvote" => Ok(Polarity::Upvote),
            "downvote" => Ok(Polarity::Downvote),
            other => Err(Error::InvalidInput(format!("unknown vote type: {}", other))),
        }
    }
}

/// One user's vote on one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    /// Unique vote ID (UUIDv7)
    pub vote_id: Uuid,

    /// Owner of the vote
    pub voter: UserId,

    /// Voted entity
    pub target: TargetRef,

    /// Current polarity
    pub polarity: Polarity,

    /// First cast
    pub created_at: DateTime<Utc>,

    /// Last polarity change
    pub updated_at: DateTime<Utc>,
}

/// Votable entity with its cached vote count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteTarget {
    /// Entity reference
    pub target: TargetRef,

    /// Sum of polarities of all votes on this target
    pub vote_count: i64,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

/// User account holding a balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account holder
    pub user_id: UserId,

    /// Net sum of all transactions on this account
    pub balance: Decimal,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One transfer between two accounts (immutable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    /// Unique donation ID (UUIDv7)
    pub donation_id: Uuid,

    /// Donor
    pub sender: UserId,

    /// Recipient
    pub receiver: UserId,

    /// Transferred amount (positive)
    pub amount: Decimal,

    /// Optional note from the donor
    pub message: Option<String>,

    /// Donation timestamp
    pub created_at: DateTime<Utc>,
}

/// Kind tag of a ledger leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Receiver side of a donation
    #[serde(rename = "incoming donation")]
    IncomingDonation,
    /// Sender side of a donation
    #[serde(rename = "outgoing donation")]
    OutgoingDonation,
    /// Initial funds recorded when an account is opened
    #[serde(rename = "opening balance")]
    OpeningBalance,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionKind::IncomingDonation => "incoming donation",
            TransactionKind::OutgoingDonation => "outgoing donation",
            TransactionKind::OpeningBalance => "opening balance",
        })
    }
}

/// Balance before and after a leg was applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Balance before the leg
    pub before: Decimal,
    /// Balance after the leg
    pub after: Decimal,
}

/// One audit-log leg (immutable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUIDv7)
    pub transaction_id: Uuid,

    /// Owning account
    pub account: UserId,

    /// Signed value applied to the account
    pub value: Decimal,

    /// Kind tag
    pub kind: TransactionKind,

    /// Donation this leg belongs to
    pub donation_id: Option<Uuid>,

    /// Balance snapshot
    pub snapshot: Option<BalanceSnapshot>,

    /// Transaction timestamp
    pub created_at: DateTime<Utc>,
}
