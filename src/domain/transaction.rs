use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::required;
use super::{Cents, MissingField, UserId};

pub type TransactionId = i64;

/// Category of a transaction. The set is open: callers may record any
/// non-empty tag, the constants below are the ones this service emits or
/// expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionType(String);

impl TransactionType {
    pub const DEPOSIT: &'static str = "deposit";
    pub const WITHDRAWAL: &'static str = "withdrawal";
    pub const REVERSAL: &'static str = "reversal";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn deposit() -> Self {
        Self::new(Self::DEPOSIT)
    }

    pub fn withdrawal() -> Self {
        Self::new(Self::WITHDRAWAL)
    }

    pub fn reversal() -> Self {
        Self::new(Self::REVERSAL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the tags listed as constants on this type.
    pub fn is_known(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::DEPOSIT | Self::WITHDRAWAL | Self::REVERSAL
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Type filter for listings and aggregates. `None` selects everything.
pub type TypeFilter = Option<TransactionType>;

/// Interpret a caller-supplied filter: absent, blank or `"all"` means no filter.
pub fn parse_type_filter(raw: Option<&str>) -> TypeFilter {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(tag) => Some(TransactionType::new(tag)),
    }
}

/// A recorded, immutable ledger entry.
/// Corrections are appended as reversals linked through `reverses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Assigned by the store, strictly increasing
    pub id: TransactionId,
    pub user_id: UserId,
    /// Signed: positive credits the wallet, negative debits it
    pub amount_cents: Cents,
    pub transaction_type: TransactionType,
    /// Set when this entry compensates an earlier one
    pub reverses: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }

    /// Build the compensating entry for this transaction.
    pub fn reversal_entry(&self) -> NewTransaction {
        NewTransaction {
            user_id: self.user_id,
            amount_cents: -self.amount_cents,
            transaction_type: TransactionType::reversal(),
            reverses: Some(self.id),
            created_at: super::now(),
        }
    }
}

/// A validated entry waiting for the store to assign its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub amount_cents: Cents,
    pub transaction_type: TransactionType,
    pub reverses: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn new(user_id: UserId, amount_cents: Cents, transaction_type: TransactionType) -> Self {
        Self {
            user_id,
            amount_cents,
            transaction_type,
            reverses: None,
            created_at: super::now(),
        }
    }

    /// Attach the store-assigned identifier. Both timestamps start equal.
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            user_id: self.user_id,
            amount_cents: self.amount_cents,
            transaction_type: self.transaction_type,
            reverses: self.reverses,
            created_at: self.created_at,
            modified_at: self.created_at,
        }
    }
}

/// Transaction request fields as decoded by a caller; any may be absent.
///
/// The user id stays a raw string here: a malformed id is reported as an
/// unknown user, not as a missing field.
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    pub user_id: Option<String>,
    pub amount_cents: Option<Cents>,
    pub transaction_type: Option<String>,
}

/// Draft whose required fields are all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedDraft {
    pub user_id: String,
    pub amount_cents: Cents,
    pub transaction_type: TransactionType,
}

impl TransactionDraft {
    pub fn new(user_id: impl Into<String>, amount_cents: Cents, tag: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            amount_cents: Some(amount_cents),
            transaction_type: Some(tag.into()),
        }
    }

    pub fn validate(self) -> Result<CheckedDraft, MissingField> {
        let user_id = required(self.user_id, "user_uuid")?;
        let transaction_type = required(self.transaction_type, "type")?;
        let amount_cents = self.amount_cents.ok_or(MissingField("amount"))?;
        Ok(CheckedDraft {
            user_id,
            amount_cents,
            transaction_type: TransactionType::new(transaction_type.trim()),
        })
    }
}
