use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{AppError, BalanceResult, ReversalResult};
use crate::domain::{format_cents, parse_cents, Cents, LedgerEntry, Transaction, User};

/// `returnStatus` value of a successful response.
pub const STATUS_SUCCESS: &str = "S";
/// `returnStatus` value of a failed response.
pub const STATUS_ERROR: &str = "E";

// ========================
// Requests
// ========================

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

/// Amounts may arrive as JSON numbers (`100`, `-30.5`) or decimal strings.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionRequest {
    pub user_uuid: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub amount: Option<Value>,
}

/// The identifier may arrive as a number or a string.
#[derive(Debug, Default, Deserialize)]
pub struct ReversalRequest {
    pub transaction_uuid: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

/// Convert a JSON amount into cents. `null` counts as absent.
pub fn amount_to_cents(amount: Option<&Value>) -> Result<Option<Cents>, AppError> {
    let raw = match amount {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(AppError::InvalidAmount(format!(
                "expected a number, got {}",
                other
            )));
        }
    };
    parse_cents(&raw)
        .map(Some)
        .map_err(|e| AppError::InvalidAmount(format!("'{}': {}", raw, e)))
}

/// Render an identifier field as text for the service layer.
pub fn identifier_to_string(id: Option<&Value>) -> Option<String> {
    match id? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ========================
// Responses
// ========================

/// UTC timestamps render with a `Z` suffix and microsecond precision.
pub fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub return_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_message: Option<&'static str>,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(body: T) -> Self {
        Self {
            return_status: STATUS_SUCCESS,
            return_message: None,
            body,
        }
    }

    pub fn ok_with_message(message: &'static str, body: T) -> Self {
        Self {
            return_status: STATUS_SUCCESS,
            return_message: Some(message),
            body,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDetails {
    pub uuid: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub status: String,
    pub created: String,
    pub modified: String,
}

impl From<&User> for UserDetails {
    fn from(user: &User) -> Self {
        Self {
            uuid: user.id.to_string(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            status: user.status.clone(),
            created: timestamp(user.created_at),
            modified: timestamp(user.modified_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    pub user_details: UserDetails,
}

#[derive(Debug, Serialize)]
pub struct AccountStatus {
    pub uuid: String,
    pub status: String,
    pub modified: String,
}

#[derive(Debug, Serialize)]
pub struct AccountBody {
    pub account: AccountStatus,
}

impl From<&User> for AccountBody {
    fn from(user: &User) -> Self {
        Self {
            account: AccountStatus {
                uuid: user.id.to_string(),
                status: user.status.clone(),
                modified: timestamp(user.modified_at),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub uuid: String,
    pub amount: String,
    pub last_updated: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceBody {
    pub balance: BalanceView,
}

impl From<&BalanceResult> for BalanceBody {
    fn from(result: &BalanceResult) -> Self {
        Self {
            balance: BalanceView {
                uuid: result.user_id.to_string(),
                amount: format_cents(result.balance),
                last_updated: timestamp(result.computed_at),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub id: i64,
    pub user_uuid: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverses: Option<i64>,
    pub created: String,
    pub modified: String,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            user_uuid: tx.user_id.to_string(),
            transaction_type: tx.transaction_type.to_string(),
            amount: format_cents(tx.amount_cents),
            reverses: tx.reverses,
            created: timestamp(tx.created_at),
            modified: timestamp(tx.modified_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionBody {
    pub transaction: TransactionView,
}

/// Listing row. Keys follow the listing format existing clients read:
/// `uuid` is the transaction id and `order_uid` its owner.
#[derive(Debug, Serialize)]
pub struct LedgerEntryView {
    pub uuid: String,
    pub order_uid: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub value: String,
    pub transaction_balance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverses: Option<i64>,
    pub created: String,
    pub modified: String,
}

impl From<&LedgerEntry> for LedgerEntryView {
    fn from(entry: &LedgerEntry) -> Self {
        let tx = &entry.transaction;
        Self {
            uuid: tx.id.to_string(),
            order_uid: tx.user_id.to_string(),
            transaction_type: tx.transaction_type.to_string(),
            value: format_cents(tx.amount_cents),
            transaction_balance: format_cents(entry.running_balance),
            reverses: tx.reverses,
            created: timestamp(tx.created_at),
            modified: timestamp(tx.modified_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionsBody {
    pub transactions: Vec<LedgerEntryView>,
}

#[derive(Debug, Serialize)]
pub struct ReversalView {
    pub status: &'static str,
    pub original: TransactionView,
    pub reversal: TransactionView,
    pub balance: String,
}

#[derive(Debug, Serialize)]
pub struct ReversalBody {
    pub transaction: ReversalView,
}

impl From<&ReversalResult> for ReversalBody {
    fn from(result: &ReversalResult) -> Self {
        Self {
            transaction: ReversalView {
                status: "reversed",
                original: TransactionView::from(&result.original),
                reversal: TransactionView::from(&result.reversal),
                balance: format_cents(result.balance),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_amount_accepts_numbers_and_strings() {
        assert_eq!(amount_to_cents(Some(&json!(100))).unwrap(), Some(10000));
        assert_eq!(amount_to_cents(Some(&json!(-30.5))).unwrap(), Some(-3050));
        assert_eq!(amount_to_cents(Some(&json!("12.34"))).unwrap(), Some(1234));
        assert_eq!(amount_to_cents(Some(&Value::Null)).unwrap(), None);
        assert_eq!(amount_to_cents(None).unwrap(), None);
    }

    #[test]
    fn test_amount_rejects_other_json() {
        assert!(amount_to_cents(Some(&json!(true))).is_err());
        assert!(amount_to_cents(Some(&json!("ten"))).is_err());
    }

    #[test]
    fn test_identifier_to_string() {
        assert_eq!(identifier_to_string(Some(&json!(42))), Some("42".into()));
        assert_eq!(identifier_to_string(Some(&json!("7"))), Some("7".into()));
        assert_eq!(identifier_to_string(Some(&json!([1]))), None);
        assert_eq!(identifier_to_string(None), None);
    }

    #[test]
    fn test_timestamps_use_zulu_suffix() {
        use chrono::TimeZone;

        let ts = Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap();
        assert_eq!(timestamp(ts), "2024-04-01T12:00:00.000000Z");
    }

    #[test]
    fn test_envelope_flattens_body() {
        let body = BalanceBody {
            balance: BalanceView {
                uuid: "u".into(),
                amount: "120.00".into(),
                last_updated: "now".into(),
            },
        };
        let value = serde_json::to_value(Envelope::ok(body)).unwrap();
        assert_eq!(value["returnStatus"], "S");
        assert_eq!(value["balance"]["amount"], "120.00");
        assert!(value.get("returnMessage").is_none());
    }
}
