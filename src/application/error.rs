use thiserror::Error;

use crate::domain::{MissingField, ReversalError, TransactionId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Missing transaction identifier")]
    MissingIdentifier,

    #[error("No transactions found for user {0}")]
    NoTransactionsFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Transaction {original_id} was already reversed by transaction {reversal_id}")]
    TransactionAlreadyReversed {
        original_id: TransactionId,
        reversal_id: TransactionId,
    },

    #[error("Transaction {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(TransactionId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Balance out of range for user {0}")]
    BalanceOverflow(String),

    /// A durable write failed; the store transaction was rolled back.
    #[error("Failed to write to the store: {0:#}")]
    StoreWriteFailure(anyhow::Error),

    #[error("Database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

impl From<MissingField> for AppError {
    fn from(err: MissingField) -> Self {
        AppError::MissingField(err.0)
    }
}

impl From<ReversalError> for AppError {
    fn from(err: ReversalError) -> Self {
        match err {
            ReversalError::AlreadyReversed {
                original_id,
                reversal_id,
            } => AppError::TransactionAlreadyReversed {
                original_id,
                reversal_id,
            },
            ReversalError::IsReversal(id) => AppError::CannotReverseReversal(id),
        }
    }
}
