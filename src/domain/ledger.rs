use serde::Serialize;

use super::{Cents, Transaction, TransactionId};

/// A transaction annotated with the running balance after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub transaction: Transaction,
    pub running_balance: Cents,
}

/// Annotate an already ordered sequence with prefix sums.
///
/// The sum only covers the sequence it is given: when the caller filtered
/// by type first, the figures are not the account balance.
pub fn running_balances(
    transactions: Vec<Transaction>,
) -> Result<Vec<LedgerEntry>, BalanceOverflow> {
    let mut balance: Cents = 0;
    transactions
        .into_iter()
        .map(|transaction| -> Result<LedgerEntry, BalanceOverflow> {
            balance = balance
                .checked_add(transaction.amount_cents)
                .ok_or(BalanceOverflow {
                    transaction_id: transaction.id,
                })?;
            Ok(LedgerEntry {
                transaction,
                running_balance: balance,
            })
        })
        .collect()
}

/// A running balance left the representable range of [`Cents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceOverflow {
    /// First entry whose amount could not be added
    pub transaction_id: TransactionId,
}

impl std::fmt::Display for BalanceOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Balance out of range at transaction {}",
            self.transaction_id
        )
    }
}

impl std::error::Error for BalanceOverflow {}

/// Check whether `original` may be reversed given the reversal already on
/// file for it, if any.
pub fn validate_reversal(
    original: &Transaction,
    existing_reversal: Option<&Transaction>,
) -> Result<(), ReversalError> {
    if original.is_reversal() {
        return Err(ReversalError::IsReversal(original.id));
    }
    if let Some(existing) = existing_reversal {
        return Err(ReversalError::AlreadyReversed {
            original_id: original.id,
            reversal_id: existing.id,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReversalError {
    AlreadyReversed {
        original_id: TransactionId,
        reversal_id: TransactionId,
    },
    IsReversal(TransactionId),
}

impl std::fmt::Display for ReversalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReversalError::AlreadyReversed {
                original_id,
                reversal_id,
            } => write!(
                f,
                "Transaction {} was already reversed by transaction {}",
                original_id, reversal_id
            ),
            ReversalError::IsReversal(id) => {
                write!(f, "Transaction {} is itself a reversal", id)
            }
        }
    }
}

impl std::error::Error for ReversalError {}
