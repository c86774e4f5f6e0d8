use serde::Serialize;

/// Raw counters gathered by the store for an integrity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityStats {
    pub user_count: i64,
    pub transaction_count: i64,
    /// Transactions whose owner no longer resolves
    pub orphaned_transactions: i64,
    /// Reversals pointing at a transaction that does not exist
    pub dangling_reversals: i64,
    /// Reversals whose amount is not the negation of the original
    pub mismatched_reversals: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub user_count: i64,
    pub transaction_count: i64,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn build_integrity_report(stats: &IntegrityStats) -> IntegrityReport {
    let mut issues = Vec::new();

    if stats.orphaned_transactions > 0 {
        issues.push(format!(
            "{} transaction(s) reference a missing user",
            stats.orphaned_transactions
        ));
    }
    if stats.dangling_reversals > 0 {
        issues.push(format!(
            "{} reversal(s) reference a missing transaction",
            stats.dangling_reversals
        ));
    }
    if stats.mismatched_reversals > 0 {
        issues.push(format!(
            "{} reversal(s) do not negate the original amount",
            stats.mismatched_reversals
        ));
    }

    IntegrityReport {
        user_count: stats.user_count,
        transaction_count: stats.transaction_count,
        issues,
    }
}
