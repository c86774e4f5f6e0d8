mod integrity;
mod ledger;
mod money;
mod transaction;
mod user;

pub use integrity::*;
pub use ledger::*;
pub use money::*;
pub use transaction::*;
pub use user::*;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision the store keeps (microseconds), so a
/// record reads back exactly as it was written.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A required input field was absent or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing required field: {}", self.0)
    }
}

impl std::error::Error for MissingField {}
