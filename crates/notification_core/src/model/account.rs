//! Account snapshot shared by activities and notifications.

use serde::{Deserialize, Serialize};

/// Primary key of an account row in the account store.
pub type AccountId = i64;

/// Display-level account data attached to notifications and statuses.
///
/// Copies of this struct may be serialized into the secondary cache and go
/// stale there; the account store is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub display_name: String,
    /// Unix epoch milliseconds of the last profile change.
    pub updated_at: i64,
}
