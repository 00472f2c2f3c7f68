//! Account lookups.
//!
//! # Invariants
//! - `find_many` is one round-trip for the whole id set.
//! - Deleted accounts are simply absent from the returned map.

use crate::model::account::{Account, AccountId};
use crate::repo::{placeholders, RepoResult};
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::{BTreeSet, HashMap};

/// Bulk account lookup used by rehydration and preloading.
pub trait AccountStore {
    /// Fetches every existing account in `ids` in a single lookup.
    fn find_many(&self, ids: &BTreeSet<AccountId>) -> RepoResult<HashMap<AccountId, Account>>;

    fn find(&self, id: AccountId) -> RepoResult<Option<Account>> {
        let mut accounts = self.find_many(&BTreeSet::from([id]))?;
        Ok(accounts.remove(&id))
    }
}

impl<T: AccountStore + ?Sized> AccountStore for &T {
    fn find_many(&self, ids: &BTreeSet<AccountId>) -> RepoResult<HashMap<AccountId, Account>> {
        (**self).find_many(ids)
    }
}

/// SQLite-backed account store.
pub struct SqliteAccountStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AccountStore for SqliteAccountStore<'_> {
    fn find_many(&self, ids: &BTreeSet<AccountId>) -> RepoResult<HashMap<AccountId, Account>> {
        load_accounts(self.conn, ids)
    }
}

pub(crate) fn load_accounts(
    conn: &Connection,
    ids: &BTreeSet<AccountId>,
) -> RepoResult<HashMap<AccountId, Account>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, display_name, updated_at
         FROM accounts
         WHERE id IN ({});",
        placeholders(ids.len())
    ))?;
    let mut rows = stmt.query(params_from_iter(ids.iter()))?;
    let mut accounts = HashMap::with_capacity(ids.len());
    while let Some(row) = rows.next()? {
        let account = parse_account_row(row)?;
        accounts.insert(account.id, account);
    }
    Ok(accounts)
}

fn parse_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        username: row.get("username")?,
        display_name: row.get("display_name")?,
        updated_at: row.get("updated_at")?,
    })
}
