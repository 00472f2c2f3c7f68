//! Batch refresh of attached origin accounts.
//!
//! Records read from the secondary cache keep a correct `from_account_id`
//! but may carry an outdated account snapshot. This repairs a whole batch
//! with a single bulk account lookup.

use crate::model::account::AccountId;
use crate::model::notification::Notification;
use crate::repo::account_repo::AccountStore;
use crate::repo::RepoResult;
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Replaces every record's `from_account` with a freshly fetched account.
///
/// # Contract
/// - At most one `AccountStore::find_many` call, for the distinct origin ids.
/// - A record whose origin account is gone (or has no origin) ends up with
///   `from_account = None`.
/// - Takes any batch of mutable records, e.g. `&mut Vec<Notification>` or the
///   records inside a list of views.
pub fn reload_stale_accounts<'a, S, I>(store: &S, items: I) -> RepoResult<()>
where
    S: AccountStore + ?Sized,
    I: IntoIterator<Item = &'a mut Notification>,
{
    let mut items: Vec<&'a mut Notification> = items.into_iter().collect();
    let account_ids: BTreeSet<AccountId> =
        items.iter().filter_map(|item| item.from_account_id).collect();
    let accounts = if account_ids.is_empty() {
        HashMap::new()
    } else {
        store.find_many(&account_ids)?
    };

    let mut missing = 0usize;
    for item in &mut items {
        item.from_account = item
            .from_account_id
            .and_then(|account_id| accounts.get(&account_id).cloned());
        if item.from_account_id.is_some() && item.from_account.is_none() {
            missing += 1;
        }
    }

    debug!(
        "event=rehydrate module=service status=ok items={} accounts={} missing={missing}",
        items.len(),
        account_ids.len()
    );
    Ok(())
}
