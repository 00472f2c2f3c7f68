//! Origin account derivation for new notifications.
//!
//! # Invariants
//! - Runs only on unpersisted records; persisted `from_account_id` is never
//!   overwritten.
//! - Uses direct (non-eager) activity resolution.
//! - An unresolvable activity leaves `from_account_id` empty, not an error.

use crate::model::activity::Activity;
use crate::model::notification::Notification;
use crate::repo::activity_repo::ActivityStore;
use crate::repo::RepoResult;
use log::debug;

/// Sets `from_account_id` on a new record from its activity.
///
/// A mention's own `account_id` is the mentioned account, so the origin is
/// the author of the mentioning status instead.
pub fn resolve_origin<S: ActivityStore + ?Sized>(
    store: &S,
    notification: &mut Notification,
) -> RepoResult<()> {
    if !notification.is_new_record() {
        return Ok(());
    }

    let activity = notification.activity;
    let origin = match store.find_activity(&activity, None)? {
        Some(Activity::Mention(mention)) => store
            .find_status(mention.status_id, None)?
            .map(|status| status.account_id),
        Some(Activity::Status(status)) => Some(status.account_id),
        Some(Activity::Follow(follow)) | Some(Activity::FollowRequest(follow)) => {
            Some(follow.account_id)
        }
        Some(Activity::Favourite(favourite)) => Some(favourite.account_id),
        None => None,
    };

    match origin {
        Some(account_id) => debug!(
            "event=origin_resolve module=service status=ok activity={activity} from_account_id={account_id}"
        ),
        None => debug!(
            "event=origin_resolve module=service status=unresolved activity={activity}"
        ),
    }
    notification.from_account_id = origin;
    Ok(())
}
