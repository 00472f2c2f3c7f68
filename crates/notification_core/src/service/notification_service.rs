//! Notification use-case service.
//!
//! # Responsibility
//! - Run the creation pipeline: construct, resolve origin, validate, persist.
//! - Load display-ready feeds with eagerly resolved activities.
//! - Serve rendered feeds through the secondary cache and repair stale
//!   origin account snapshots.
//!
//! # Invariants
//! - The origin is derived once, before the record becomes visible.
//! - A duplicate create is a no-op that returns the existing record.
//! - Orphaned notifications (activity deleted) are hidden from feeds.
//! - Store lookups are issued per batch, never per record.

use crate::cache::{self, NotificationCache};
use crate::model::account::AccountId;
use crate::model::activity::{ActivityPreload, ActivityRef};
use crate::model::notification::{
    Notification, NotificationId, NotificationValidationError, NotificationView,
};
use crate::repo::account_repo::{AccountStore, SqliteAccountStore};
use crate::repo::activity_repo::{ActivityStore, SqliteActivityStore};
use crate::repo::notification_repo::{
    InsertOutcome, NotificationListQuery, NotificationRepository, SqliteNotificationRepository,
};
use crate::repo::RepoError;
use crate::service::origin::resolve_origin;
use crate::service::rehydrate::reload_stale_accounts;
use log::{info, warn};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Service error for notification use-cases.
#[derive(Debug, Error)]
pub enum NotificationServiceError {
    #[error(transparent)]
    Validation(#[from] NotificationValidationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("inconsistent notification state: {0}")]
    InconsistentState(&'static str),
}

pub type ServiceResult<T> = Result<T, NotificationServiceError>;

/// Result of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Notification),
    /// The recipient already had a notification for this activity.
    AlreadyExists(Notification),
}

impl CreateOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn notification(&self) -> &Notification {
        match self {
            Self::Created(notification) | Self::AlreadyExists(notification) => notification,
        }
    }

    pub fn into_notification(self) -> Notification {
        match self {
            Self::Created(notification) | Self::AlreadyExists(notification) => notification,
        }
    }
}

/// Notification service facade over store implementations.
pub struct NotificationService<N, S, A>
where
    N: NotificationRepository,
    S: ActivityStore,
    A: AccountStore,
{
    notifications: N,
    activities: S,
    accounts: A,
    preload: ActivityPreload,
}

impl<'conn>
    NotificationService<
        SqliteNotificationRepository<'conn>,
        SqliteActivityStore<'conn>,
        SqliteAccountStore<'conn>,
    >
{
    /// Builds a service whose stores all share one migrated connection.
    pub fn sqlite(conn: &'conn Connection) -> Self {
        Self::new(
            SqliteNotificationRepository::new(conn),
            SqliteActivityStore::new(conn),
            SqliteAccountStore::new(conn),
        )
    }
}

impl<N, S, A> NotificationService<N, S, A>
where
    N: NotificationRepository,
    S: ActivityStore,
    A: AccountStore,
{
    /// Creates a service using the notification display preload.
    pub fn new(notifications: N, activities: S, accounts: A) -> Self {
        Self {
            notifications,
            activities,
            accounts,
            preload: ActivityPreload::for_notifications(),
        }
    }

    /// Replaces the preload used when resolving activities for display.
    pub fn with_preload(mut self, preload: ActivityPreload) -> Self {
        self.preload = preload;
        self
    }

    /// Creates a notification for `account_id` about `activity`.
    ///
    /// # Contract
    /// - The origin account is resolved before the insert.
    /// - A duplicate `(account_id, activity)` returns `AlreadyExists`.
    pub fn create(
        &self,
        account_id: AccountId,
        activity: ActivityRef,
    ) -> ServiceResult<CreateOutcome> {
        let mut notification = Notification::new(account_id, activity);
        resolve_origin(&self.activities, &mut notification)?;
        notification.validate()?;

        match self.notifications.insert(&notification)? {
            InsertOutcome::Inserted(created) => {
                info!(
                    "event=notification_create module=service status=ok account_id={account_id} activity={activity} kind={}",
                    created.kind().as_str()
                );
                Ok(CreateOutcome::Created(created))
            }
            InsertOutcome::Duplicate => {
                let existing = self
                    .notifications
                    .find_by_activity(account_id, &activity)?
                    .ok_or(NotificationServiceError::InconsistentState(
                        "duplicate notification not found on read-back",
                    ))?;
                info!(
                    "event=notification_create module=service status=duplicate account_id={account_id} activity={activity}"
                );
                Ok(CreateOutcome::AlreadyExists(existing))
            }
        }
    }

    pub fn get(&self, id: NotificationId) -> ServiceResult<Option<Notification>> {
        Ok(self.notifications.get(id)?)
    }

    /// Lists a recipient's notifications ready for rendering.
    ///
    /// Activities are resolved in bulk with the configured preload and origin
    /// accounts with one account lookup. Records whose activity is gone are
    /// dropped.
    pub fn list_for_display(
        &self,
        query: &NotificationListQuery,
    ) -> ServiceResult<Vec<NotificationView>> {
        let mut notifications = self.notifications.list(query)?;
        reload_stale_accounts(&self.accounts, &mut notifications)?;

        let listed = notifications.len();
        let views = self.attach_activities(notifications)?;

        info!(
            "event=feed_load module=service status=ok account_id={} listed={listed} shown={}",
            query.account_id,
            views.len()
        );
        Ok(views)
    }

    /// Lists a recipient's rendered notifications through the secondary cache.
    ///
    /// # Contract
    /// - Cache entries hold whole views, so hits need no activity lookup.
    /// - Cache misses are loaded with one repository query and one bulk
    ///   activity resolution, then written back.
    /// - The whole batch, hits and misses alike, gets fresh origin accounts
    ///   from one bulk account lookup. Other nested snapshots inside a hit's
    ///   activity are served as cached.
    /// - Undecodable cache entries are treated as misses.
    pub fn list_cached<C: NotificationCache + ?Sized>(
        &self,
        query: &NotificationListQuery,
        cache: &C,
    ) -> ServiceResult<Vec<NotificationView>> {
        let cache_ids = self.notifications.list_cache_ids(query)?;

        let mut hits: HashMap<NotificationId, NotificationView> = HashMap::new();
        let mut misses: Vec<NotificationId> = Vec::new();
        for cache_id in &cache_ids {
            let key = cache_id.cache_key();
            match cache.get(&key).map(|raw| cache::decode(&raw)) {
                Some(Ok(view)) => {
                    hits.insert(cache_id.id, view);
                }
                Some(Err(err)) => {
                    warn!(
                        "event=cache_read module=service status=error key={key} error_code=cache_decode_failed error={err}"
                    );
                    misses.push(cache_id.id);
                }
                None => misses.push(cache_id.id),
            }
        }

        let hit_count = hits.len();
        let mut loaded: HashMap<NotificationId, NotificationView> = self
            .attach_activities(self.notifications.get_many(&misses)?)?
            .into_iter()
            .filter_map(|view| view.notification.id.map(|id| (id, view)))
            .collect();

        let missed: HashSet<NotificationId> = loaded.keys().copied().collect();
        let mut items: Vec<NotificationView> = cache_ids
            .iter()
            .filter_map(|cache_id| {
                hits.remove(&cache_id.id)
                    .or_else(|| loaded.remove(&cache_id.id))
            })
            .collect();
        reload_stale_accounts(
            &self.accounts,
            items.iter_mut().map(|item| &mut item.notification),
        )?;

        for item in &items {
            let Some(key) = item
                .notification
                .id
                .filter(|id| missed.contains(id))
                .and_then(|_| item.notification.cache_key())
            else {
                continue;
            };
            match cache::encode(item) {
                Ok(value) => cache.put(&key, value),
                Err(err) => warn!(
                    "event=cache_write module=service status=error key={key} error_code=cache_encode_failed error={err}"
                ),
            }
        }

        info!(
            "event=cache_read module=service status=ok account_id={} items={} hits={hit_count} misses={}",
            query.account_id,
            items.len(),
            misses.len()
        );
        Ok(items)
    }

    /// Deletes all notifications of a recipient.
    pub fn clear(&self, account_id: AccountId) -> ServiceResult<usize> {
        let removed = self.notifications.clear_for_account(account_id)?;
        info!("event=notification_clear module=service status=ok account_id={account_id} removed={removed}");
        Ok(removed)
    }

    /// Pairs records with their activities from one bulk resolution.
    ///
    /// Orphans (activity row gone) are dropped with a warning.
    fn attach_activities(
        &self,
        notifications: Vec<Notification>,
    ) -> ServiceResult<Vec<NotificationView>> {
        if notifications.is_empty() {
            return Ok(Vec::new());
        }

        let refs: Vec<ActivityRef> = notifications.iter().map(|item| item.activity).collect();
        let mut activities = self.activities.find_activities(&refs, Some(&self.preload))?;
        let views = notifications
            .into_iter()
            .filter_map(|notification| match activities.remove(&notification.activity) {
                Some(activity) => Some(NotificationView {
                    notification,
                    activity,
                }),
                None => {
                    warn!(
                        "event=feed_load module=service status=orphaned account_id={} activity={}",
                        notification.account_id, notification.activity
                    );
                    None
                }
            })
            .collect();
        Ok(views)
    }
}
