//! Notification repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist notification records and read them back for feeds and caches.
//! - Turn duplicate inserts into an explicit outcome instead of an error.
//!
//! # Invariants
//! - Write paths call `Notification::validate()` before SQL mutations.
//! - `(account_id, activity_type, activity_id)` is unique; a conflicting
//!   insert is ignored and reported as `InsertOutcome::Duplicate`.
//! - Lists are ordered newest first by `seq DESC` and page on `seq` bounds,
//!   so rows inserted between page loads are neither repeated nor skipped.

use crate::model::account::AccountId;
use crate::model::activity::{ActivityKind, ActivityRef};
use crate::model::notification::{Notification, NotificationId, NotificationSeq};
use crate::repo::{placeholders, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;
use uuid::Uuid;

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    seq,
    id,
    account_id,
    from_account_id,
    activity_type,
    activity_id,
    created_at,
    updated_at
FROM notifications";

const LIST_DEFAULT_LIMIT: u32 = 20;
const LIST_LIMIT_MAX: u32 = 40;

/// Result of an insert attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row written; carries the stored record with store timestamps.
    Inserted(Notification),
    /// The recipient already has a notification for this activity.
    Duplicate,
}

/// Query options for listing one recipient's notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationListQuery {
    pub account_id: AccountId,
    /// Excludes follow requests, which are shown in their own flow.
    pub browserable_only: bool,
    /// Maximum rows to return. Defaults to 20 and clamps to 40.
    pub limit: Option<u32>,
    /// Only rows older than this sequence, exclusive. Pass the last `seq` of
    /// the previous page to load the next one.
    pub max_seq: Option<NotificationSeq>,
    /// Only rows newer than this sequence, exclusive.
    pub since_seq: Option<NotificationSeq>,
}

impl NotificationListQuery {
    pub fn for_account(account_id: AccountId) -> Self {
        Self {
            account_id,
            ..Self::default()
        }
    }

    /// Query for the page following `page`, or `None` when `page` is empty.
    pub fn next_page(&self, page: &[Notification]) -> Option<Self> {
        let last_seq = page.last()?.seq?;
        Some(Self {
            max_seq: Some(last_seq),
            ..self.clone()
        })
    }
}

/// Lightweight projection used to derive cache keys before loading records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheId {
    pub id: NotificationId,
    pub updated_at: i64,
    pub activity: ActivityRef,
}

/// Repository interface for notification persistence.
pub trait NotificationRepository {
    fn insert(&self, notification: &Notification) -> RepoResult<InsertOutcome>;
    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>>;
    /// Loads several records in one query, in the order of `ids`. Missing ids are skipped.
    fn get_many(&self, ids: &[NotificationId]) -> RepoResult<Vec<Notification>>;
    fn find_by_activity(
        &self,
        account_id: AccountId,
        activity: &ActivityRef,
    ) -> RepoResult<Option<Notification>>;
    fn list(&self, query: &NotificationListQuery) -> RepoResult<Vec<Notification>>;
    fn list_cache_ids(&self, query: &NotificationListQuery) -> RepoResult<Vec<CacheId>>;
    /// Deletes every notification of a recipient and returns the removed count.
    fn clear_for_account(&self, account_id: AccountId) -> RepoResult<usize>;
}

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn insert(&self, notification: &Notification) -> RepoResult<InsertOutcome> {
        notification.validate()?;
        if !notification.is_new_record() {
            return Err(RepoError::InvalidData(
                "insert expects an unpersisted notification".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let changed = self.conn.execute(
            "INSERT INTO notifications (
                id,
                account_id,
                from_account_id,
                activity_type,
                activity_id
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (account_id, activity_type, activity_id) DO NOTHING;",
            params![
                id.to_string(),
                notification.account_id,
                notification.from_account_id,
                notification.activity.activity_type.as_str(),
                notification.activity.activity_id,
            ],
        )?;

        if changed == 0 {
            return Ok(InsertOutcome::Duplicate);
        }

        let stored = self.get(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted notification {id} not found on read-back"))
        })?;
        Ok(InsertOutcome::Inserted(stored))
    }

    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTIFICATION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_notification_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_many(&self, ids: &[NotificationId]) -> RepoResult<Vec<Notification>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL} WHERE id IN ({});",
            placeholders(ids.len())
        ))?;
        let mut rows = stmt.query(params_from_iter(ids.iter().map(Uuid::to_string)))?;
        let mut by_id = HashMap::with_capacity(ids.len());
        while let Some(row) = rows.next()? {
            let notification = parse_notification_row(row)?;
            if let Some(id) = notification.id {
                by_id.insert(id, notification);
            }
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn find_by_activity(
        &self,
        account_id: AccountId,
        activity: &ActivityRef,
    ) -> RepoResult<Option<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL}
             WHERE account_id = ?1
               AND activity_type = ?2
               AND activity_id = ?3;"
        ))?;
        let mut rows = stmt.query(params![
            account_id,
            activity.activity_type.as_str(),
            activity.activity_id,
        ])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_notification_row(row)?)),
            None => Ok(None),
        }
    }

    fn list(&self, query: &NotificationListQuery) -> RepoResult<Vec<Notification>> {
        let (sql, bind_values) = build_list_sql(NOTIFICATION_SELECT_SQL, query);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }

    fn list_cache_ids(&self, query: &NotificationListQuery) -> RepoResult<Vec<CacheId>> {
        let (sql, bind_values) = build_list_sql(
            "SELECT id, updated_at, activity_type, activity_id FROM notifications",
            query,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut cache_ids = Vec::new();
        while let Some(row) = rows.next()? {
            cache_ids.push(CacheId {
                id: parse_id(row)?,
                updated_at: row.get("updated_at")?,
                activity: parse_activity(row)?,
            });
        }
        Ok(cache_ids)
    }

    fn clear_for_account(&self, account_id: AccountId) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM notifications WHERE account_id = ?1;", [account_id])?;
        Ok(removed)
    }
}

/// Normalizes list limit according to the feed contract.
pub fn normalize_list_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => LIST_DEFAULT_LIMIT,
        Some(value) => value.min(LIST_LIMIT_MAX),
    }
}

fn build_list_sql(select_sql: &str, query: &NotificationListQuery) -> (String, Vec<Value>) {
    let mut sql = format!("{select_sql} WHERE account_id = ?");
    let mut bind_values = vec![Value::Integer(query.account_id)];

    if query.browserable_only {
        sql.push_str(" AND activity_type <> ?");
        bind_values.push(Value::Text(ActivityKind::FollowRequest.as_str().to_string()));
    }

    if let Some(max_seq) = query.max_seq {
        sql.push_str(" AND seq < ?");
        bind_values.push(Value::Integer(max_seq));
    }
    if let Some(since_seq) = query.since_seq {
        sql.push_str(" AND seq > ?");
        bind_values.push(Value::Integer(since_seq));
    }

    sql.push_str(" ORDER BY seq DESC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(normalize_list_limit(query.limit))));

    (sql, bind_values)
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let notification = Notification {
        id: Some(parse_id(row)?),
        seq: Some(row.get("seq")?),
        account_id: row.get("account_id")?,
        from_account_id: row.get("from_account_id")?,
        activity: parse_activity(row)?,
        created_at: Some(row.get("created_at")?),
        updated_at: Some(row.get("updated_at")?),
        from_account: None,
    };
    notification.validate()?;
    Ok(notification)
}

fn parse_id(row: &Row<'_>) -> RepoResult<NotificationId> {
    let id_text: String = row.get("id")?;
    Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in notifications.id"))
    })
}

fn parse_activity(row: &Row<'_>) -> RepoResult<ActivityRef> {
    let type_text: String = row.get("activity_type")?;
    let activity_type = type_text.parse::<ActivityKind>()?;
    Ok(ActivityRef::new(activity_type, row.get("activity_id")?))
}
