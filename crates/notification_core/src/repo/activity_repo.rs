//! Activity resolution by polymorphic reference.
//!
//! # Responsibility
//! - Resolve `ActivityRef`s to loaded activity rows, directly or eagerly.
//! - Bulk-load the nested status shape described by `StatusPreload`.
//!
//! # Invariants
//! - Direct resolution (`preload = None`) reads only the activity row.
//! - Eager resolution issues one query per table and relation, not per row.
//! - A reference whose row is gone is absent from the result.

use crate::model::account::AccountId;
use crate::model::activity::{
    Activity, ActivityId, ActivityKind, ActivityPreload, ActivityRef, Favourite, Follow,
    MediaAttachment, Mention, Status, StatusId, StatusPreload, Tag,
};
use crate::repo::account_repo::load_accounts;
use crate::repo::{placeholders, RepoResult};
use log::debug;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Entity store lookups by activity type and id.
pub trait ActivityStore {
    /// Resolves a batch of references; unresolved references are omitted.
    fn find_activities(
        &self,
        refs: &[ActivityRef],
        preload: Option<&ActivityPreload>,
    ) -> RepoResult<HashMap<ActivityRef, Activity>>;

    /// Loads one status, optionally with its nested relations.
    fn find_status(
        &self,
        id: StatusId,
        preload: Option<&StatusPreload>,
    ) -> RepoResult<Option<Status>>;

    fn find_activity(
        &self,
        activity: &ActivityRef,
        preload: Option<&ActivityPreload>,
    ) -> RepoResult<Option<Activity>> {
        let mut found = self.find_activities(std::slice::from_ref(activity), preload)?;
        Ok(found.remove(activity))
    }
}

impl<T: ActivityStore + ?Sized> ActivityStore for &T {
    fn find_activities(
        &self,
        refs: &[ActivityRef],
        preload: Option<&ActivityPreload>,
    ) -> RepoResult<HashMap<ActivityRef, Activity>> {
        (**self).find_activities(refs, preload)
    }

    fn find_status(
        &self,
        id: StatusId,
        preload: Option<&StatusPreload>,
    ) -> RepoResult<Option<Status>> {
        (**self).find_status(id, preload)
    }
}

/// SQLite-backed activity store.
pub struct SqliteActivityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ActivityStore for SqliteActivityStore<'_> {
    fn find_activities(
        &self,
        refs: &[ActivityRef],
        preload: Option<&ActivityPreload>,
    ) -> RepoResult<HashMap<ActivityRef, Activity>> {
        let mut ids_by_kind: BTreeMap<ActivityKind, BTreeSet<ActivityId>> = BTreeMap::new();
        for activity in refs {
            ids_by_kind
                .entry(activity.activity_type)
                .or_default()
                .insert(activity.activity_id);
        }

        let mut ids_of = |kind: ActivityKind| ids_by_kind.remove(&kind).unwrap_or_default();

        let mut mentions = load_mentions(self.conn, &ids_of(ActivityKind::Mention))?;
        let mut follows =
            load_follows(self.conn, ActivityKind::Follow, &ids_of(ActivityKind::Follow))?;
        let mut follow_requests = load_follows(
            self.conn,
            ActivityKind::FollowRequest,
            &ids_of(ActivityKind::FollowRequest),
        )?;
        let mut favourites = load_favourites(self.conn, &ids_of(ActivityKind::Favourite))?;
        let status_preload = preload.map(|preload| &preload.status);
        let mut statuses =
            load_statuses(self.conn, &ids_of(ActivityKind::Status), status_preload)?;

        if let Some(preload) = preload {
            let nested_status_ids: BTreeSet<StatusId> = mentions
                .iter()
                .map(|mention| mention.status_id)
                .chain(favourites.iter().map(|favourite| favourite.status_id))
                .collect();
            let nested = load_statuses(self.conn, &nested_status_ids, Some(&preload.status))?;
            for mention in &mut mentions {
                mention.status = nested.get(&mention.status_id).cloned().map(Box::new);
            }
            for favourite in &mut favourites {
                favourite.status = nested.get(&favourite.status_id).cloned();
            }

            if preload.actor_account {
                let actor_ids: BTreeSet<AccountId> = follows
                    .iter()
                    .chain(follow_requests.iter())
                    .map(|follow| follow.account_id)
                    .chain(favourites.iter().map(|favourite| favourite.account_id))
                    .collect();
                let actors = load_accounts(self.conn, &actor_ids)?;
                for follow in follows.iter_mut().chain(follow_requests.iter_mut()) {
                    follow.account = actors.get(&follow.account_id).cloned();
                }
                for favourite in &mut favourites {
                    favourite.account = actors.get(&favourite.account_id).cloned();
                }
            }
        }

        let mut resolved = HashMap::with_capacity(refs.len());
        let activities = mentions
            .into_iter()
            .map(Activity::Mention)
            .chain(statuses.drain().map(|(_, status)| Activity::Status(status)))
            .chain(follows.into_iter().map(Activity::Follow))
            .chain(follow_requests.into_iter().map(Activity::FollowRequest))
            .chain(favourites.into_iter().map(Activity::Favourite));
        for activity in activities {
            resolved.insert(activity.reference(), activity);
        }

        debug!(
            "event=activity_resolve module=repo status=ok requested={} resolved={} eager={}",
            refs.len(),
            resolved.len(),
            preload.is_some()
        );
        Ok(resolved)
    }

    fn find_status(
        &self,
        id: StatusId,
        preload: Option<&StatusPreload>,
    ) -> RepoResult<Option<Status>> {
        let mut statuses = load_statuses(self.conn, &BTreeSet::from([id]), preload)?;
        Ok(statuses.remove(&id))
    }
}

fn load_statuses(
    conn: &Connection,
    ids: &BTreeSet<StatusId>,
    preload: Option<&StatusPreload>,
) -> RepoResult<HashMap<StatusId, Status>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT id, account_id, text, reblog_of_id, created_at
         FROM statuses
         WHERE id IN ({});",
        placeholders(ids.len())
    ))?;
    let mut rows = stmt.query(params_from_iter(ids.iter()))?;
    let mut statuses = HashMap::with_capacity(ids.len());
    while let Some(row) = rows.next()? {
        let status = parse_status_row(row)?;
        statuses.insert(status.id, status);
    }

    if let Some(preload) = preload {
        preload_status_relations(conn, &mut statuses, preload)?;
    }
    Ok(statuses)
}

fn preload_status_relations(
    conn: &Connection,
    statuses: &mut HashMap<StatusId, Status>,
    preload: &StatusPreload,
) -> RepoResult<()> {
    if statuses.is_empty() {
        return Ok(());
    }
    let status_ids: BTreeSet<StatusId> = statuses.keys().copied().collect();

    let mut mentions = if preload.mentions {
        load_mentions_by_status(conn, &status_ids)?
    } else {
        Vec::new()
    };

    // Status authors and mentioned accounts share one account query.
    let mut account_ids: BTreeSet<AccountId> =
        mentions.iter().map(|mention| mention.account_id).collect();
    if preload.account {
        account_ids.extend(statuses.values().map(|status| status.account_id));
    }
    let accounts = load_accounts(conn, &account_ids)?;
    if preload.account {
        for status in statuses.values_mut() {
            status.account = accounts.get(&status.account_id).cloned();
        }
    }
    for mention in &mut mentions {
        mention.account = accounts.get(&mention.account_id).cloned();
    }
    for mention in mentions {
        if let Some(status) = statuses.get_mut(&mention.status_id) {
            status.mentions.push(mention);
        }
    }

    if preload.media_attachments {
        for media in load_media_attachments(conn, &status_ids)? {
            if let Some(status) = statuses.get_mut(&media.status_id) {
                status.media_attachments.push(media);
            }
        }
    }

    if preload.tags {
        for (status_id, tag) in load_tags(conn, &status_ids)? {
            if let Some(status) = statuses.get_mut(&status_id) {
                status.tags.push(tag);
            }
        }
    }

    if let Some(reblog_preload) = preload.reblog.as_deref() {
        let reblog_ids: BTreeSet<StatusId> = statuses
            .values()
            .filter_map(|status| status.reblog_of_id)
            .collect();
        let reblogs = load_statuses(conn, &reblog_ids, Some(reblog_preload))?;
        for status in statuses.values_mut() {
            status.reblog = status
                .reblog_of_id
                .and_then(|reblog_id| reblogs.get(&reblog_id).cloned())
                .map(Box::new);
        }
    }

    Ok(())
}

fn load_mentions(conn: &Connection, ids: &BTreeSet<ActivityId>) -> RepoResult<Vec<Mention>> {
    query_by_ids(
        conn,
        "SELECT id, status_id, account_id FROM mentions WHERE id IN ({}) ORDER BY id;",
        ids,
        parse_mention_row,
    )
}

fn load_mentions_by_status(
    conn: &Connection,
    status_ids: &BTreeSet<StatusId>,
) -> RepoResult<Vec<Mention>> {
    query_by_ids(
        conn,
        "SELECT id, status_id, account_id FROM mentions WHERE status_id IN ({}) ORDER BY id;",
        status_ids,
        parse_mention_row,
    )
}

fn load_follows(
    conn: &Connection,
    kind: ActivityKind,
    ids: &BTreeSet<ActivityId>,
) -> RepoResult<Vec<Follow>> {
    let sql = format!(
        "SELECT id, account_id, target_account_id FROM {} WHERE id IN ({{}}) ORDER BY id;",
        kind.table()
    );
    query_by_ids(conn, &sql, ids, |row| {
        Ok(Follow {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            target_account_id: row.get("target_account_id")?,
            account: None,
        })
    })
}

fn load_favourites(conn: &Connection, ids: &BTreeSet<ActivityId>) -> RepoResult<Vec<Favourite>> {
    query_by_ids(
        conn,
        "SELECT id, account_id, status_id FROM favourites WHERE id IN ({}) ORDER BY id;",
        ids,
        |row| {
            Ok(Favourite {
                id: row.get("id")?,
                account_id: row.get("account_id")?,
                status_id: row.get("status_id")?,
                account: None,
                status: None,
            })
        },
    )
}

fn load_media_attachments(
    conn: &Connection,
    status_ids: &BTreeSet<StatusId>,
) -> RepoResult<Vec<MediaAttachment>> {
    query_by_ids(
        conn,
        "SELECT id, status_id, url FROM media_attachments WHERE status_id IN ({}) ORDER BY id;",
        status_ids,
        |row| {
            Ok(MediaAttachment {
                id: row.get("id")?,
                status_id: row.get("status_id")?,
                url: row.get("url")?,
            })
        },
    )
}

fn load_tags(
    conn: &Connection,
    status_ids: &BTreeSet<StatusId>,
) -> RepoResult<Vec<(StatusId, Tag)>> {
    query_by_ids(
        conn,
        "SELECT st.status_id, t.id, t.name
         FROM statuses_tags st
         INNER JOIN tags t ON t.id = st.tag_id
         WHERE st.status_id IN ({})
         ORDER BY t.name COLLATE NOCASE ASC;",
        status_ids,
        |row| {
            Ok((
                row.get(0)?,
                Tag {
                    id: row.get(1)?,
                    name: row.get(2)?,
                },
            ))
        },
    )
}

/// Runs `sql_template` with its `{}` replaced by one bind per id.
fn query_by_ids<T>(
    conn: &Connection,
    sql_template: &str,
    ids: &BTreeSet<i64>,
    parse: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
) -> RepoResult<Vec<T>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = sql_template.replacen("{}", &placeholders(ids.len()), 1);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(ids.iter()))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse(row)?);
    }
    Ok(items)
}

fn parse_status_row(row: &Row<'_>) -> rusqlite::Result<Status> {
    Ok(Status {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        text: row.get("text")?,
        reblog_of_id: row.get("reblog_of_id")?,
        created_at: row.get("created_at")?,
        account: None,
        media_attachments: Vec::new(),
        tags: Vec::new(),
        mentions: Vec::new(),
        reblog: None,
    })
}

fn parse_mention_row(row: &Row<'_>) -> rusqlite::Result<Mention> {
    Ok(Mention {
        id: row.get("id")?,
        status_id: row.get("status_id")?,
        account_id: row.get("account_id")?,
        account: None,
        status: None,
    })
}
