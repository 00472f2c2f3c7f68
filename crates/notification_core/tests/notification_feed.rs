mod support;

use notification_core::db::open_db_in_memory;
use notification_core::{
    cache_key, reload_stale_accounts, Activity, ActivityPreload, ActivityRef, ActivityStore,
    MemoryNotificationCache, NotificationCache, NotificationId, NotificationListQuery,
    NotificationService, NotificationServiceError, NotificationType, RepoError, RepoResult,
    SqliteAccountStore, SqliteActivityStore, SqliteNotificationRepository, Status, StatusId,
    StatusPreload,
};
use rusqlite::{params, Connection};
use std::cell::Cell;
use std::collections::HashMap;
use support::*;

/// Activity store that counts bulk resolutions.
struct CountingActivityStore<'conn> {
    inner: SqliteActivityStore<'conn>,
    batches: Cell<usize>,
}

impl<'conn> CountingActivityStore<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteActivityStore::new(conn),
            batches: Cell::new(0),
        }
    }
}

impl ActivityStore for CountingActivityStore<'_> {
    fn find_activities(
        &self,
        refs: &[ActivityRef],
        preload: Option<&ActivityPreload>,
    ) -> RepoResult<HashMap<ActivityRef, Activity>> {
        self.batches.set(self.batches.get() + 1);
        self.inner.find_activities(refs, preload)
    }

    fn find_status(
        &self,
        id: StatusId,
        preload: Option<&StatusPreload>,
    ) -> RepoResult<Option<Status>> {
        self.inner.find_status(id, preload)
    }
}

fn listed_ids(items: &[notification_core::NotificationView]) -> Vec<NotificationId> {
    items
        .iter()
        .map(|item| item.notification.id.unwrap())
        .collect()
}

/// alice (1) receives one notification of every kind, newest first:
/// reblog by carol, favourite by bob, mention by bob, follow by bob,
/// follow request by carol.
fn seeded_feed() -> (Connection, Vec<NotificationId>) {
    let conn = open_db_in_memory().unwrap();
    insert_account(&conn, 1, "alice");
    insert_account(&conn, 7, "bob");
    insert_account(&conn, 3, "carol");
    insert_status(&conn, 99, 1, "hello fediverse");
    insert_reblog(&conn, 100, 3, 99);
    insert_favourite(&conn, 42, 7, 99);
    insert_status(&conn, 120, 7, "@alice hi");
    insert_mention(&conn, 11, 120, 1);
    insert_follow(&conn, 8, 7, 1);
    insert_follow_request(&conn, 5, 3, 1);

    let mut ids = {
        let service = NotificationService::sqlite(&conn);
        [
            ActivityRef::follow_request(5),
            ActivityRef::follow(8),
            ActivityRef::mention(11),
            ActivityRef::favourite(42),
            ActivityRef::status(100),
        ]
        .into_iter()
        .map(|activity| {
            service
                .create(1, activity)
                .unwrap()
                .into_notification()
                .id
                .unwrap()
        })
        .collect::<Vec<_>>()
    };
    ids.reverse();
    (conn, ids)
}

#[test]
fn display_feed_resolves_kinds_targets_and_origins() {
    let (conn, ids) = seeded_feed();
    let service = NotificationService::sqlite(&conn);

    let views = service
        .list_for_display(&NotificationListQuery::for_account(1))
        .unwrap();

    assert_eq!(listed_ids(&views), ids);

    let kinds: Vec<NotificationType> = views.iter().map(|view| view.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationType::Reblog,
            NotificationType::Favourite,
            NotificationType::Mention,
            NotificationType::Follow,
            NotificationType::FollowRequest,
        ]
    );

    let targets: Vec<Option<i64>> = views
        .iter()
        .map(|view| view.target_status().map(|status| status.id))
        .collect();
    assert_eq!(targets, vec![Some(99), Some(99), Some(120), None, None]);

    let origins: Vec<Option<&str>> = views
        .iter()
        .map(|view| view.from_account().map(|account| account.username.as_str()))
        .collect();
    assert_eq!(
        origins,
        vec![Some("carol"), Some("bob"), Some("bob"), Some("bob"), Some("carol")]
    );
    assert!(!views[4].is_browserable());
}

#[test]
fn browserable_feed_excludes_follow_requests() {
    let (conn, _) = seeded_feed();
    let service = NotificationService::sqlite(&conn);
    let query = NotificationListQuery {
        browserable_only: true,
        ..NotificationListQuery::for_account(1)
    };

    let views = service.list_for_display(&query).unwrap();

    assert_eq!(views.len(), 4);
    assert!(views.iter().all(|view| view.is_browserable()));
}

#[test]
fn notifications_created_in_quick_succession_list_newest_first() {
    let conn = open_db_in_memory().unwrap();
    insert_account(&conn, 1, "alice");
    let service = NotificationService::sqlite(&conn);

    let mut created = Vec::new();
    for follower in 500..512 {
        insert_account(&conn, follower, &format!("follower{follower}"));
        insert_follow(&conn, follower, follower, 1);
        let notification = service
            .create(1, ActivityRef::follow(follower))
            .unwrap()
            .into_notification();
        created.push(notification);
    }

    let views = service
        .list_for_display(&NotificationListQuery::for_account(1))
        .unwrap();

    let follows: Vec<i64> = views
        .iter()
        .map(|view| view.notification.activity.activity_id)
        .collect();
    assert_eq!(follows, (500..512).rev().collect::<Vec<_>>());
    assert!(created
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at && pair[0].seq < pair[1].seq));
}

#[test]
fn seq_bounds_page_through_the_feed() {
    let (conn, ids) = seeded_feed();
    let service = NotificationService::sqlite(&conn);
    let first_query = NotificationListQuery {
        limit: Some(2),
        ..NotificationListQuery::for_account(1)
    };

    let first = service.list_for_display(&first_query).unwrap();
    let pages = first
        .iter()
        .map(|view| view.notification.clone())
        .collect::<Vec<_>>();
    let second_query = first_query.next_page(&pages).unwrap();
    let second = service.list_for_display(&second_query).unwrap();

    assert_eq!(listed_ids(&first), ids[0..2].to_vec());
    assert_eq!(listed_ids(&second), ids[2..4].to_vec());

    let since_query = NotificationListQuery {
        since_seq: second[0].notification.seq,
        ..NotificationListQuery::for_account(1)
    };
    let newer = service.list_for_display(&since_query).unwrap();
    assert_eq!(listed_ids(&newer), ids[0..2].to_vec());
}

#[test]
fn insert_between_page_loads_neither_repeats_nor_skips() {
    let (conn, ids) = seeded_feed();
    let service = NotificationService::sqlite(&conn);
    let first_query = NotificationListQuery {
        limit: Some(2),
        ..NotificationListQuery::for_account(1)
    };
    let first = service.list_for_display(&first_query).unwrap();

    insert_account(&conn, 9, "dave");
    insert_follow(&conn, 9, 9, 1);
    let arrived = service
        .create(1, ActivityRef::follow(9))
        .unwrap()
        .into_notification();

    let records = first
        .iter()
        .map(|view| view.notification.clone())
        .collect::<Vec<_>>();
    let mut seen = listed_ids(&first);
    let mut query = first_query.next_page(&records);
    while let Some(next) = query {
        let page = service.list_for_display(&next).unwrap();
        seen.extend(listed_ids(&page));
        let records = page
            .iter()
            .map(|view| view.notification.clone())
            .collect::<Vec<_>>();
        query = next.next_page(&records);
    }

    assert_eq!(seen, ids);
    assert!(!seen.contains(&arrived.id.unwrap()));

    let fresh = service.list_for_display(&first_query).unwrap();
    assert_eq!(fresh[0].notification.id, arrived.id);
}

#[test]
fn orphaned_notifications_are_hidden() {
    let (conn, _) = seeded_feed();
    conn.execute(
        "INSERT INTO notifications (id, account_id, from_account_id, activity_type, activity_id)
         VALUES ('00000000-0000-4000-8000-000000000001', 1, 7, 'Favourite', 9999);",
        [],
    )
    .unwrap();
    let service = NotificationService::sqlite(&conn);

    let views = service
        .list_for_display(&NotificationListQuery::for_account(1))
        .unwrap();

    assert_eq!(notification_count(&conn), 6);
    assert_eq!(views.len(), 5);
    assert!(views
        .iter()
        .all(|view| view.notification.activity != ActivityRef::favourite(9999)));
}

#[test]
fn deleting_an_activity_removes_its_notification() {
    let (conn, _) = seeded_feed();
    conn.execute("DELETE FROM favourites WHERE id = 42;", [])
        .unwrap();
    conn.execute("DELETE FROM follow_requests WHERE id = 5;", [])
        .unwrap();

    assert_eq!(notification_count(&conn), 3);
}

#[test]
fn deleting_a_status_cascades_to_its_mention_notifications() {
    let (conn, _) = seeded_feed();
    conn.execute("DELETE FROM statuses WHERE id = 120;", [])
        .unwrap();

    let service = NotificationService::sqlite(&conn);
    let kinds: Vec<NotificationType> = service
        .list_for_display(&NotificationListQuery::for_account(1))
        .unwrap()
        .iter()
        .map(|view| view.kind())
        .collect();
    assert!(!kinds.contains(&NotificationType::Mention));
    assert_eq!(kinds.len(), 4);
}

#[test]
fn clear_removes_only_the_recipients_notifications() {
    let (conn, _) = seeded_feed();
    let service = NotificationService::sqlite(&conn);
    service.create(7, ActivityRef::follow(8)).unwrap();

    assert_eq!(service.clear(1).unwrap(), 5);
    assert_eq!(notification_count(&conn), 1);
    assert!(service
        .list_for_display(&NotificationListQuery::for_account(1))
        .unwrap()
        .is_empty());
}

#[test]
fn unknown_activity_type_aborts_the_listing() {
    let (conn, _) = seeded_feed();
    conn.execute(
        "INSERT INTO notifications (id, account_id, activity_type, activity_id)
         VALUES ('00000000-0000-4000-8000-000000000002', 1, 'Poll', 1);",
        [],
    )
    .unwrap();
    let service = NotificationService::sqlite(&conn);

    let err = service
        .list_for_display(&NotificationListQuery::for_account(1))
        .unwrap_err();
    assert!(
        matches!(
            err,
            NotificationServiceError::Repo(RepoError::UnknownActivityType(ref tag)) if tag.0 == "Poll"
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn narrower_preload_leaves_reblog_target_unloaded() {
    let (conn, _) = seeded_feed();
    let service = NotificationService::sqlite(&conn).with_preload(ActivityPreload {
        status: StatusPreload::flat(),
        actor_account: false,
    });

    let views = service
        .list_for_display(&NotificationListQuery::for_account(1))
        .unwrap();

    assert_eq!(views[0].kind(), NotificationType::Reblog);
    assert!(views[0].target_status().is_none());
    assert_eq!(views[1].target_status().map(|status| status.id), Some(99));
}

#[test]
fn cached_feed_fills_cache_on_miss_and_refreshes_stale_accounts_on_hit() {
    let (conn, ids) = seeded_feed();
    let service = NotificationService::sqlite(&conn);
    let cache = MemoryNotificationCache::new();
    let query = NotificationListQuery::for_account(1);

    let first = service.list_cached(&query, &cache).unwrap();
    assert_eq!(cache.len(), 5);
    assert_eq!(listed_ids(&first), ids);
    assert_eq!(
        first[1].from_account().map(|a| a.display_name.as_str()),
        Some("BOB")
    );

    rename_account(&conn, 7, "Bob Builder");
    let second = service.list_cached(&query, &cache).unwrap();

    let favourite = &second[1];
    assert_eq!(favourite.notification.activity, ActivityRef::favourite(42));
    assert_eq!(
        favourite.from_account().map(|a| a.display_name.as_str()),
        Some("Bob Builder")
    );
    let cached_raw = cache
        .get(&favourite.notification.cache_key().unwrap())
        .unwrap();
    assert!(cached_raw.contains("\"BOB\""));
    assert_eq!(cache.len(), 5);
}

#[test]
fn cached_hits_render_targets_without_resolving_activities() {
    let (conn, _) = seeded_feed();
    let activities = CountingActivityStore::new(&conn);
    let service = NotificationService::new(
        SqliteNotificationRepository::new(&conn),
        &activities,
        SqliteAccountStore::new(&conn),
    );
    let cache = MemoryNotificationCache::new();
    let query = NotificationListQuery::for_account(1);

    service.list_cached(&query, &cache).unwrap();
    assert_eq!(activities.batches.get(), 1);

    let cached = service.list_cached(&query, &cache).unwrap();

    assert_eq!(activities.batches.get(), 1);
    let targets: Vec<Option<i64>> = cached
        .iter()
        .map(|view| view.target_status().map(|status| status.id))
        .collect();
    assert_eq!(targets, vec![Some(99), Some(99), Some(120), None, None]);
    assert_eq!(
        cached[0]
            .target_status()
            .and_then(|status| status.account.as_ref())
            .map(|account| account.username.as_str()),
        Some("alice")
    );
}

#[test]
fn cached_feed_treats_corrupt_entries_as_misses() {
    let (conn, ids) = seeded_feed();
    let service = NotificationService::sqlite(&conn);
    let cache = MemoryNotificationCache::new();
    let query = NotificationListQuery::for_account(1);
    service.list_cached(&query, &cache).unwrap();

    let updated_at: i64 = conn
        .query_row(
            "SELECT updated_at FROM notifications WHERE id = ?1;",
            params![ids[0].to_string()],
            |row| row.get(0),
        )
        .unwrap();
    let key = cache_key(ids[0], updated_at);
    cache.put(&key, "{not json".to_string());

    let items = service.list_cached(&query, &cache).unwrap();

    assert_eq!(items.len(), 5);
    assert_eq!(items[0].notification.id, Some(ids[0]));
    assert_eq!(items[0].target_status().map(|status| status.id), Some(99));
    assert!(cache.get(&key).unwrap().contains("\"activity\""));
}

#[test]
fn cached_feed_drops_snapshot_of_deleted_origin_account() {
    let (conn, _) = seeded_feed();
    let service = NotificationService::sqlite(&conn);
    let cache = MemoryNotificationCache::new();
    let query = NotificationListQuery::for_account(1);
    let mut items = service.list_cached(&query, &cache).unwrap();
    assert!(items[0].from_account().is_some());

    items[0].notification.from_account_id = Some(404);
    reload_stale_accounts(
        &SqliteAccountStore::new(&conn),
        items.iter_mut().map(|item| &mut item.notification),
    )
    .unwrap();

    assert_eq!(items[0].from_account(), None);
    assert!(items[1].from_account().is_some());
}
