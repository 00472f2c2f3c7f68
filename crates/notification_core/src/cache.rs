//! Secondary key-value cache for serialized notification records.
//!
//! # Responsibility
//! - Define the get/put contract of the fast cache in front of the store.
//! - Derive cache keys that change whenever the row changes.
//!
//! # Invariants
//! - Values are JSON encodings of `NotificationView`: the record with its
//!   origin account snapshot plus the eagerly resolved activity. Snapshots
//!   may be stale on read.
//! - This core repairs cached records; it does not manage expiry or sizing.

use crate::model::notification::{Notification, NotificationId, NotificationView};
use crate::repo::notification_repo::CacheId;
use std::cell::RefCell;
use std::collections::HashMap;

/// Key-value cache holding serialized notifications.
pub trait NotificationCache {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
}

impl<T: NotificationCache + ?Sized> NotificationCache for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: String) {
        (**self).put(key, value)
    }
}

/// Versioned key: a bumped `updated_at` never reads an older entry.
pub fn cache_key(id: NotificationId, updated_at: i64) -> String {
    format!("notifications/{id}-{updated_at}")
}

impl CacheId {
    pub fn cache_key(&self) -> String {
        cache_key(self.id, self.updated_at)
    }
}

impl Notification {
    /// Cache key of a persisted record; `None` before persistence.
    pub fn cache_key(&self) -> Option<String> {
        Some(cache_key(self.id?, self.updated_at?))
    }
}

pub fn encode(view: &NotificationView) -> serde_json::Result<String> {
    serde_json::to_string(view)
}

pub fn decode(raw: &str) -> serde_json::Result<NotificationView> {
    serde_json::from_str(raw)
}

/// Process-local cache backed by a `HashMap`.
///
/// Entries are never evicted. A row whose `updated_at` changes is written
/// under a new key and the superseded entry stays behind, so the map only
/// grows. Suited to tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemoryNotificationCache {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryNotificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl NotificationCache for MemoryNotificationCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }
}
