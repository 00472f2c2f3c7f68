//! Notification records pointing at polymorphic activities.
//!
//! Classification, targeting and origin derivation live here together with
//! the batch repair step for records served from a secondary cache.

pub mod cache;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cache::{cache_key, MemoryNotificationCache, NotificationCache};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::account::{Account, AccountId};
pub use model::activity::{
    Activity, ActivityId, ActivityKind, ActivityPreload, ActivityRef, Favourite, Follow,
    FollowRequest, MediaAttachment, Mention, Status, StatusId, StatusPreload, Tag,
    UnknownActivityType,
};
pub use model::notification::{
    classify_activity_type, target_status, Notification, NotificationId, NotificationSeq,
    NotificationType, NotificationValidationError, NotificationView,
};
pub use repo::account_repo::{AccountStore, SqliteAccountStore};
pub use repo::activity_repo::{ActivityStore, SqliteActivityStore};
pub use repo::notification_repo::{
    CacheId, InsertOutcome, NotificationListQuery, NotificationRepository,
    SqliteNotificationRepository,
};
pub use repo::{RepoError, RepoResult};
pub use service::notification_service::{
    CreateOutcome, NotificationService, NotificationServiceError, ServiceResult,
};
pub use service::origin::resolve_origin;
pub use service::rehydrate::reload_stale_accounts;
