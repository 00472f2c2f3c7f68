//! Notification aggregate, classification and targeting.
//!
//! # Responsibility
//! - Define the canonical notification record and its derived views.
//! - Map activity kinds to notification kinds and rendered targets.
//!
//! # Invariants
//! - `(account_id, activity.activity_type, activity.activity_id)` is unique;
//!   the store enforces it at insert time.
//! - `id == None` means the record has not been persisted yet.
//! - Persisted records carry store-supplied timestamps and a feed sequence.

use crate::model::account::{Account, AccountId};
use crate::model::activity::{Activity, ActivityKind, ActivityRef, Status, UnknownActivityType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier assigned to a notification when it is persisted.
pub type NotificationId = Uuid;

/// Store-assigned insertion sequence; strictly increasing, never reused.
///
/// Feeds are ordered by it (newest first) and page on it.
pub type NotificationSeq = i64;

/// Semantic notification kind surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Someone reposted the recipient's status.
    Reblog,
    Mention,
    Follow,
    FollowRequest,
    Favourite,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reblog => "reblog",
            Self::Mention => "mention",
            Self::Follow => "follow",
            Self::FollowRequest => "follow_request",
            Self::Favourite => "favourite",
        }
    }

    /// Follow requests live in the pending-approval flow, not the feed.
    pub fn is_browserable(self) -> bool {
        self != Self::FollowRequest
    }
}

impl From<ActivityKind> for NotificationType {
    /// A status is only referenced by a notification when it reposts the
    /// recipient's content, hence `Status -> Reblog`.
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Status => Self::Reblog,
            ActivityKind::Mention => Self::Mention,
            ActivityKind::Follow => Self::Follow,
            ActivityKind::FollowRequest => Self::FollowRequest,
            ActivityKind::Favourite => Self::Favourite,
        }
    }
}

/// Classifies a raw `activity_type` tag.
///
/// # Errors
/// - Returns `UnknownActivityType` for anything outside the five known tags.
pub fn classify_activity_type(tag: &str) -> Result<NotificationType, UnknownActivityType> {
    tag.parse::<ActivityKind>().map(NotificationType::from)
}

/// Returns the status a notification of `kind` should render.
///
/// Follows and follow requests are about the actor, so they have no target.
/// An unresolved activity has no target either.
pub fn target_status(kind: NotificationType, activity: Option<&Activity>) -> Option<&Status> {
    let activity = activity?;
    match kind {
        NotificationType::Reblog => activity.reblog(),
        NotificationType::Favourite | NotificationType::Mention => activity.status(),
        NotificationType::Follow | NotificationType::FollowRequest => None,
    }
}

/// Validation failures for notification records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationValidationError {
    #[error("{field} must be positive, got {value}")]
    NonPositiveId { field: &'static str, value: i64 },
    #[error("persisted notification {0} is missing store timestamps")]
    MissingTimestamps(NotificationId),
}

/// Canonical notification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Option<NotificationId>,
    #[serde(default)]
    pub seq: Option<NotificationSeq>,
    /// Recipient.
    pub account_id: AccountId,
    /// Account that caused the notification, derived once at creation.
    pub from_account_id: Option<AccountId>,
    pub activity: ActivityRef,
    /// Unix epoch milliseconds, supplied by the store.
    pub created_at: Option<i64>,
    /// Unix epoch milliseconds, supplied by the store.
    pub updated_at: Option<i64>,
    /// Attached origin account snapshot. May be stale when read from cache.
    #[serde(default)]
    pub from_account: Option<Account>,
}

impl Notification {
    /// Builds a new, unpersisted record for `account_id`.
    ///
    /// The origin is left empty; creation resolves it in a separate step.
    pub fn new(account_id: AccountId, activity: ActivityRef) -> Self {
        Self {
            id: None,
            seq: None,
            account_id,
            from_account_id: None,
            activity,
            created_at: None,
            updated_at: None,
            from_account: None,
        }
    }

    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    pub fn kind(&self) -> NotificationType {
        NotificationType::from(self.activity.activity_type)
    }

    pub fn is_browserable(&self) -> bool {
        self.kind().is_browserable()
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), NotificationValidationError> {
        if self.account_id <= 0 {
            return Err(NotificationValidationError::NonPositiveId {
                field: "account_id",
                value: self.account_id,
            });
        }
        if self.activity.activity_id <= 0 {
            return Err(NotificationValidationError::NonPositiveId {
                field: "activity_id",
                value: self.activity.activity_id,
            });
        }
        if let Some(id) = self.id {
            if self.created_at.is_none() || self.updated_at.is_none() {
                return Err(NotificationValidationError::MissingTimestamps(id));
            }
        }
        Ok(())
    }
}

/// A notification together with its eagerly resolved activity.
///
/// This is also the shape kept in the secondary cache, so a cached feed can
/// be rendered without resolving activities again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    pub notification: Notification,
    pub activity: Activity,
}

impl NotificationView {
    pub fn kind(&self) -> NotificationType {
        self.notification.kind()
    }

    pub fn target_status(&self) -> Option<&Status> {
        target_status(self.kind(), Some(&self.activity))
    }

    pub fn is_browserable(&self) -> bool {
        self.notification.is_browserable()
    }

    /// `None` renders as a deleted account.
    pub fn from_account(&self) -> Option<&Account> {
        self.notification.from_account.as_ref()
    }
}
