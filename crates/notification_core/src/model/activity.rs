//! Polymorphic activity reference and the loaded activity entities.
//!
//! # Responsibility
//! - Define the closed set of activity kinds a notification can point at.
//! - Describe eager-load shapes as explicit preload values.
//!
//! # Invariants
//! - `ActivityKind` has exactly five variants; unknown storage tags are
//!   rejected with `UnknownActivityType`, never coerced.
//! - Nested fields (`account`, `status`, `reblog`, ...) are only filled by
//!   eager resolution. A direct lookup leaves them empty.

use crate::model::account::{Account, AccountId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Primary key of a row in one of the activity tables.
pub type ActivityId = i64;
/// Primary key of a status row.
pub type StatusId = i64;

/// Closed set of entity kinds a notification may reference.
///
/// Serialized with the same PascalCase tags used in the `activity_type`
/// storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActivityKind {
    Mention,
    Status,
    Follow,
    FollowRequest,
    Favourite,
}

/// A type tag outside the five known activity kinds.
///
/// Indicates a schema or version mismatch with whoever wrote the row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown activity type `{0}`")]
pub struct UnknownActivityType(pub String);

impl ActivityKind {
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::Mention,
        ActivityKind::Status,
        ActivityKind::Follow,
        ActivityKind::FollowRequest,
        ActivityKind::Favourite,
    ];

    /// Tag stored in the `activity_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mention => "Mention",
            Self::Status => "Status",
            Self::Follow => "Follow",
            Self::FollowRequest => "FollowRequest",
            Self::Favourite => "Favourite",
        }
    }

    /// Table holding rows of this kind.
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Mention => "mentions",
            Self::Status => "statuses",
            Self::Follow => "follows",
            Self::FollowRequest => "follow_requests",
            Self::Favourite => "favourites",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = UnknownActivityType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Mention" => Ok(Self::Mention),
            "Status" => Ok(Self::Status),
            "Follow" => Ok(Self::Follow),
            "FollowRequest" => Ok(Self::FollowRequest),
            "Favourite" => Ok(Self::Favourite),
            other => Err(UnknownActivityType(other.to_string())),
        }
    }
}

impl Display for ActivityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polymorphic pointer from a notification to exactly one activity row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityRef {
    pub activity_type: ActivityKind,
    pub activity_id: ActivityId,
}

impl ActivityRef {
    pub fn new(activity_type: ActivityKind, activity_id: ActivityId) -> Self {
        Self {
            activity_type,
            activity_id,
        }
    }

    pub fn mention(id: ActivityId) -> Self {
        Self::new(ActivityKind::Mention, id)
    }

    pub fn status(id: ActivityId) -> Self {
        Self::new(ActivityKind::Status, id)
    }

    pub fn follow(id: ActivityId) -> Self {
        Self::new(ActivityKind::Follow, id)
    }

    pub fn follow_request(id: ActivityId) -> Self {
        Self::new(ActivityKind::FollowRequest, id)
    }

    pub fn favourite(id: ActivityId) -> Self {
        Self::new(ActivityKind::Favourite, id)
    }
}

impl Display for ActivityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.activity_type, self.activity_id)
    }
}

/// Which relations eager status resolution fills in.
///
/// Values are built explicitly, so the nesting is always finite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPreload {
    pub account: bool,
    pub media_attachments: bool,
    pub tags: bool,
    /// Mentions together with each mentioned account.
    pub mentions: bool,
    /// Preload applied to the reposted status, if any.
    pub reblog: Option<Box<StatusPreload>>,
}

impl StatusPreload {
    /// Account, media, tags and mentions, without following reposts.
    pub fn flat() -> Self {
        Self {
            account: true,
            media_attachments: true,
            tags: true,
            mentions: true,
            reblog: None,
        }
    }

    /// Display shape: the flat set, repeated once for a reposted status.
    pub fn for_notifications() -> Self {
        Self {
            reblog: Some(Box::new(Self::flat())),
            ..Self::flat()
        }
    }
}

/// Eager-load shape for activity resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityPreload {
    /// Applied to Status activities and to the status of a Mention/Favourite.
    pub status: StatusPreload,
    /// Loads the acting account of Follow, FollowRequest and Favourite rows.
    pub actor_account: bool,
}

impl ActivityPreload {
    pub fn for_notifications() -> Self {
        Self {
            status: StatusPreload::for_notifications(),
            actor_account: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub id: i64,
    pub status_id: StatusId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    /// Author of the status.
    pub account_id: AccountId,
    pub text: String,
    /// Set when this status is a repost of another status.
    pub reblog_of_id: Option<StatusId>,
    pub created_at: i64,
    pub account: Option<Account>,
    pub media_attachments: Vec<MediaAttachment>,
    pub tags: Vec<Tag>,
    pub mentions: Vec<Mention>,
    pub reblog: Option<Box<Status>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: ActivityId,
    pub status_id: StatusId,
    /// The mentioned account, not the author of the status.
    pub account_id: AccountId,
    pub account: Option<Account>,
    pub status: Option<Box<Status>>,
}

/// Shared shape of follows and follow requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: ActivityId,
    /// The follower.
    pub account_id: AccountId,
    pub target_account_id: AccountId,
    pub account: Option<Account>,
}

pub type FollowRequest = Follow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favourite {
    pub id: ActivityId,
    pub account_id: AccountId,
    pub status_id: StatusId,
    pub account: Option<Account>,
    pub status: Option<Status>,
}

/// A resolved activity row, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    Mention(Mention),
    Status(Status),
    Follow(Follow),
    FollowRequest(FollowRequest),
    Favourite(Favourite),
}

impl Activity {
    pub fn kind(&self) -> ActivityKind {
        match self {
            Self::Mention(_) => ActivityKind::Mention,
            Self::Status(_) => ActivityKind::Status,
            Self::Follow(_) => ActivityKind::Follow,
            Self::FollowRequest(_) => ActivityKind::FollowRequest,
            Self::Favourite(_) => ActivityKind::Favourite,
        }
    }

    pub fn id(&self) -> ActivityId {
        match self {
            Self::Mention(mention) => mention.id,
            Self::Status(status) => status.id,
            Self::Follow(follow) | Self::FollowRequest(follow) => follow.id,
            Self::Favourite(favourite) => favourite.id,
        }
    }

    pub fn reference(&self) -> ActivityRef {
        ActivityRef::new(self.kind(), self.id())
    }

    /// The row's own `account_id` column.
    ///
    /// For a mention this is the mentioned account, not the actor.
    pub fn account_id(&self) -> AccountId {
        match self {
            Self::Mention(mention) => mention.account_id,
            Self::Status(status) => status.account_id,
            Self::Follow(follow) | Self::FollowRequest(follow) => follow.account_id,
            Self::Favourite(favourite) => favourite.account_id,
        }
    }

    /// Associated status of a mention or favourite, when loaded.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Mention(mention) => mention.status.as_deref(),
            Self::Favourite(favourite) => favourite.status.as_ref(),
            Self::Status(_) | Self::Follow(_) | Self::FollowRequest(_) => None,
        }
    }

    /// Reposted status of a Status activity, when loaded.
    pub fn reblog(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => status.reblog.as_deref(),
            _ => None,
        }
    }
}
