//! Revision authorship and ordering.
//!
//! Revisions of a page are totally ordered by `(created_at, id)`. These
//! helpers hold that ordering in one place so every store agrees on what
//! "newest" and "preceding" mean.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// Who made an edit. Anonymous edits carry no identity at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    Anonymous,
    User { id: DbId, username: String },
}

impl Author {
    pub fn user(id: DbId, username: impl Into<String>) -> Self {
        Self::User {
            id,
            username: username.into(),
        }
    }

    /// Build from the two nullable storage columns. A missing id means the
    /// edit was anonymous, whatever the name column says.
    pub fn from_columns(id: Option<DbId>, username: Option<String>) -> Self {
        match id {
            Some(id) => Self::User {
                id,
                username: username.unwrap_or_default(),
            },
            None => Self::Anonymous,
        }
    }

    /// Split into `(author_id, author_name)` storage columns.
    pub fn to_columns(&self) -> (Option<DbId>, Option<&str>) {
        match self {
            Self::Anonymous => (None, None),
            Self::User { id, username } => (Some(*id), Some(username.as_str())),
        }
    }

    pub fn id(&self) -> Option<DbId> {
        match self {
            Self::Anonymous => None,
            Self::User { id, .. } => Some(*id),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User { username, .. } => Some(username),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Anything positioned in a page's revision history.
pub trait Stamped {
    fn created_at(&self) -> Timestamp;
    fn id(&self) -> DbId;

    fn stamp(&self) -> (Timestamp, DbId) {
        (self.created_at(), self.id())
    }
}

/// Sort revisions newest first.
pub fn sort_newest_first<T: Stamped>(revisions: &mut [T]) {
    revisions.sort_by_key(|r| std::cmp::Reverse(r.stamp()));
}

/// The revision immediately before `target` in `revisions` (which must all
/// belong to the same page), or `None` when `target` is the first one.
pub fn select_preceding<'a, T: Stamped>(revisions: &'a [T], target: &T) -> Option<&'a T> {
    let bound = target.stamp();
    revisions
        .iter()
        .filter(|r| r.stamp() < bound)
        .max_by_key(|r| r.stamp())
}

/// The newest revision, if any.
pub fn latest<T: Stamped>(revisions: &[T]) -> Option<&T> {
    revisions.iter().max_by_key(|r| r.stamp())
}

/// Whether saving `proposed` over `current` warrants a new revision.
pub fn content_changed(current: &str, proposed: &str) -> bool {
    current != proposed
}
