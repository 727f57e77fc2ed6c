//! Who may view, edit, and create wiki pages.
//!
//! | Level      | view       | edit / create                              |
//! |------------|------------|--------------------------------------------|
//! | Open       | everyone   | everyone if anonymous edits are allowed,   |
//! |            |            | otherwise signed-in users                  |
//! | Registered | everyone   | signed-in users                            |
//! | Moderated  | everyone   | moderators                                 |
//! | Closed     | moderators | moderators                                 |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::history::Author;
use crate::roles::{MODERATION_ROLES, ROLE_ADMIN};
use crate::types::{DbId, Timestamp};
use crate::wiki::PageStatus;

/// Wiki-wide (or per-page) privacy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Open,
    Registered,
    Moderated,
    Closed,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Registered => "registered",
            Self::Moderated => "moderated",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "opened" => Ok(Self::Open),
            "registered" => Ok(Self::Registered),
            "moderated" => Ok(Self::Moderated),
            "closed" => Ok(Self::Closed),
            other => Err(CoreError::Validation(format!(
                "Invalid privacy level '{other}'. Must be one of: open, registered, moderated, closed"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Viewer
// ---------------------------------------------------------------------------

/// The party making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User {
        id: DbId,
        username: String,
        role: String,
    },
}

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// Holds the wiki moderation permission.
    pub fn is_moderator(&self) -> bool {
        match self {
            Self::Anonymous => false,
            Self::User { role, .. } => MODERATION_ROLES.contains(&role.as_str()),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Self::User { role, .. } if role == ROLE_ADMIN)
    }

    /// The author recorded on edits made by this viewer.
    pub fn as_author(&self) -> Author {
        match self {
            Self::Anonymous => Author::Anonymous,
            Self::User { id, username, .. } => Author::user(*id, username.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// A privacy level together with the anonymous-edit switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub level: PrivacyLevel,
    pub allow_anonymous_edits: bool,
}

impl Policy {
    pub fn new(level: PrivacyLevel, allow_anonymous_edits: bool) -> Self {
        Self {
            level,
            allow_anonymous_edits,
        }
    }

    /// Same switch, different level (for per-page overrides).
    pub fn with_level(self, level: PrivacyLevel) -> Self {
        Self { level, ..self }
    }

    pub fn can_view(&self, viewer: &Viewer) -> bool {
        match self.level {
            PrivacyLevel::Open | PrivacyLevel::Registered | PrivacyLevel::Moderated => true,
            PrivacyLevel::Closed => viewer.is_moderator(),
        }
    }

    pub fn can_edit(&self, viewer: &Viewer) -> bool {
        match self.level {
            PrivacyLevel::Open => self.allow_anonymous_edits || viewer.is_authenticated(),
            PrivacyLevel::Registered => viewer.is_authenticated(),
            PrivacyLevel::Moderated | PrivacyLevel::Closed => viewer.is_moderator(),
        }
    }

    pub fn can_create(&self, viewer: &Viewer) -> bool {
        self.can_edit(viewer)
    }
}

// ---------------------------------------------------------------------------
// Publication
// ---------------------------------------------------------------------------

/// Publication attributes of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publication {
    pub status: PageStatus,
    pub publish_date: Timestamp,
    pub expiry_date: Option<Timestamp>,
}

impl Publication {
    /// Published, inside its publish window at `now`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.status == PageStatus::Published
            && self.publish_date <= now
            && self.expiry_date.is_none_or(|expiry| expiry >= now)
    }
}

/// Whether `viewer` can see a page with the given publication state.
///
/// Staff see everything, moderators see drafts too, everyone else only
/// sees live published pages.
pub fn is_visible(viewer: &Viewer, publication: &Publication, now: Timestamp) -> bool {
    if viewer.is_staff() {
        return true;
    }
    if viewer.is_moderator() {
        return matches!(publication.status, PageStatus::Draft | PageStatus::Published);
    }
    publication.is_live(now)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn user(role: &str) -> Viewer {
        Viewer::User {
            id: 1,
            username: "ada".into(),
            role: role.into(),
        }
    }

    fn policy(level: PrivacyLevel) -> Policy {
        Policy::new(level, true)
    }

    // -- parsing -------------------------------------------------------------

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!("Open".parse::<PrivacyLevel>().unwrap(), PrivacyLevel::Open);
        assert_eq!("opened".parse::<PrivacyLevel>().unwrap(), PrivacyLevel::Open);
        assert_eq!(" closed ".parse::<PrivacyLevel>().unwrap(), PrivacyLevel::Closed);
        assert!("secret".parse::<PrivacyLevel>().is_err());
    }

    #[test]
    fn level_display_round_trips() {
        for level in [
            PrivacyLevel::Open,
            PrivacyLevel::Registered,
            PrivacyLevel::Moderated,
            PrivacyLevel::Closed,
        ] {
            assert_eq!(level.to_string().parse::<PrivacyLevel>().unwrap(), level);
        }
    }

    // -- viewer --------------------------------------------------------------

    #[test]
    fn viewer_roles() {
        assert!(user("admin").is_staff());
        assert!(user("admin").is_moderator());
        assert!(user("moderator").is_moderator());
        assert!(!user("moderator").is_staff());
        assert!(!user("editor").is_moderator());
        assert!(!Viewer::Anonymous.is_authenticated());
        assert_eq!(user("editor").as_author(), Author::user(1, "ada"));
        assert_eq!(Viewer::Anonymous.as_author(), Author::Anonymous);
    }

    // -- policy table --------------------------------------------------------

    #[test]
    fn open_wiki_allows_anonymous_edits_when_enabled() {
        let open = policy(PrivacyLevel::Open);
        assert!(open.can_view(&Viewer::Anonymous));
        assert!(open.can_edit(&Viewer::Anonymous));
        assert!(open.can_create(&Viewer::Anonymous));

        let strict = Policy::new(PrivacyLevel::Open, false);
        assert!(!strict.can_edit(&Viewer::Anonymous));
        assert!(strict.can_edit(&user("editor")));
    }

    #[test]
    fn registered_wiki_requires_sign_in_to_edit() {
        let p = policy(PrivacyLevel::Registered);
        assert!(p.can_view(&Viewer::Anonymous));
        assert!(!p.can_edit(&Viewer::Anonymous));
        assert!(p.can_edit(&user("editor")));
        assert!(p.can_create(&user("editor")));
    }

    #[test]
    fn moderated_wiki_requires_moderator_to_edit() {
        let p = policy(PrivacyLevel::Moderated);
        assert!(p.can_view(&Viewer::Anonymous));
        assert!(!p.can_edit(&user("editor")));
        assert!(p.can_edit(&user("moderator")));
    }

    #[test]
    fn closed_wiki_hidden_from_non_moderators() {
        let p = policy(PrivacyLevel::Closed);
        assert!(!p.can_view(&Viewer::Anonymous));
        assert!(!p.can_view(&user("editor")));
        assert!(p.can_view(&user("moderator")));
        assert!(p.can_edit(&user("admin")));
        assert!(!p.can_create(&user("editor")));
    }

    #[test]
    fn page_override_keeps_anonymous_switch() {
        let p = Policy::new(PrivacyLevel::Registered, true).with_level(PrivacyLevel::Open);
        assert!(p.can_edit(&Viewer::Anonymous));
    }

    // -- publication ---------------------------------------------------------

    #[test]
    fn drafts_visible_only_to_moderators_and_staff() {
        let now = Utc::now();
        let draft = Publication {
            status: PageStatus::Draft,
            publish_date: now - Duration::days(1),
            expiry_date: None,
        };
        assert!(!is_visible(&Viewer::Anonymous, &draft, now));
        assert!(!is_visible(&user("editor"), &draft, now));
        assert!(is_visible(&user("moderator"), &draft, now));
        assert!(is_visible(&user("admin"), &draft, now));
    }

    #[test]
    fn publish_window_applies_to_regular_viewers() {
        let now = Utc::now();
        let future = Publication {
            status: PageStatus::Published,
            publish_date: now + Duration::days(1),
            expiry_date: None,
        };
        let expired = Publication {
            status: PageStatus::Published,
            publish_date: now - Duration::days(10),
            expiry_date: Some(now - Duration::days(1)),
        };
        let live = Publication {
            status: PageStatus::Published,
            publish_date: now - Duration::days(10),
            expiry_date: Some(now + Duration::days(1)),
        };
        assert!(!is_visible(&Viewer::Anonymous, &future, now));
        assert!(!is_visible(&Viewer::Anonymous, &expired, now));
        assert!(is_visible(&Viewer::Anonymous, &live, now));
        assert!(is_visible(&user("admin"), &expired, now));
    }
}
