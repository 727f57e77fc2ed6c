//! Authentication and authorization extractors.
//!
//! - [`auth::CurrentViewer`] -- The viewer behind an optional JWT Bearer token.
//! - [`rbac::RequireModerator`] -- Requires the wiki moderation permission.

pub mod auth;
pub mod rbac;
