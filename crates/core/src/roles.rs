//! Well-known role name constants.
//!
//! These must match the `role` claim issued by the identity provider.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_EDITOR: &str = "editor";

/// Roles holding the wiki moderation permission.
pub const MODERATION_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_MODERATOR];
