/// Primary key of pages, revisions, and categories (PostgreSQL BIGSERIAL),
/// and the user id carried in auth claims.
pub type DbId = i64;

/// Revision and publication timestamps, always UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
