//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Reads
//! accept `&PgPool`; writes accept `&mut PgConnection` so they compose into
//! one transaction.

pub mod wiki_category_repo;
pub mod wiki_page_repo;
pub mod wiki_revision_repo;

pub use wiki_category_repo::WikiCategoryRepo;
pub use wiki_page_repo::WikiPageRepo;
pub use wiki_revision_repo::WikiRevisionRepo;
