//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row, plus any write DTOs for that table.

pub mod wiki_category;
pub mod wiki_page;
pub mod wiki_revision;
