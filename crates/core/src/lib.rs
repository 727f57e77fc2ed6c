//! Domain logic for the Folio wiki.
//!
//! Everything in this crate is pure: no database, no HTTP. The revision
//! engine ([`diff`], [`matching`], [`patch`], [`undo`]) lives here next to
//! the privacy policy, markup rendering, slug handling, and settings so the
//! API and persistence layers can share one implementation.

pub mod diff;
pub mod error;
pub mod history;
pub mod markup;
pub mod matching;
pub mod patch;
pub mod privacy;
pub mod roles;
pub mod settings;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;
pub mod undo;
pub mod wiki;
