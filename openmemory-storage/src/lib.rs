//! Multi-backend persistence layer (`spec.md` §4.2).
//!
//! Repository traits live in `openmemory-core::traits`; this crate
//! supplies their concrete implementations, the placeholder/user-scope
//! SQL portability helpers, and the forward-only migration runner.

pub mod migrations;
pub mod sql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use sql::{inject_user_scope, translate_placeholders};
