//! Placeholder portability and user-scope injection (`spec.md` §4.2, §9).
//!
//! Repositories author SQL with `?` placeholders and an optional
//! `user_id` injection point; these helpers are small explicit state
//! machines over the SQL text rather than regex, so output is
//! deterministic and quoted literals are never touched.

mod placeholder;
mod user_scope;

pub use placeholder::translate_placeholders;
pub use user_scope::inject_user_scope;
