//! Process-wide plumbing every other crate is wired against through the DI
//! container rather than constructing directly (`spec.md` §4.9 / §9):
//! a named-task scheduler, a sequential event bus, metadata-store-backed
//! distributed locks, and a TTL key/value cache.

mod cache;
mod container;
mod event_bus;
mod locks;
mod scheduler;

pub use cache::KvCache;
pub use container::Container;
pub use event_bus::SequentialEventBus;
pub use locks::select_lock_backend;
pub use scheduler::{Scheduler, TaskStats};
