//! Interfaces every other component is wired against through the DI
//! container (`spec.md` §9) rather than importing a concrete sibling.

mod clock;
mod embedder;
mod event_bus;
mod lock;
mod repositories;

pub use clock::{Clock, SystemClock};
pub use embedder::{EmbeddedVector, Embedder, LlmGenerator};
pub use event_bus::EventBus;
pub use lock::DistributedLock;
pub use repositories::{
    ClassifierHeadRepository, MemoryRepository, MemoryWriteTransaction, TemporalRepository,
    VectorRepository, WaypointRepository,
};
