//! Decay sweeps, reinforcement on recall, spreading activation and
//! consolidation (`spec.md` §4.6).
//!
//! The per-batch math (`decay`, `reinforcement`, `spreading`,
//! `consolidation`) is pure and I/O-free; [`DynamicsService`] is the
//! thin orchestration layer that fetches batches, applies the math, and
//! writes results back through the repository traits.

pub mod consolidation;
pub mod decay;
pub mod reinforcement;
pub mod spreading;

mod service;

pub use service::{DynamicsService, SweepStats};
