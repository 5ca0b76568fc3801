//! Bitemporal fact/edge graph (`spec.md` §4.7) plus an append-only audit
//! trail that lets a fact's history be replayed rather than only its
//! current state inspected.

mod service;

pub use service::{FactReconstruction, TemporalService};
