//! Hybrid similarity/graph query engine (`spec.md` §4.8): classify, embed
//! per sector, union candidate sets, composite-score, reinforce.

mod features;
mod service;

pub use service::{HsgOptions, HsgResult, RetrievalService};
