use serde::{Deserialize, Serialize};

/// Persisted form of a per-user learned classifier head (`spec.md` §4.5).
/// `openmemory-classify::LogisticHead` mirrors these fields; the two are
/// kept as separate types so this crate doesn't depend on the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierHead {
    pub dim: usize,
    /// One weight row per sector, in `Sector::ALL` order.
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub version: u64,
    pub learning_rate: f64,
}
