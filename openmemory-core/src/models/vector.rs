use serde_json::Value;

use super::Sector;

/// A single sector's embedding for a memory (`spec.md` §3.2).
#[derive(Debug, Clone)]
pub struct StoredVector {
    pub memory_id: String,
    pub sector: Sector,
    pub user_id: Option<String>,
    pub vec: Vec<f32>,
    pub dim: usize,
    pub metadata: Option<Value>,
}

impl StoredVector {
    pub fn new(memory_id: impl Into<String>, sector: Sector, vec: Vec<f32>) -> Self {
        let dim = vec.len();
        Self {
            memory_id: memory_id.into(),
            sector,
            user_id: None,
            vec,
            dim,
            metadata: None,
        }
    }
}
