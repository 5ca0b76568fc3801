use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weighted associative edge between two memories (`spec.md` §3.3).
/// Stored as a directed pair but traversal treats both directions as
/// meaningfully connected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub src_id: String,
    pub dst_id: String,
    pub user_id: Option<String>,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Waypoint {
    pub fn validate(&self) -> Result<(), crate::errors::ValidationError> {
        if self.src_id == self.dst_id {
            return Err(crate::errors::ValidationError::SelfEdge(self.src_id.clone()));
        }
        Ok(())
    }
}
