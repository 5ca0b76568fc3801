use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user reflection/consolidation summary (`spec.md` §3.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: String,
    pub summary: String,
    pub reflection_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
