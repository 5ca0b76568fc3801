use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bitemporal assertion (`spec.md` §3.4). At most one row per
/// `(user_id, subject, predicate)` may have `valid_to == None` at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalFact {
    pub id: String,
    pub user_id: Option<String>,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
    pub metadata: Value,
}

/// Bitemporal relation between two entities (`spec.md` §3.5). Same
/// open-window invariant per `(user_id, source_id, target_id, relation_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalEdge {
    pub id: String,
    pub user_id: Option<String>,
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub weight: f64,
    pub last_updated: DateTime<Utc>,
    pub metadata: Value,
}

/// Append-only audit row for a fact/edge mutation (SPEC_FULL.md §4.7's
/// event-sourced supplement to the bitemporal store). Replay over these is
/// how `reconstruct_fact_at` answers "what did we believe, and why" without
/// a separate snapshot/compaction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalAuditEvent {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub event_type: String,
    pub recorded_at: DateTime<Utc>,
    pub actor_kind: String,
    pub actor_id: String,
    pub delta: Value,
}
