use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who caused an event to be emitted. Carried on every event so audit
/// trails can attribute writes even though `spec.md` §3 does not name
/// this field on the memory/fact models themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum EventActor {
    User(String),
    Agent(String),
    System(String),
}

/// Typed event topics (`spec.md` §4.9, §6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data")]
pub enum EventPayload {
    MemoryAdded { memory_id: String, user_id: Option<String> },
    MemoryUpdated { memory_id: String, user_id: Option<String> },
    MemoryDeleted { memory_id: String, user_id: Option<String> },
    MemoryQueried { user_id: Option<String>, result_count: usize },
    TemporalFactCreated { fact_id: String },
    TemporalFactUpdated { fact_id: String },
    TemporalFactDeleted { fact_id: String },
    TemporalEdgeCreated { edge_id: String },
    TemporalEdgeUpdated { edge_id: String },
    TemporalEdgeDeleted { edge_id: String },
}

impl EventPayload {
    pub fn topic(&self) -> &'static str {
        match self {
            EventPayload::MemoryAdded { .. } => "memory_added",
            EventPayload::MemoryUpdated { .. } => "memory_updated",
            EventPayload::MemoryDeleted { .. } => "memory_deleted",
            EventPayload::MemoryQueried { .. } => "memory_queried",
            EventPayload::TemporalFactCreated { .. } => "temporal:fact:created",
            EventPayload::TemporalFactUpdated { .. } => "temporal:fact:updated",
            EventPayload::TemporalFactDeleted { .. } => "temporal:fact:deleted",
            EventPayload::TemporalEdgeCreated { .. } => "temporal:edge:created",
            EventPayload::TemporalEdgeUpdated { .. } => "temporal:edge:updated",
            EventPayload::TemporalEdgeDeleted { .. } => "temporal:edge:deleted",
        }
    }
}

/// An immutable envelope around a payload. Payloads themselves are never
/// mutated after construction — unlike the pattern this replaces, nothing
/// downstream injects request ids into the payload body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub recorded_at: DateTime<Utc>,
    pub actor: EventActor,
    pub payload: EventPayload,
    pub extra: Value,
}

impl Event {
    pub fn new(actor: EventActor, payload: EventPayload) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            recorded_at: Utc::now(),
            actor,
            payload,
            extra: Value::Null,
        }
    }
}
