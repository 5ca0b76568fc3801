use async_trait::async_trait;

use crate::errors::OpenMemoryResult;
use crate::models::{Memory, StoredVector, TemporalAuditEvent, TemporalEdge, TemporalFact, Waypoint};

/// Repository interface over the memories table. Implemented by
/// `openmemory-storage` for each backend.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    async fn insert(&self, memory: &Memory) -> OpenMemoryResult<()>;
    async fn update(&self, memory: &Memory) -> OpenMemoryResult<()>;
    async fn get(&self, id: &str) -> OpenMemoryResult<Option<Memory>>;
    async fn get_by_ids(&self, ids: &[String]) -> OpenMemoryResult<Vec<Memory>>;
    async fn get_by_simhash(&self, user_id: Option<&str>, simhash: &str) -> OpenMemoryResult<Option<Memory>>;
    async fn delete(&self, id: &str) -> OpenMemoryResult<()>;
    async fn delete_all_for_user(&self, user_id: &str) -> OpenMemoryResult<u64>;
    async fn count_for_user(&self, user_id: Option<&str>) -> OpenMemoryResult<u64>;
    async fn recent_for_user(&self, user_id: Option<&str>, limit: usize) -> OpenMemoryResult<Vec<Memory>>;

    /// Total row count across every tenant — the decay sweep's `sweep_ratio`
    /// bound is computed against this, not a per-user count.
    async fn total_count(&self) -> OpenMemoryResult<u64>;

    /// A page of memories ordered by id, for the batched decay sweep
    /// (`spec.md` §4.6). Not scoped to a tenant.
    async fn list_page(&self, offset: u64, limit: u64) -> OpenMemoryResult<Vec<Memory>>;
}

#[async_trait]
pub trait VectorRepository: Send + Sync {
    async fn store_vector(&self, vector: &StoredVector) -> OpenMemoryResult<()>;
    async fn store_vectors(&self, vectors: &[StoredVector]) -> OpenMemoryResult<()>;
    async fn get_vectors_by_ids(&self, ids: &[String]) -> OpenMemoryResult<Vec<StoredVector>>;
    async fn search_similar(
        &self,
        sector: crate::models::Sector,
        query: &[f32],
        top_k: usize,
        user_id: Option<&str>,
    ) -> OpenMemoryResult<Vec<(String, f64)>>;
    async fn delete_vectors(&self, memory_id: &str) -> OpenMemoryResult<()>;
    async fn delete_vectors_by_user(&self, user_id: &str) -> OpenMemoryResult<u64>;
    async fn cleanup_orphaned(&self) -> OpenMemoryResult<u64>;
}

#[async_trait]
pub trait WaypointRepository: Send + Sync {
    async fn upsert_reinforce(&self, waypoint: &Waypoint, eta: f64, max_weight: f64) -> OpenMemoryResult<()>;
    async fn neighbors(&self, memory_id: &str, user_id: Option<&str>) -> OpenMemoryResult<Vec<Waypoint>>;
    async fn prune_below(&self, min_weight: f64) -> OpenMemoryResult<u64>;
    async fn delete_for_memory(&self, memory_id: &str) -> OpenMemoryResult<u64>;
    async fn apply_decay(&self, memory_id: &str, factor: f64) -> OpenMemoryResult<()>;
}

/// Atomically commits the write `MemoryService::add` performs against
/// three repositories at once: the memory row, its vector rows and any
/// new waypoint rows (`spec.md` §4.4 step 6 / §2). A failure partway
/// through rolls back everything written so far instead of leaving a
/// committed memory row with partial vector/waypoint state.
#[async_trait]
pub trait MemoryWriteTransaction: Send + Sync {
    async fn add_memory_atomic(
        &self,
        memory: &Memory,
        vectors: &[StoredVector],
        waypoints: &[Waypoint],
        eta: f64,
        max_weight: f64,
    ) -> OpenMemoryResult<()>;
}

/// Per-user persistence for the classifier's learned head (`spec.md`
/// §4.5: "models are persisted per userId with a version counter that
/// increments on each incremental training pass").
#[async_trait]
pub trait ClassifierHeadRepository: Send + Sync {
    async fn load_head(&self, user_id: Option<&str>) -> OpenMemoryResult<Option<crate::models::ClassifierHead>>;
    async fn save_head(&self, user_id: Option<&str>, head: &crate::models::ClassifierHead) -> OpenMemoryResult<()>;
}

#[async_trait]
pub trait TemporalRepository: Send + Sync {
    async fn upsert_fact(&self, fact: TemporalFact) -> OpenMemoryResult<TemporalFact>;
    async fn facts_at_time(
        &self,
        user_id: Option<&str>,
        at: chrono::DateTime<chrono::Utc>,
    ) -> OpenMemoryResult<Vec<TemporalFact>>;
    async fn upsert_edge(&self, edge: TemporalEdge) -> OpenMemoryResult<TemporalEdge>;
    async fn edges_at_time(
        &self,
        user_id: Option<&str>,
        at: chrono::DateTime<chrono::Utc>,
    ) -> OpenMemoryResult<Vec<TemporalEdge>>;

    /// Append one row to the audit trail (SPEC_FULL.md §4.7's event-sourced
    /// supplement). Never mutates or deletes prior rows.
    async fn record_event(&self, event: TemporalAuditEvent) -> OpenMemoryResult<()>;

    /// All audit rows for one entity, oldest first.
    async fn get_events(&self, entity_type: &str, entity_id: &str) -> OpenMemoryResult<Vec<TemporalAuditEvent>>;

    /// Open facts (`valid_to IS NULL`) not touched since `before` — the
    /// confidence-decay sweep's candidate set (`spec.md` §4.7).
    async fn stale_open_facts(
        &self,
        before: chrono::DateTime<chrono::Utc>,
    ) -> OpenMemoryResult<Vec<TemporalFact>>;

    /// Overwrite a fact's confidence and, optionally, close it by setting
    /// `valid_to`. Used by the decay sweep; bypasses the insert-time
    /// supersession logic in `upsert_fact`.
    async fn set_fact_confidence(
        &self,
        id: &str,
        confidence: f64,
        valid_to: Option<chrono::DateTime<chrono::Utc>>,
    ) -> OpenMemoryResult<()>;
}
