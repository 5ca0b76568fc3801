use std::sync::Arc;

use openmemory_core::config::OpenMemoryConfig;
use openmemory_core::errors::OpenMemoryResult;
use openmemory_core::traits::{
    Clock, ClassifierHeadRepository, DistributedLock, Embedder, EventBus, MemoryRepository,
    MemoryWriteTransaction, SystemClock, TemporalRepository, VectorRepository, WaypointRepository,
};
use openmemory_storage::sqlite::SqliteDb;

use crate::cache::KvCache;
use crate::event_bus::SequentialEventBus;
use crate::locks::select_lock_backend;
use crate::scheduler::Scheduler;

/// Owns every `Arc<dyn Trait>` the rest of the engine is wired against
/// (`spec.md` §9). Every other crate takes these trait objects as
/// constructor arguments rather than importing `openmemory-storage` or
/// `openmemory-runtime` directly, so swapping a backend means changing
/// only what's assembled here.
pub struct Container {
    pub memories: Arc<dyn MemoryRepository>,
    pub vectors: Arc<dyn VectorRepository>,
    pub waypoints: Arc<dyn WaypointRepository>,
    pub temporal: Arc<dyn TemporalRepository>,
    pub memory_tx: Arc<dyn MemoryWriteTransaction>,
    pub classifier_heads: Arc<dyn ClassifierHeadRepository>,
    pub embedder: Arc<dyn Embedder>,
    pub events: Arc<SequentialEventBus>,
    pub clock: Arc<dyn Clock>,
    pub locks: Arc<dyn DistributedLock>,
    pub cache: Arc<KvCache>,
    pub scheduler: Arc<Scheduler>,
    pub config: OpenMemoryConfig,
}

impl Container {
    /// Assembles a container from `config` and a caller-supplied embedder
    /// (there is no bundled embedding provider in this workspace — see
    /// `spec.md` §6.1's Non-goal on hosting providers). Only the SQLite
    /// backend is wired here; a Postgres deployment constructs its own
    /// `PgDb`-backed repositories and builds a `Container` with `new`
    /// directly instead of going through this helper.
    pub async fn bootstrap(config: OpenMemoryConfig, embedder: Arc<dyn Embedder>) -> OpenMemoryResult<Self> {
        let db = Arc::new(SqliteDb::open(&config.db_path)?);
        let locks = select_lock_backend(config.backends.metadata_backend, db.clone());
        Ok(Self::new(
            db.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            db,
            embedder,
            locks,
            config,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memories: Arc<dyn MemoryRepository>,
        vectors: Arc<dyn VectorRepository>,
        waypoints: Arc<dyn WaypointRepository>,
        temporal: Arc<dyn TemporalRepository>,
        memory_tx: Arc<dyn MemoryWriteTransaction>,
        classifier_heads: Arc<dyn ClassifierHeadRepository>,
        embedder: Arc<dyn Embedder>,
        locks: Arc<dyn DistributedLock>,
        config: OpenMemoryConfig,
    ) -> Self {
        Self {
            memories,
            vectors,
            waypoints,
            temporal,
            memory_tx,
            classifier_heads,
            embedder,
            events: Arc::new(SequentialEventBus::new(config.event_max_listeners)),
            clock: Arc::new(SystemClock),
            locks,
            cache: Arc::new(KvCache::default()),
            scheduler: Arc::new(Scheduler::new()),
            config,
        }
    }

    pub fn event_bus(&self) -> Arc<dyn EventBus> {
        self.events.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use openmemory_core::errors::EmbeddingError;
    use openmemory_core::models::Sector;
    use openmemory_core::traits::EmbeddedVector;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_multi_sector(&self, _text: &str, _sectors: &[Sector]) -> Result<Vec<EmbeddedVector>, EmbeddingError> {
            Ok(Vec::new())
        }

        async fn embed_query_for_all_sectors(&self, _text: &str) -> Result<HashMap<Sector, Vec<f32>>, EmbeddingError> {
            Ok(HashMap::new())
        }
    }

    #[tokio::test]
    async fn bootstrap_wires_an_in_process_sqlite_backend() {
        let mut config = OpenMemoryConfig::default();
        config.db_path = ":memory:".to_string();
        let container = Container::bootstrap(config, Arc::new(StubEmbedder)).await.unwrap();
        assert_eq!(container.events.listener_count().await, 0);
    }
}
