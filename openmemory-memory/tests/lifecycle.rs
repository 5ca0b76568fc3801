use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use openmemory_core::config::OpenMemoryConfig;
use openmemory_core::errors::EmbeddingError;
use openmemory_core::models::{Event, Sector};
use openmemory_core::traits::{Clock, EmbeddedVector, Embedder, EventBus, SystemClock};
use openmemory_memory::{AddRequest, MemoryService, UpdatePatch};
use openmemory_storage::sqlite::SqliteDb;

struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_multi_sector(
        &self,
        text: &str,
        sectors: &[Sector],
    ) -> Result<Vec<EmbeddedVector>, EmbeddingError> {
        let seed = text.len() as f32;
        Ok(sectors
            .iter()
            .map(|s| EmbeddedVector {
                sector: *s,
                vec: vec![seed, seed / 2.0, 1.0],
                dim: 3,
            })
            .collect())
    }

    async fn embed_query_for_all_sectors(
        &self,
        text: &str,
    ) -> Result<std::collections::HashMap<Sector, Vec<f32>>, EmbeddingError> {
        let seed = text.len() as f32;
        Ok(Sector::ALL.iter().map(|s| (*s, vec![seed, seed / 2.0, 1.0])).collect())
    }
}

struct NullEventBus;

#[async_trait]
impl EventBus for NullEventBus {
    async fn publish(&self, _event: Event) {}
}

fn build_service() -> MemoryService {
    let db = Arc::new(SqliteDb::open_in_memory().unwrap());
    MemoryService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        db,
        Arc::new(StubEmbedder),
        Arc::new(NullEventBus),
        Arc::new(SystemClock),
        OpenMemoryConfig::default(),
    )
}

#[tokio::test]
async fn add_twice_dedups_and_increments_coactivations() {
    let service = build_service();
    let req = AddRequest {
        content: "hello world".to_string(),
        user_id: Some("u1".to_string()),
        tags: BTreeSet::new(),
        metadata: serde_json::Value::Null,
        sector_override: None,
    };
    let id1 = service.add(req.clone()).await.unwrap();
    let id2 = service.add(req).await.unwrap();
    assert_eq!(id1, id2);
}

#[tokio::test]
async fn update_changes_content_and_re_embeds() {
    let service = build_service();
    let id = service
        .add(AddRequest {
            content: "first version".to_string(),
            user_id: Some("u1".to_string()),
            tags: BTreeSet::new(),
            metadata: serde_json::Value::Null,
            sector_override: Some(Sector::Semantic),
        })
        .await
        .unwrap();

    service
        .update(
            &id,
            UpdatePatch {
                content: Some("second version".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_removes_memory() {
    let service = build_service();
    let id = service
        .add(AddRequest {
            content: "to be deleted".to_string(),
            user_id: None,
            tags: BTreeSet::new(),
            metadata: serde_json::Value::Null,
            sector_override: None,
        })
        .await
        .unwrap();

    service.delete(&id).await.unwrap();
    assert!(service.update(&id, UpdatePatch::default()).await.is_err());
}
