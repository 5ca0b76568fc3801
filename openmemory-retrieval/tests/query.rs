use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use openmemory_core::config::{DynamicsConfig, ScoringConfig};
use openmemory_core::errors::EmbeddingError;
use openmemory_core::models::{Memory, Sector};
use openmemory_core::traits::{EmbeddedVector, Embedder, MemoryRepository, SystemClock};
use openmemory_retrieval::{HsgOptions, RetrievalService};
use openmemory_storage::sqlite::SqliteDb;
use test_fixtures::NullEventBus;

/// Seeded on text length rather than `test_fixtures::HashEmbedder` so the
/// "close"/"far" similarity gap in `vector_query_returns_best_matching_memory`
/// stays hand-computable.
struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_multi_sector(&self, text: &str, sectors: &[Sector]) -> Result<Vec<EmbeddedVector>, EmbeddingError> {
        let seed = text.len() as f32;
        Ok(sectors.iter().map(|s| EmbeddedVector { sector: *s, vec: vec![seed, 1.0], dim: 2 }).collect())
    }

    async fn embed_query_for_all_sectors(&self, text: &str) -> Result<HashMap<Sector, Vec<f32>>, EmbeddingError> {
        let seed = text.len() as f32;
        Ok(Sector::ALL.iter().map(|s| (*s, vec![seed, 1.0])).collect())
    }
}

fn memory(id: &str, content: &str, seed: f32) -> Memory {
    let now = chrono::Utc::now();
    Memory {
        id: id.to_string(),
        user_id: Some("u1".to_string()),
        segment: 0,
        content: content.to_string(),
        simhash: String::new(),
        primary_sector: Sector::Semantic,
        tags: BTreeSet::new(),
        metadata: serde_json::Value::Null,
        created_at: now,
        updated_at: now,
        last_seen_at: now,
        salience: 0.8,
        decay_lambda: 0.005,
        version: 1,
        mean_dim: 2,
        mean_vec: vec![seed, 1.0],
        compressed_vec: None,
        feedback_score: 0.0,
        generated_summary: String::new(),
        coactivations: 0,
        encryption_key_version: 0,
        archived: false,
    }
}

#[tokio::test]
async fn vector_query_returns_best_matching_memory() {
    let db = Arc::new(SqliteDb::open_in_memory().unwrap());
    db.insert(&memory("close", "matching memory about cats", 5.0)).await.unwrap();
    db.insert(&memory("far", "unrelated content entirely", 50.0)).await.unwrap();

    for (id, seed) in [("close", 5.0f32), ("far", 50.0f32)] {
        let vectors: Vec<openmemory_core::models::StoredVector> = Sector::ALL
            .iter()
            .map(|s| {
                let mut v = openmemory_core::models::StoredVector::new(id, *s, vec![seed, 1.0]);
                v.user_id = Some("u1".to_string());
                v
            })
            .collect();
        db.store_vectors(&vectors).await.unwrap();
    }

    let service = RetrievalService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        Arc::new(StubEmbedder),
        Arc::new(NullEventBus),
        Arc::new(SystemClock),
        ScoringConfig::default(),
        DynamicsConfig::default(),
    );

    let results = service
        .query(
            "query about cats",
            5,
            HsgOptions { user_id: Some("u1".to_string()), ..Default::default() },
        )
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].memory.id, "close");
}

#[tokio::test]
async fn empty_pool_keyword_fallback_never_fails() {
    let db = Arc::new(SqliteDb::open_in_memory().unwrap());
    let service = RetrievalService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        Arc::new(StubEmbedder),
        Arc::new(NullEventBus),
        Arc::new(SystemClock),
        ScoringConfig::default(),
        DynamicsConfig::default(),
    );

    let results = service.query("anything", 5, HsgOptions::default()).await.unwrap();
    assert!(results.is_empty());
}
