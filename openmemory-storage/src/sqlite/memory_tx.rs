use async_trait::async_trait;

use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, StorageError};
use openmemory_core::models::{Memory, StoredVector, Waypoint};
use openmemory_core::traits::MemoryWriteTransaction;

use super::memory_repo::insert_row;
use super::vector_repo::insert_vector_rows;
use super::waypoint_repo::upsert_reinforce_row;
use super::SqliteDb;

/// Realizes `spec.md` §4.4 step 6's "single transaction: insert memory
/// row; insert vector rows; best-effort create waypoints" across the
/// three repositories a plain `insert`/`store_vectors`/`upsert_reinforce`
/// call would otherwise commit separately.
#[async_trait]
impl MemoryWriteTransaction for SqliteDb {
    async fn add_memory_atomic(
        &self,
        memory: &Memory,
        vectors: &[StoredVector],
        waypoints: &[Waypoint],
        eta: f64,
        max_weight: f64,
    ) -> OpenMemoryResult<()> {
        for w in waypoints {
            w.validate()?;
        }

        let memory = memory.clone();
        let vectors = vectors.to_vec();
        let waypoints = waypoints.to_vec();

        self.with_conn(move |conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            insert_row(&tx, &memory)?;
            insert_vector_rows(&tx, &vectors)?;
            for w in &waypoints {
                upsert_reinforce_row(&tx, w, eta, max_weight)?;
            }
            tx.commit().map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(OpenMemoryError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openmemory_core::models::Sector;

    fn memory(id: &str) -> Memory {
        let now = chrono::Utc::now();
        Memory {
            id: id.to_string(),
            user_id: None,
            segment: 0,
            content: "x".to_string(),
            simhash: format!("h-{id}"),
            primary_sector: Sector::Semantic,
            tags: Default::default(),
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
            last_seen_at: now,
            salience: 1.0,
            decay_lambda: 0.005,
            version: 1,
            mean_dim: 2,
            mean_vec: vec![1.0, 0.0],
            compressed_vec: None,
            feedback_score: 0.0,
            generated_summary: String::new(),
            coactivations: 1,
            encryption_key_version: 0,
            archived: false,
        }
    }

    #[tokio::test]
    async fn atomic_write_commits_memory_vectors_and_waypoints_together() {
        let db = SqliteDb::open_in_memory().unwrap();
        let anchor = memory("anchor");
        db.insert_row_for_test(&anchor).await;

        let m = memory("m1");
        let vectors = vec![StoredVector::new("m1", Sector::Semantic, vec![1.0, 0.0])];
        let waypoints = vec![Waypoint {
            src_id: "m1".to_string(),
            dst_id: "anchor".to_string(),
            user_id: None,
            weight: 0.5,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }];

        db.add_memory_atomic(&m, &vectors, &waypoints, 0.1, 1.0)
            .await
            .unwrap();

        assert!(db.get("m1").await.unwrap().is_some());
        let stored = db.get_vectors_by_ids(&["m1".to_string()]).await.unwrap();
        assert_eq!(stored.len(), 1);
        let neighbors = db.neighbors("m1", None).await.unwrap();
        assert_eq!(neighbors.len(), 1);
    }

    #[tokio::test]
    async fn atomic_write_rolls_back_the_memory_row_on_waypoint_failure() {
        use openmemory_core::traits::MemoryRepository;

        let db = SqliteDb::open_in_memory().unwrap();
        let m = memory("m2");
        let vectors = vec![StoredVector::new("m2", Sector::Semantic, vec![1.0, 0.0])];
        // Self-referencing waypoint fails validation, so nothing in this
        // call should be committed.
        let waypoints = vec![Waypoint {
            src_id: "m2".to_string(),
            dst_id: "m2".to_string(),
            user_id: None,
            weight: 0.5,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }];

        assert!(db.add_memory_atomic(&m, &vectors, &waypoints, 0.1, 1.0).await.is_err());
        assert!(MemoryRepository::get(&db, "m2").await.unwrap().is_none());
    }

    #[async_trait::async_trait]
    trait TestSeed {
        async fn insert_row_for_test(&self, memory: &Memory);
    }

    #[async_trait::async_trait]
    impl TestSeed for SqliteDb {
        async fn insert_row_for_test(&self, memory: &Memory) {
            use openmemory_core::traits::MemoryRepository;
            MemoryRepository::insert(self, memory).await.unwrap();
        }
    }
}
