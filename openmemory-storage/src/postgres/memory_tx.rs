use async_trait::async_trait;

use openmemory_core::errors::{OpenMemoryResult, StorageError};
use openmemory_core::models::{Memory, StoredVector, Waypoint};
use openmemory_core::traits::MemoryWriteTransaction;

use super::memory_repo::insert_row;
use super::vector_repo::insert_vector_rows;
use super::waypoint_repo::upsert_reinforce_row;
use super::PgDb;

/// Postgres counterpart to `sqlite::memory_tx`: the memory row, its
/// vector rows and any new waypoint rows commit (or roll back) together
/// through one `tokio_postgres::Transaction` (`spec.md` §4.4 step 6 / §2).
#[async_trait]
impl MemoryWriteTransaction for PgDb {
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

        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        insert_row(&tx, memory).await?;
        insert_vector_rows(&tx, vectors).await?;
        for w in waypoints {
            upsert_reinforce_row(&tx, w, eta, max_weight).await?;
        }

        tx.commit().await.map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
