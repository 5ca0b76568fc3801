use async_trait::async_trait;
use tokio_postgres::Row;

use openmemory_core::errors::{OpenMemoryResult, StorageError};
use openmemory_core::models::Waypoint;
use openmemory_core::traits::WaypointRepository;

use super::PgDb;

fn row_to_waypoint(row: &Row) -> Waypoint {
    Waypoint {
        src_id: row.get("src_id"),
        dst_id: row.get("dst_id"),
        user_id: row.get("user_id"),
        weight: row.get("weight"),
        created_at: row
            .get::<_, &str>("created_at")
            .parse()
            .unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: row
            .get::<_, &str>("updated_at")
            .parse()
            .unwrap_or_else(|_| chrono::Utc::now()),
    }
}

/// Shared by `upsert_reinforce` and [`super::memory_tx`]'s atomic write.
/// Caller is responsible for `waypoint.validate()`.
pub(crate) async fn upsert_reinforce_row<C: tokio_postgres::GenericClient>(
    client: &C,
    waypoint: &Waypoint,
    eta: f64,
    max_weight: f64,
) -> Result<(), StorageError> {
    let now = chrono::Utc::now().to_rfc3339();
    let initial_weight = waypoint.weight.min(max_weight);
    client
        .execute(
            "INSERT INTO waypoints (src_id, dst_id, user_id, weight, created_at, updated_at)
             VALUES ($1,$2,$3,$4,$5,$5)
             ON CONFLICT (src_id, dst_id, (COALESCE(user_id,''))) DO UPDATE SET
                weight = LEAST($6, waypoints.weight + $7), updated_at = $5",
            &[
                &waypoint.src_id,
                &waypoint.dst_id,
                &waypoint.user_id,
                &initial_weight,
                &now,
                &max_weight,
                &eta,
            ],
        )
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl WaypointRepository for PgDb {
    async fn upsert_reinforce(&self, waypoint: &Waypoint, eta: f64, max_weight: f64) -> OpenMemoryResult<()> {
        waypoint.validate()?;
        let client = self.client().await?;
        upsert_reinforce_row(&client, waypoint, eta, max_weight)
            .await
            .map_err(Into::into)
    }

    async fn neighbors(&self, memory_id: &str, user_id: Option<&str>) -> OpenMemoryResult<Vec<Waypoint>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT * FROM waypoints
                 WHERE (src_id = $1 OR dst_id = $1) AND COALESCE(user_id,'') = COALESCE($2,'')",
                &[&memory_id, &user_id],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(rows.iter().map(row_to_waypoint).collect())
    }

    async fn prune_below(&self, min_weight: f64) -> OpenMemoryResult<u64> {
        let client = self.client().await?;
        let n = client
            .execute("DELETE FROM waypoints WHERE weight < $1", &[&min_weight])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n)
    }

    async fn delete_for_memory(&self, memory_id: &str) -> OpenMemoryResult<u64> {
        let client = self.client().await?;
        let n = client
            .execute(
                "DELETE FROM waypoints WHERE src_id=$1 OR dst_id=$1",
                &[&memory_id],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n)
    }

    async fn apply_decay(&self, memory_id: &str, factor: f64) -> OpenMemoryResult<()> {
        let client = self.client().await?;
        client
            .execute(
                "UPDATE waypoints SET weight = weight * $2 WHERE src_id = $1 OR dst_id = $1",
                &[&memory_id, &factor],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
