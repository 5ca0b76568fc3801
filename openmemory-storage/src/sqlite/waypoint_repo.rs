use async_trait::async_trait;
use rusqlite::params;

use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, StorageError};
use openmemory_core::models::Waypoint;
use openmemory_core::traits::WaypointRepository;

use super::SqliteDb;

fn row_to_waypoint(row: &rusqlite::Row) -> rusqlite::Result<Waypoint> {
    Ok(Waypoint {
        src_id: row.get("src_id")?,
        dst_id: row.get("dst_id")?,
        user_id: row.get("user_id")?,
        weight: row.get("weight")?,
        created_at: row
            .get::<_, String>("created_at")?
            .parse()
            .unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: row
            .get::<_, String>("updated_at")?
            .parse()
            .unwrap_or_else(|_| chrono::Utc::now()),
    })
}

/// Shared by `upsert_reinforce` and [`super::memory_tx`]'s atomic write.
pub(crate) fn upsert_reinforce_row(
    conn: &rusqlite::Connection,
    waypoint: &Waypoint,
    eta: f64,
    max_weight: f64,
) -> Result<(), StorageError> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO waypoints (src_id, dst_id, user_id, weight, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?5)
         ON CONFLICT(src_id, dst_id, COALESCE(user_id,'')) DO UPDATE SET
            weight = MIN(?6, weight + ?7), updated_at = ?5",
        params![
            waypoint.src_id,
            waypoint.dst_id,
            waypoint.user_id,
            waypoint.weight.min(max_weight),
            now,
            max_weight,
            eta
        ],
    )
    .map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl WaypointRepository for SqliteDb {
    async fn upsert_reinforce(&self, waypoint: &Waypoint, eta: f64, max_weight: f64) -> OpenMemoryResult<()> {
        waypoint.validate()?;
        let w = waypoint.clone();
        self.with_conn(move |conn| upsert_reinforce_row(conn, &w, eta, max_weight))
            .await
            .map_err(OpenMemoryError::from)
    }

    async fn neighbors(&self, memory_id: &str, user_id: Option<&str>) -> OpenMemoryResult<Vec<Waypoint>> {
        let memory_id = memory_id.to_string();
        let user_id = user_id.map(|s| s.to_string());
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM waypoints
                     WHERE (src_id = ?1 OR dst_id = ?1) AND COALESCE(user_id,'') = COALESCE(?2,'')",
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![memory_id, user_id], row_to_waypoint)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r.map_err(|e| StorageError::Backend(e.to_string()))?);
            }
            Ok(out)
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn prune_below(&self, min_weight: f64) -> OpenMemoryResult<u64> {
        self.with_conn(move |conn| {
            let n = conn
                .execute("DELETE FROM waypoints WHERE weight < ?1", params![min_weight])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(n as u64)
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn delete_for_memory(&self, memory_id: &str) -> OpenMemoryResult<u64> {
        let memory_id = memory_id.to_string();
        self.with_conn(move |conn| {
            let n = conn
                .execute(
                    "DELETE FROM waypoints WHERE src_id=?1 OR dst_id=?1",
                    params![memory_id],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(n as u64)
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn apply_decay(&self, memory_id: &str, factor: f64) -> OpenMemoryResult<()> {
        let memory_id = memory_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE waypoints SET weight = weight * ?2 WHERE src_id = ?1 OR dst_id = ?1",
                params![memory_id, factor],
            )
            .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(OpenMemoryError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_memories(db: &SqliteDb) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO memories (id, segment, content, simhash, primary_sector, tags, metadata,
                    created_at, updated_at, last_seen_at) VALUES
                    ('a',0,'x','h1','semantic','[]','null','2024-01-01T00:00:00Z','2024-01-01T00:00:00Z','2024-01-01T00:00:00Z'),
                    ('b',0,'y','h2','semantic','[]','null','2024-01-01T00:00:00Z','2024-01-01T00:00:00Z','2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn insert_then_reinforce_caps_at_max() {
        let db = SqliteDb::open_in_memory().unwrap();
        seed_memories(&db).await;
        let now = chrono::Utc::now();
        let w = Waypoint {
            src_id: "a".to_string(),
            dst_id: "b".to_string(),
            user_id: None,
            weight: 0.95,
            created_at: now,
            updated_at: now,
        };
        db.upsert_reinforce(&w, 0.1, 1.0).await.unwrap();
        db.upsert_reinforce(&w, 0.1, 1.0).await.unwrap();
        let neighbors = db.neighbors("a", None).await.unwrap();
        assert_eq!(neighbors.len(), 1);
        assert!(neighbors[0].weight <= 1.0);
    }

    #[tokio::test]
    async fn self_edge_rejected() {
        let db = SqliteDb::open_in_memory().unwrap();
        let now = chrono::Utc::now();
        let w = Waypoint {
            src_id: "a".to_string(),
            dst_id: "a".to_string(),
            user_id: None,
            weight: 0.5,
            created_at: now,
            updated_at: now,
        };
        assert!(db.upsert_reinforce(&w, 0.1, 1.0).await.is_err());
    }
}
