use async_trait::async_trait;
use rusqlite::params;

use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, StorageError};
use openmemory_core::models::ClassifierHead;
use openmemory_core::traits::ClassifierHeadRepository;

use super::SqliteDb;

fn row_to_head(row: &rusqlite::Row) -> rusqlite::Result<ClassifierHead> {
    let weights_json: String = row.get("weights")?;
    let bias_json: String = row.get("bias")?;
    Ok(ClassifierHead {
        dim: row.get::<_, i64>("dim")? as usize,
        weights: serde_json::from_str(&weights_json).unwrap_or_default(),
        bias: serde_json::from_str(&bias_json).unwrap_or_default(),
        version: row.get::<_, i64>("version")? as u64,
        learning_rate: row.get("learning_rate")?,
    })
}

#[async_trait]
impl ClassifierHeadRepository for SqliteDb {
    async fn load_head(&self, user_id: Option<&str>) -> OpenMemoryResult<Option<ClassifierHead>> {
        let user_id = user_id.map(|s| s.to_string());
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT dim, weights, bias, version, learning_rate FROM classifier_heads
                 WHERE user_id IS ?1",
                params![user_id],
                row_to_head,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(StorageError::Backend(e.to_string())),
            })
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn save_head(&self, user_id: Option<&str>, head: &ClassifierHead) -> OpenMemoryResult<()> {
        let user_id = user_id.map(|s| s.to_string());
        let dim = head.dim as i64;
        let weights_json = serde_json::to_string(&head.weights).unwrap_or_else(|_| "[]".to_string());
        let bias_json = serde_json::to_string(&head.bias).unwrap_or_else(|_| "[]".to_string());
        let version = head.version as i64;
        let learning_rate = head.learning_rate;

        self.with_conn(move |conn| {
            // SQLite's PRIMARY KEY constraint does not coalesce NULL
            // `user_id` rows for `ON CONFLICT`, so the global head is
            // upserted by hand: UPDATE first, INSERT only if nothing
            // matched.
            let updated = conn
                .execute(
                    "UPDATE classifier_heads SET dim=?2, weights=?3, bias=?4, version=?5, learning_rate=?6
                     WHERE user_id IS ?1",
                    params![user_id, dim, weights_json, bias_json, version, learning_rate],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            if updated == 0 {
                conn.execute(
                    "INSERT INTO classifier_heads (user_id, dim, weights, bias, version, learning_rate)
                     VALUES (?1,?2,?3,?4,?5,?6)",
                    params![user_id, dim, weights_json, bias_json, version, learning_rate],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            }
            Ok(())
        })
        .await
        .map_err(OpenMemoryError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> ClassifierHead {
        ClassifierHead {
            dim: 2,
            weights: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
            bias: vec![0.0, 0.0],
            version: 1,
            learning_rate: 0.1,
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let db = SqliteDb::open_in_memory().unwrap();
        db.save_head(Some("u1"), &head()).await.unwrap();
        let loaded = db.load_head(Some("u1")).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.weights, head().weights);
        assert!(db.load_head(Some("u2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resaving_updates_the_same_row() {
        let db = SqliteDb::open_in_memory().unwrap();
        db.save_head(Some("u1"), &head()).await.unwrap();
        let mut h = head();
        h.version = 2;
        db.save_head(Some("u1"), &h).await.unwrap();
        let loaded = db.load_head(Some("u1")).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
    }
}
