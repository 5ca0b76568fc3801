use async_trait::async_trait;
use rusqlite::params;

use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, StorageError};
use openmemory_core::models::{Sector, StoredVector};
use openmemory_core::traits::VectorRepository;

use super::memory_repo::{decode_f32_vec, encode_f32_vec};
use super::SqliteDb;

fn row_to_vector(row: &rusqlite::Row) -> rusqlite::Result<StoredVector> {
    let sector_str: String = row.get("sector")?;
    let bytes: Vec<u8> = row.get("vec")?;
    Ok(StoredVector {
        memory_id: row.get("memory_id")?,
        sector: sector_str.parse().unwrap_or(Sector::Semantic),
        user_id: row.get("user_id")?,
        vec: decode_f32_vec(&bytes),
        dim: row.get::<_, i64>("dim")? as usize,
        metadata: row
            .get::<_, Option<String>>("metadata")?
            .and_then(|s| serde_json::from_str(&s).ok()),
    })
}

/// Shared by `store_vectors` and [`super::memory_tx`]'s atomic write.
/// Takes anything that derefs to `Connection` so it runs the same inside
/// a plain connection or an open `rusqlite::Transaction`.
pub(crate) fn insert_vector_rows(conn: &rusqlite::Connection, vectors: &[StoredVector]) -> Result<(), StorageError> {
    for v in vectors {
        conn.execute(
            "INSERT INTO vectors (memory_id, sector, user_id, vec, dim, metadata)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(memory_id, sector) DO UPDATE SET
                user_id=excluded.user_id, vec=excluded.vec, dim=excluded.dim, metadata=excluded.metadata",
            params![
                v.memory_id,
                v.sector.as_str(),
                v.user_id,
                encode_f32_vec(&v.vec),
                v.dim as i64,
                v.metadata.as_ref().map(|m| m.to_string()),
            ],
        )
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    }
    Ok(())
}

#[async_trait]
impl VectorRepository for SqliteDb {
    async fn store_vector(&self, vector: &StoredVector) -> OpenMemoryResult<()> {
        self.store_vectors(std::slice::from_ref(vector)).await
    }

    async fn store_vectors(&self, vectors: &[StoredVector]) -> OpenMemoryResult<()> {
        let vectors = vectors.to_vec();
        self.with_conn(move |conn| {
            // One transaction for the whole batch: a mid-batch failure
            // must not leave only some rows of this call committed.
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            insert_vector_rows(&tx, &vectors)?;
            tx.commit().map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn get_vectors_by_ids(&self, ids: &[String]) -> OpenMemoryResult<Vec<StoredVector>> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            if ids.is_empty() {
                return Ok(vec![]);
            }
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "SELECT * FROM vectors WHERE memory_id IN ({})",
                placeholders.join(",")
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), row_to_vector)
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

    async fn search_similar(
        &self,
        sector: Sector,
        query: &[f32],
        top_k: usize,
        user_id: Option<&str>,
    ) -> OpenMemoryResult<Vec<(String, f64)>> {
        let sector_str = sector.as_str().to_string();
        let user_id = user_id.map(|s| s.to_string());
        let query = query.to_vec();

        let candidates: Vec<(String, Vec<f32>)> = self
            .with_conn(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT memory_id, vec FROM vectors
                         WHERE sector = ?1 AND COALESCE(user_id,'') = COALESCE(?2,'')",
                    )
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                let rows = stmt
                    .query_map(params![sector_str, user_id], |row| {
                        let id: String = row.get(0)?;
                        let bytes: Vec<u8> = row.get(1)?;
                        Ok((id, decode_f32_vec(&bytes)))
                    })
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                let mut out = Vec::new();
                for r in rows {
                    out.push(r.map_err(|e| StorageError::Backend(e.to_string()))?);
                }
                Ok(out)
            })
            .await
            .map_err(OpenMemoryError::from)?;

        Ok(openmemory_vector::batch_top_k(&query, &candidates, top_k))
    }

    async fn delete_vectors(&self, memory_id: &str) -> OpenMemoryResult<()> {
        let memory_id = memory_id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM vectors WHERE memory_id=?1", params![memory_id])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn delete_vectors_by_user(&self, user_id: &str) -> OpenMemoryResult<u64> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let n = conn
                .execute("DELETE FROM vectors WHERE user_id=?1", params![user_id])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(n as u64)
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn cleanup_orphaned(&self) -> OpenMemoryResult<u64> {
        self.with_conn(|conn| {
            let n = conn
                .execute(
                    "DELETE FROM vectors WHERE memory_id NOT IN (SELECT id FROM memories)",
                    [],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(n as u64)
        })
        .await
        .map_err(OpenMemoryError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_search_orders_by_cosine() {
        let db = SqliteDb::open_in_memory().unwrap();
        // parent rows required by the FK
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

        db.store_vectors(&[
            StoredVector::new("a", Sector::Semantic, vec![1.0, 0.0]),
            StoredVector::new("b", Sector::Semantic, vec![0.0, 1.0]),
        ])
        .await
        .unwrap();

        let results = db
            .search_similar(Sector::Semantic, &[1.0, 0.0], 2, None)
            .await
            .unwrap();
        assert_eq!(results[0].0, "a");
    }
}
