use async_trait::async_trait;
use tokio_postgres::Row;

use openmemory_core::errors::{OpenMemoryResult, StorageError};
use openmemory_core::models::{Sector, StoredVector};
use openmemory_core::traits::VectorRepository;

use super::PgDb;

fn encode_f32_vec(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_f32_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn row_to_vector(row: &Row) -> StoredVector {
    let sector_str: String = row.get("sector");
    let bytes: Vec<u8> = row.get("vec");
    StoredVector {
        memory_id: row.get("memory_id"),
        sector: sector_str.parse().unwrap_or(Sector::Semantic),
        user_id: row.get("user_id"),
        vec: decode_f32_vec(&bytes),
        dim: row.get::<_, i64>("dim") as usize,
        metadata: row
            .get::<_, Option<String>>("metadata")
            .and_then(|s| serde_json::from_str(&s).ok()),
    }
}

/// Shared by `store_vectors` and [`super::memory_tx`]'s atomic write.
pub(crate) async fn insert_vector_rows<C: tokio_postgres::GenericClient>(
    client: &C,
    vectors: &[StoredVector],
) -> Result<(), StorageError> {
    for v in vectors {
        let sector = v.sector.as_str();
        let bytes = encode_f32_vec(&v.vec);
        let dim = v.dim as i64;
        let metadata = v.metadata.as_ref().map(|m| m.to_string());
        client
            .execute(
                "INSERT INTO vectors (memory_id, sector, user_id, vec, dim, metadata)
                 VALUES ($1,$2,$3,$4,$5,$6)
                 ON CONFLICT (memory_id, sector) DO UPDATE SET
                    user_id=excluded.user_id, vec=excluded.vec, dim=excluded.dim, metadata=excluded.metadata",
                &[&v.memory_id, &sector, &v.user_id, &bytes, &dim, &metadata],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
    }
    Ok(())
}

#[async_trait]
impl VectorRepository for PgDb {
    async fn store_vector(&self, vector: &StoredVector) -> OpenMemoryResult<()> {
        self.store_vectors(std::slice::from_ref(vector)).await
    }

    async fn store_vectors(&self, vectors: &[StoredVector]) -> OpenMemoryResult<()> {
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        insert_vector_rows(&tx, vectors).await?;
        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get_vectors_by_ids(&self, ids: &[String]) -> OpenMemoryResult<Vec<StoredVector>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let client = self.client().await?;
        let rows = client
            .query("SELECT * FROM vectors WHERE memory_id = ANY($1)", &[&ids])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(rows.iter().map(row_to_vector).collect())
    }

    async fn search_similar(
        &self,
        sector: Sector,
        query: &[f32],
        top_k: usize,
        user_id: Option<&str>,
    ) -> OpenMemoryResult<Vec<(String, f64)>> {
        let client = self.client().await?;
        let sector_str = sector.as_str();
        let rows = client
            .query(
                "SELECT memory_id, vec FROM vectors
                 WHERE sector = $1 AND COALESCE(user_id,'') = COALESCE($2,'')",
                &[&sector_str, &user_id],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let candidates: Vec<(String, Vec<f32>)> = rows
            .iter()
            .map(|r| {
                let id: String = r.get(0);
                let bytes: Vec<u8> = r.get(1);
                (id, decode_f32_vec(&bytes))
            })
            .collect();

        Ok(openmemory_vector::batch_top_k(query, &candidates, top_k))
    }

    async fn delete_vectors(&self, memory_id: &str) -> OpenMemoryResult<()> {
        let client = self.client().await?;
        client
            .execute("DELETE FROM vectors WHERE memory_id=$1", &[&memory_id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete_vectors_by_user(&self, user_id: &str) -> OpenMemoryResult<u64> {
        let client = self.client().await?;
        let n = client
            .execute("DELETE FROM vectors WHERE user_id=$1", &[&user_id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n)
    }

    async fn cleanup_orphaned(&self) -> OpenMemoryResult<u64> {
        let client = self.client().await?;
        let n = client
            .execute(
                "DELETE FROM vectors WHERE memory_id NOT IN (SELECT id FROM memories)",
                &[],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n)
    }
}
