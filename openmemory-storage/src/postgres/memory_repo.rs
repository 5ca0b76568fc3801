use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, StorageError};
use openmemory_core::models::{Memory, Sector};
use openmemory_core::traits::MemoryRepository;

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

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub fn row_to_memory(row: &Row) -> Result<Memory, StorageError> {
    let tags_json: String = row.get("tags");
    let tags: BTreeSet<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    let metadata_json: String = row.get("metadata");
    let metadata = serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null);
    let sector_str: String = row.get("primary_sector");
    let primary_sector = sector_str.parse::<Sector>().unwrap_or(Sector::Semantic);
    let mean_vec: Option<Vec<u8>> = row.get("mean_vec");
    let mean_vec = mean_vec.map(|b| decode_f32_vec(&b)).unwrap_or_default();

    Ok(Memory {
        id: row.get("id"),
        user_id: row.get("user_id"),
        segment: row.get("segment"),
        content: row.get("content"),
        simhash: row.get("simhash"),
        primary_sector,
        tags,
        metadata,
        created_at: parse_ts(row.get::<_, &str>("created_at")),
        updated_at: parse_ts(row.get::<_, &str>("updated_at")),
        last_seen_at: parse_ts(row.get::<_, &str>("last_seen_at")),
        salience: row.get("salience"),
        decay_lambda: row.get("decay_lambda"),
        version: row.get::<_, i64>("version") as u64,
        mean_dim: row.get::<_, i64>("mean_dim") as usize,
        mean_vec,
        compressed_vec: row.get("compressed_vec"),
        feedback_score: row.get("feedback_score"),
        generated_summary: row.get("generated_summary"),
        coactivations: row.get::<_, i64>("coactivations") as u64,
        encryption_key_version: row.get::<_, i64>("encryption_key_version") as u32,
        archived: row.get("archived"),
    })
}

/// Shared by the plain `insert` call and [`super::memory_tx`]'s atomic
/// write. Generic over `GenericClient` so it runs the same against a
/// bare pooled `Client` or an open `Transaction`.
pub(crate) async fn insert_row<C: tokio_postgres::GenericClient>(
    client: &C,
    memory: &Memory,
) -> Result<(), StorageError> {
    let tags_json = serde_json::to_string(&memory.tags).unwrap_or_else(|_| "[]".to_string());
    let metadata_json =
        serde_json::to_string(&memory.metadata).unwrap_or_else(|_| "null".to_string());
    let mean_vec_bytes = encode_f32_vec(&memory.mean_vec);
    client
        .execute(
            "INSERT INTO memories (
                id, user_id, segment, content, simhash, primary_sector, tags, metadata,
                created_at, updated_at, last_seen_at, salience, decay_lambda, version,
                mean_dim, mean_vec, compressed_vec, feedback_score, generated_summary,
                coactivations, encryption_key_version, archived
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22)",
            &[
                &memory.id,
                &memory.user_id,
                &memory.segment,
                &memory.content,
                &memory.simhash,
                &memory.primary_sector.as_str(),
                &tags_json,
                &metadata_json,
                &memory.created_at.to_rfc3339(),
                &memory.updated_at.to_rfc3339(),
                &memory.last_seen_at.to_rfc3339(),
                &memory.salience,
                &memory.decay_lambda,
                &(memory.version as i64),
                &(memory.mean_dim as i64),
                &mean_vec_bytes,
                &memory.compressed_vec,
                &memory.feedback_score,
                &memory.generated_summary,
                &(memory.coactivations as i64),
                &(memory.encryption_key_version as i64),
                &memory.archived,
            ],
        )
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl MemoryRepository for PgDb {
    async fn insert(&self, memory: &Memory) -> OpenMemoryResult<()> {
        let client = self.client().await?;
        insert_row(&client, memory).await.map_err(OpenMemoryError::from)
    }

    async fn update(&self, memory: &Memory) -> OpenMemoryResult<()> {
        let client = self.client().await?;
        let tags_json = serde_json::to_string(&memory.tags).unwrap_or_else(|_| "[]".to_string());
        let metadata_json =
            serde_json::to_string(&memory.metadata).unwrap_or_else(|_| "null".to_string());
        let mean_vec_bytes = encode_f32_vec(&memory.mean_vec);
        client
            .execute(
                "UPDATE memories SET content=$2, simhash=$3, primary_sector=$4, tags=$5,
                    metadata=$6, updated_at=$7, last_seen_at=$8, salience=$9, decay_lambda=$10,
                    version=$11, mean_dim=$12, mean_vec=$13, compressed_vec=$14, feedback_score=$15,
                    generated_summary=$16, coactivations=$17, encryption_key_version=$18, archived=$19
                 WHERE id=$1",
                &[
                    &memory.id,
                    &memory.content,
                    &memory.simhash,
                    &memory.primary_sector.as_str(),
                    &tags_json,
                    &metadata_json,
                    &memory.updated_at.to_rfc3339(),
                    &memory.last_seen_at.to_rfc3339(),
                    &memory.salience,
                    &memory.decay_lambda,
                    &(memory.version as i64),
                    &(memory.mean_dim as i64),
                    &mean_vec_bytes,
                    &memory.compressed_vec,
                    &memory.feedback_score,
                    &memory.generated_summary,
                    &(memory.coactivations as i64),
                    &(memory.encryption_key_version as i64),
                    &memory.archived,
                ],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> OpenMemoryResult<Option<Memory>> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT * FROM memories WHERE id = $1", &[&id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        row.map(|r| row_to_memory(&r)).transpose().map_err(OpenMemoryError::from)
    }

    async fn get_by_ids(&self, ids: &[String]) -> OpenMemoryResult<Vec<Memory>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let client = self.client().await?;
        let rows = client
            .query("SELECT * FROM memories WHERE id = ANY($1)", &[&ids])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.iter()
            .map(row_to_memory)
            .collect::<Result<Vec<_>, _>>()
            .map_err(OpenMemoryError::from)
    }

    async fn get_by_simhash(
        &self,
        user_id: Option<&str>,
        simhash: &str,
    ) -> OpenMemoryResult<Option<Memory>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT * FROM memories WHERE COALESCE(user_id,'') = COALESCE($1,'') AND simhash = $2",
                &[&user_id, &simhash],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        row.map(|r| row_to_memory(&r)).transpose().map_err(OpenMemoryError::from)
    }

    async fn delete(&self, id: &str) -> OpenMemoryResult<()> {
        let client = self.client().await?;
        client
            .execute("DELETE FROM waypoints WHERE src_id=$1 OR dst_id=$1", &[&id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        client
            .execute("DELETE FROM memories WHERE id=$1", &[&id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &str) -> OpenMemoryResult<u64> {
        let client = self.client().await?;
        client
            .execute("DELETE FROM temporal_facts WHERE user_id=$1", &[&user_id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        client
            .execute("DELETE FROM temporal_edges WHERE user_id=$1", &[&user_id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        client
            .execute("DELETE FROM waypoints WHERE user_id=$1", &[&user_id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let n = client
            .execute("DELETE FROM memories WHERE user_id=$1", &[&user_id])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(n)
    }

    async fn count_for_user(&self, user_id: Option<&str>) -> OpenMemoryResult<u64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM memories WHERE COALESCE(user_id,'') = COALESCE($1,'')",
                &[&user_id],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.get(0);
        Ok(n as u64)
    }

    async fn recent_for_user(&self, user_id: Option<&str>, limit: usize) -> OpenMemoryResult<Vec<Memory>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT * FROM memories WHERE COALESCE(user_id,'') = COALESCE($1,'')
                 ORDER BY last_seen_at DESC LIMIT $2",
                &[&user_id, &(limit as i64)],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.iter()
            .map(row_to_memory)
            .collect::<Result<Vec<_>, _>>()
            .map_err(OpenMemoryError::from)
    }

    async fn total_count(&self) -> OpenMemoryResult<u64> {
        let client = self.client().await?;
        let row = client
            .query_one("SELECT COUNT(*) FROM memories", &[])
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let n: i64 = row.get(0);
        Ok(n as u64)
    }

    async fn list_page(&self, offset: u64, limit: u64) -> OpenMemoryResult<Vec<Memory>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT * FROM memories ORDER BY id LIMIT $1 OFFSET $2",
                &[&(limit as i64), &(offset as i64)],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        rows.iter()
            .map(row_to_memory)
            .collect::<Result<Vec<_>, _>>()
            .map_err(OpenMemoryError::from)
    }
}
