use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, StorageError};
use openmemory_core::models::{Memory, Sector};
use openmemory_core::traits::MemoryRepository;

use super::SqliteDb;

pub(crate) fn encode_f32_vec(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

pub(crate) fn decode_f32_vec(bytes: &[u8]) -> Vec<f32> {
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

/// Hydrate a `memories` row: decode JSON columns, coerce RFC3339
/// timestamps, leave `content` as-is (decryption happens in
/// `openmemory-memory`, which knows the active key).
pub fn row_to_memory(row: &Row) -> rusqlite::Result<Memory> {
    let tags_json: String = row.get("tags")?;
    let tags: BTreeSet<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    let metadata_json: String = row.get("metadata")?;
    let metadata = serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null);
    let sector_str: String = row.get("primary_sector")?;
    let primary_sector = sector_str.parse::<Sector>().unwrap_or(Sector::Semantic);
    let mean_vec: Option<Vec<u8>> = row.get("mean_vec")?;
    let mean_vec = mean_vec.map(|b| decode_f32_vec(&b)).unwrap_or_default();

    Ok(Memory {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        segment: row.get("segment")?,
        content: row.get("content")?,
        simhash: row.get("simhash")?,
        primary_sector,
        tags,
        metadata,
        created_at: parse_ts(&row.get::<_, String>("created_at")?),
        updated_at: parse_ts(&row.get::<_, String>("updated_at")?),
        last_seen_at: parse_ts(&row.get::<_, String>("last_seen_at")?),
        salience: row.get("salience")?,
        decay_lambda: row.get("decay_lambda")?,
        version: row.get::<_, i64>("version")? as u64,
        mean_dim: row.get::<_, i64>("mean_dim")? as usize,
        mean_vec,
        compressed_vec: row.get("compressed_vec")?,
        feedback_score: row.get("feedback_score")?,
        generated_summary: row.get("generated_summary")?,
        coactivations: row.get::<_, i64>("coactivations")? as u64,
        encryption_key_version: row.get::<_, i64>("encryption_key_version")? as u32,
        archived: row.get::<_, i64>("archived")? != 0,
    })
}

/// Shared by the plain `insert` call and [`super::memory_tx`]'s atomic
/// multi-repository write. Takes anything that derefs to `Connection` so
/// it runs the same whether called directly or through an open
/// `rusqlite::Transaction`.
pub(crate) fn insert_row(conn: &rusqlite::Connection, memory: &Memory) -> Result<(), StorageError> {
    let m = memory.clone_for_write();
    conn.execute(
        "INSERT INTO memories (
            id, user_id, segment, content, simhash, primary_sector, tags, metadata,
            created_at, updated_at, last_seen_at, salience, decay_lambda, version,
            mean_dim, mean_vec, compressed_vec, feedback_score, generated_summary,
            coactivations, encryption_key_version, archived
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22)",
        params![
            m.id, m.user_id, m.segment, m.content, m.simhash, m.primary_sector.as_str(),
            m.tags_json, m.metadata_json, m.created_at, m.updated_at, m.last_seen_at,
            m.salience, m.decay_lambda, m.version as i64, m.mean_dim as i64, m.mean_vec_bytes,
            m.compressed_vec, m.feedback_score, m.generated_summary, m.coactivations as i64,
            m.encryption_key_version as i64, m.archived as i64,
        ],
    )
    .map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl MemoryRepository for SqliteDb {
    async fn insert(&self, memory: &Memory) -> OpenMemoryResult<()> {
        let memory = memory.clone();
        self.with_conn(move |conn| insert_row(conn, &memory))
            .await
            .map_err(OpenMemoryError::from)
    }

    async fn update(&self, memory: &Memory) -> OpenMemoryResult<()> {
        let m = memory.clone_for_write();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE memories SET content=?2, simhash=?3, primary_sector=?4, tags=?5,
                    metadata=?6, updated_at=?7, last_seen_at=?8, salience=?9, decay_lambda=?10,
                    version=?11, mean_dim=?12, mean_vec=?13, compressed_vec=?14, feedback_score=?15,
                    generated_summary=?16, coactivations=?17, encryption_key_version=?18, archived=?19
                 WHERE id=?1",
                params![
                    m.id, m.content, m.simhash, m.primary_sector.as_str(), m.tags_json,
                    m.metadata_json, m.updated_at, m.last_seen_at, m.salience, m.decay_lambda,
                    m.version as i64, m.mean_dim as i64, m.mean_vec_bytes, m.compressed_vec,
                    m.feedback_score, m.generated_summary, m.coactivations as i64,
                    m.encryption_key_version as i64, m.archived as i64,
                ],
            )
            .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn get(&self, id: &str) -> OpenMemoryResult<Option<Memory>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row("SELECT * FROM memories WHERE id = ?1", params![id], |row| {
                row_to_memory(row)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(StorageError::Backend(e.to_string())),
            })
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn get_by_ids(&self, ids: &[String]) -> OpenMemoryResult<Vec<Memory>> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            if ids.is_empty() {
                return Ok(vec![]);
            }
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "SELECT * FROM memories WHERE id IN ({})",
                placeholders.join(",")
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), row_to_memory)
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

    async fn get_by_simhash(
        &self,
        user_id: Option<&str>,
        simhash: &str,
    ) -> OpenMemoryResult<Option<Memory>> {
        let user_id = user_id.map(|s| s.to_string());
        let simhash = simhash.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT * FROM memories WHERE COALESCE(user_id,'') = COALESCE(?1,'') AND simhash = ?2",
                params![user_id, simhash],
                row_to_memory,
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

    async fn delete(&self, id: &str) -> OpenMemoryResult<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM waypoints WHERE src_id=?1 OR dst_id=?1", params![id])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            conn.execute("DELETE FROM memories WHERE id=?1", params![id])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn delete_all_for_user(&self, user_id: &str) -> OpenMemoryResult<u64> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM temporal_facts WHERE user_id=?1", params![user_id])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            conn.execute("DELETE FROM temporal_edges WHERE user_id=?1", params![user_id])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            conn.execute("DELETE FROM waypoints WHERE user_id=?1", params![user_id])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let n = conn
                .execute("DELETE FROM memories WHERE user_id=?1", params![user_id])
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(n as u64)
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn count_for_user(&self, user_id: Option<&str>) -> OpenMemoryResult<u64> {
        let user_id = user_id.map(|s| s.to_string());
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE COALESCE(user_id,'') = COALESCE(?1,'')",
                params![user_id],
                |r| r.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn recent_for_user(&self, user_id: Option<&str>, limit: usize) -> OpenMemoryResult<Vec<Memory>> {
        let user_id = user_id.map(|s| s.to_string());
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM memories WHERE COALESCE(user_id,'') = COALESCE(?1,'')
                     ORDER BY last_seen_at DESC LIMIT ?2",
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![user_id, limit as i64], row_to_memory)
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

    async fn total_count(&self) -> OpenMemoryResult<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn list_page(&self, offset: u64, limit: u64) -> OpenMemoryResult<Vec<Memory>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM memories ORDER BY id LIMIT ?1 OFFSET ?2")
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![limit as i64, offset as i64], row_to_memory)
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
}

/// Pre-serialized, `'static`-owned form of a [`Memory`] ready to move into
/// a `spawn_blocking` closure.
struct WritableMemory {
    id: String,
    user_id: Option<String>,
    segment: i64,
    content: String,
    simhash: String,
    primary_sector: Sector,
    tags_json: String,
    metadata_json: String,
    created_at: String,
    updated_at: String,
    last_seen_at: String,
    salience: f64,
    decay_lambda: f64,
    version: u64,
    mean_dim: usize,
    mean_vec_bytes: Vec<u8>,
    compressed_vec: Option<Vec<u8>>,
    feedback_score: f64,
    generated_summary: String,
    coactivations: u64,
    encryption_key_version: u32,
    archived: bool,
}

trait MemoryExt {
    fn clone_for_write(&self) -> WritableMemory;
}

impl MemoryExt for Memory {
    fn clone_for_write(&self) -> WritableMemory {
        WritableMemory {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            segment: self.segment,
            content: self.content.clone(),
            simhash: self.simhash.clone(),
            primary_sector: self.primary_sector,
            tags_json: serde_json::to_string(&self.tags).unwrap_or_else(|_| "[]".to_string()),
            metadata_json: serde_json::to_string(&self.metadata).unwrap_or_else(|_| "null".to_string()),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
            last_seen_at: self.last_seen_at.to_rfc3339(),
            salience: self.salience,
            decay_lambda: self.decay_lambda,
            version: self.version,
            mean_dim: self.mean_dim,
            mean_vec_bytes: encode_f32_vec(&self.mean_vec),
            compressed_vec: self.compressed_vec.clone(),
            feedback_score: self.feedback_score,
            generated_summary: self.generated_summary.clone(),
            coactivations: self.coactivations,
            encryption_key_version: self.encryption_key_version,
            archived: self.archived,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn sample_memory(id: &str) -> Memory {
        let now = Utc::now();
        Memory {
            id: id.to_string(),
            user_id: Some("u1".to_string()),
            segment: 0,
            content: "hello world".to_string(),
            simhash: "abc123".to_string(),
            primary_sector: Sector::Semantic,
            tags: BTreeSet::new(),
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
            last_seen_at: now,
            salience: 1.0,
            decay_lambda: 0.005,
            version: 1,
            mean_dim: 3,
            mean_vec: vec![0.1, 0.2, 0.3],
            compressed_vec: None,
            feedback_score: 0.0,
            generated_summary: String::new(),
            coactivations: 1,
            encryption_key_version: 0,
            archived: false,
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let db = SqliteDb::open_in_memory().unwrap();
        let m = sample_memory("m1");
        db.insert(&m).await.unwrap();
        let fetched = db.get("m1").await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello world");
        assert_eq!(fetched.mean_vec, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn simhash_lookup_scopes_by_user() {
        let db = SqliteDb::open_in_memory().unwrap();
        let m = sample_memory("m1");
        db.insert(&m).await.unwrap();
        assert!(db.get_by_simhash(Some("u1"), "abc123").await.unwrap().is_some());
        assert!(db.get_by_simhash(Some("u2"), "abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let db = SqliteDb::open_in_memory().unwrap();
        let m = sample_memory("m1");
        db.insert(&m).await.unwrap();
        db.delete("m1").await.unwrap();
        assert!(db.get("m1").await.unwrap().is_none());
    }
}
