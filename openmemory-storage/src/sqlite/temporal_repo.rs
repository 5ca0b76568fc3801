use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;

use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, StorageError};
use openmemory_core::models::{TemporalAuditEvent, TemporalEdge, TemporalFact};
use openmemory_core::traits::TemporalRepository;

use super::SqliteDb;

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_fact(row: &rusqlite::Row) -> rusqlite::Result<TemporalFact> {
    let metadata: String = row.get("metadata")?;
    Ok(TemporalFact {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        subject: row.get("subject")?,
        predicate: row.get("predicate")?,
        object: row.get("object")?,
        valid_from: parse_ts(&row.get::<_, String>("valid_from")?),
        valid_to: row
            .get::<_, Option<String>>("valid_to")?
            .map(|s| parse_ts(&s)),
        confidence: row.get("confidence")?,
        last_updated: parse_ts(&row.get::<_, String>("last_updated")?),
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<TemporalEdge> {
    let metadata: String = row.get("metadata")?;
    Ok(TemporalEdge {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        source_id: row.get("source_id")?,
        target_id: row.get("target_id")?,
        relation_type: row.get("relation_type")?,
        valid_from: parse_ts(&row.get::<_, String>("valid_from")?),
        valid_to: row
            .get::<_, Option<String>>("valid_to")?
            .map(|s| parse_ts(&s)),
        weight: row.get("weight")?,
        last_updated: parse_ts(&row.get::<_, String>("last_updated")?),
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    })
}

#[async_trait]
impl TemporalRepository for SqliteDb {
    async fn upsert_fact(&self, fact: TemporalFact) -> OpenMemoryResult<TemporalFact> {
        self.with_conn(move |conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| StorageError::Transaction(e.to_string()))?;

            let exact: Option<(String, f64)> = tx
                .query_row(
                    "SELECT id, confidence FROM temporal_facts
                     WHERE COALESCE(user_id,'') = COALESCE(?1,'') AND subject=?2 AND predicate=?3
                        AND object=?4 AND valid_to IS NULL",
                    params![fact.user_id, fact.subject, fact.predicate, fact.object],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .ok();

            if let Some((id, prev_confidence)) = exact {
                let confidence = prev_confidence.max(fact.confidence);
                let now = Utc::now().to_rfc3339();
                tx.execute(
                    "UPDATE temporal_facts SET confidence=?2, last_updated=?3 WHERE id=?1",
                    params![id, confidence, now],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
                let updated = tx
                    .query_row("SELECT * FROM temporal_facts WHERE id=?1", params![id], row_to_fact)
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                tx.commit().map_err(|e| StorageError::Transaction(e.to_string()))?;
                return Ok(updated);
            }

            let open: Option<String> = tx
                .query_row(
                    "SELECT id FROM temporal_facts
                     WHERE COALESCE(user_id,'') = COALESCE(?1,'') AND subject=?2 AND predicate=?3
                        AND valid_to IS NULL",
                    params![fact.user_id, fact.subject, fact.predicate],
                    |r| r.get(0),
                )
                .ok();

            if let Some(open_id) = open {
                tx.execute(
                    "UPDATE temporal_facts SET valid_to=?2 WHERE id=?1",
                    params![open_id, fact.valid_from.to_rfc3339()],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            }

            let metadata_json = fact.metadata.to_string();
            tx.execute(
                "INSERT INTO temporal_facts
                    (id, user_id, subject, predicate, object, valid_from, valid_to, confidence, last_updated, metadata)
                 VALUES (?1,?2,?3,?4,?5,?6,NULL,?7,?8,?9)",
                params![
                    fact.id, fact.user_id, fact.subject, fact.predicate, fact.object,
                    fact.valid_from.to_rfc3339(), fact.confidence, fact.last_updated.to_rfc3339(), metadata_json,
                ],
            )
            .map_err(|e| StorageError::Backend(e.to_string()))?;

            tx.commit().map_err(|e| StorageError::Transaction(e.to_string()))?;
            Ok(fact)
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn facts_at_time(
        &self,
        user_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> OpenMemoryResult<Vec<TemporalFact>> {
        let user_id = user_id.map(|s| s.to_string());
        let at_str = at.to_rfc3339();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM temporal_facts
                     WHERE COALESCE(user_id,'') = COALESCE(?1,'')
                        AND valid_from <= ?2 AND (valid_to IS NULL OR valid_to > ?2)
                     ORDER BY confidence DESC, valid_from DESC",
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![user_id, at_str], row_to_fact)
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

    async fn upsert_edge(&self, edge: TemporalEdge) -> OpenMemoryResult<TemporalEdge> {
        self.with_conn(move |conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| StorageError::Transaction(e.to_string()))?;

            let open: Option<String> = tx
                .query_row(
                    "SELECT id FROM temporal_edges
                     WHERE COALESCE(user_id,'') = COALESCE(?1,'') AND source_id=?2 AND target_id=?3
                        AND relation_type=?4 AND valid_to IS NULL",
                    params![edge.user_id, edge.source_id, edge.target_id, edge.relation_type],
                    |r| r.get(0),
                )
                .ok();

            if let Some(open_id) = open {
                tx.execute(
                    "UPDATE temporal_edges SET valid_to=?2 WHERE id=?1",
                    params![open_id, edge.valid_from.to_rfc3339()],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            }

            let metadata_json = edge.metadata.to_string();
            tx.execute(
                "INSERT INTO temporal_edges
                    (id, user_id, source_id, target_id, relation_type, valid_from, valid_to, weight, last_updated, metadata)
                 VALUES (?1,?2,?3,?4,?5,?6,NULL,?7,?8,?9)",
                params![
                    edge.id, edge.user_id, edge.source_id, edge.target_id, edge.relation_type,
                    edge.valid_from.to_rfc3339(), edge.weight, edge.last_updated.to_rfc3339(), metadata_json,
                ],
            )
            .map_err(|e| StorageError::Backend(e.to_string()))?;

            tx.commit().map_err(|e| StorageError::Transaction(e.to_string()))?;
            Ok(edge)
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn edges_at_time(
        &self,
        user_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> OpenMemoryResult<Vec<TemporalEdge>> {
        let user_id = user_id.map(|s| s.to_string());
        let at_str = at.to_rfc3339();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM temporal_edges
                     WHERE COALESCE(user_id,'') = COALESCE(?1,'')
                        AND valid_from <= ?2 AND (valid_to IS NULL OR valid_to > ?2)
                     ORDER BY weight DESC, valid_from DESC",
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![user_id, at_str], row_to_edge)
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

    async fn record_event(&self, event: TemporalAuditEvent) -> OpenMemoryResult<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO temporal_events
                    (id, entity_type, entity_id, event_type, recorded_at, actor_kind, actor_id, delta)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![
                    event.id, event.entity_type, event.entity_id, event.event_type,
                    event.recorded_at.to_rfc3339(), event.actor_kind, event.actor_id,
                    event.delta.to_string(),
                ],
            )
            .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(OpenMemoryError::from)
    }

    async fn get_events(&self, entity_type: &str, entity_id: &str) -> OpenMemoryResult<Vec<TemporalAuditEvent>> {
        let entity_type = entity_type.to_string();
        let entity_id = entity_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM temporal_events WHERE entity_type=?1 AND entity_id=?2
                     ORDER BY recorded_at ASC",
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![entity_type, entity_id], |row| {
                    let delta: String = row.get("delta")?;
                    Ok(TemporalAuditEvent {
                        id: row.get("id")?,
                        entity_type: row.get("entity_type")?,
                        entity_id: row.get("entity_id")?,
                        event_type: row.get("event_type")?,
                        recorded_at: parse_ts(&row.get::<_, String>("recorded_at")?),
                        actor_kind: row.get("actor_kind")?,
                        actor_id: row.get("actor_id")?,
                        delta: serde_json::from_str(&delta).unwrap_or(serde_json::Value::Null),
                    })
                })
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

    async fn stale_open_facts(&self, before: DateTime<Utc>) -> OpenMemoryResult<Vec<TemporalFact>> {
        let before_str = before.to_rfc3339();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM temporal_facts WHERE valid_to IS NULL AND last_updated < ?1",
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![before_str], row_to_fact)
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

    async fn set_fact_confidence(
        &self,
        id: &str,
        confidence: f64,
        valid_to: Option<DateTime<Utc>>,
    ) -> OpenMemoryResult<()> {
        let id = id.to_string();
        let valid_to_str = valid_to.map(|t| t.to_rfc3339());
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE temporal_facts SET confidence=?2, valid_to=?3 WHERE id=?1",
                params![id, confidence, valid_to_str],
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
    use serde_json::json;

    fn fact(id: &str, subject: &str, predicate: &str, object: &str, t: DateTime<Utc>) -> TemporalFact {
        TemporalFact {
            id: id.to_string(),
            user_id: Some("u1".to_string()),
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            valid_from: t,
            valid_to: None,
            confidence: 0.9,
            last_updated: t,
            metadata: json!(null),
        }
    }

    #[tokio::test]
    async fn supersession_closes_prior_open_fact() {
        let db = SqliteDb::open_in_memory().unwrap();
        let t1 = "2024-01-01T00:00:00Z".parse().unwrap();
        let t2 = "2024-01-02T00:00:00Z".parse().unwrap();

        db.upsert_fact(fact("f1", "Alice", "role", "engineer", t1)).await.unwrap();
        db.upsert_fact(fact("f2", "Alice", "role", "manager", t2)).await.unwrap();

        let mid: DateTime<Utc> = "2024-01-01T12:00:00Z".parse().unwrap();
        let at_mid = db.facts_at_time(Some("u1"), mid).await.unwrap();
        assert_eq!(at_mid.len(), 1);
        assert_eq!(at_mid[0].object, "engineer");

        let later: DateTime<Utc> = "2024-01-03T00:00:00Z".parse().unwrap();
        let at_later = db.facts_at_time(Some("u1"), later).await.unwrap();
        assert_eq!(at_later.len(), 1);
        assert_eq!(at_later[0].object, "manager");
    }

    #[tokio::test]
    async fn exact_repeat_raises_confidence_without_new_row() {
        let db = SqliteDb::open_in_memory().unwrap();
        let t1 = "2024-01-01T00:00:00Z".parse().unwrap();
        db.upsert_fact(fact("f1", "Alice", "role", "engineer", t1)).await.unwrap();
        let mut f2 = fact("f2", "Alice", "role", "engineer", t1);
        f2.confidence = 0.99;
        db.upsert_fact(f2).await.unwrap();

        let now = Utc::now();
        let rows = db.facts_at_time(Some("u1"), now).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].confidence - 0.99).abs() < 1e-9);
    }
}
