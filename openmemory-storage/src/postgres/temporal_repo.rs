use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

use openmemory_core::errors::{OpenMemoryResult, StorageError};
use openmemory_core::models::{TemporalAuditEvent, TemporalEdge, TemporalFact};
use openmemory_core::traits::TemporalRepository;

use super::PgDb;

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_fact(row: &Row) -> TemporalFact {
    let metadata: String = row.get("metadata");
    TemporalFact {
        id: row.get("id"),
        user_id: row.get("user_id"),
        subject: row.get("subject"),
        predicate: row.get("predicate"),
        object: row.get("object"),
        valid_from: parse_ts(row.get::<_, &str>("valid_from")),
        valid_to: row.get::<_, Option<&str>>("valid_to").map(parse_ts),
        confidence: row.get("confidence"),
        last_updated: parse_ts(row.get::<_, &str>("last_updated")),
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    }
}

fn row_to_edge(row: &Row) -> TemporalEdge {
    let metadata: String = row.get("metadata");
    TemporalEdge {
        id: row.get("id"),
        user_id: row.get("user_id"),
        source_id: row.get("source_id"),
        target_id: row.get("target_id"),
        relation_type: row.get("relation_type"),
        valid_from: parse_ts(row.get::<_, &str>("valid_from")),
        valid_to: row.get::<_, Option<&str>>("valid_to").map(parse_ts),
        weight: row.get("weight"),
        last_updated: parse_ts(row.get::<_, &str>("last_updated")),
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    }
}

#[async_trait]
impl TemporalRepository for PgDb {
    async fn upsert_fact(&self, fact: TemporalFact) -> OpenMemoryResult<TemporalFact> {
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        let exact = tx
            .query_opt(
                "SELECT id, confidence FROM temporal_facts
                 WHERE COALESCE(user_id,'') = COALESCE($1,'') AND subject=$2 AND predicate=$3
                    AND object=$4 AND valid_to IS NULL",
                &[&fact.user_id, &fact.subject, &fact.predicate, &fact.object],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        if let Some(row) = exact {
            let id: String = row.get(0);
            let prev_confidence: f64 = row.get(1);
            let confidence = prev_confidence.max(fact.confidence);
            let now = Utc::now().to_rfc3339();
            tx.execute(
                "UPDATE temporal_facts SET confidence=$2, last_updated=$3 WHERE id=$1",
                &[&id, &confidence, &now],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
            let updated_row = tx
                .query_one("SELECT * FROM temporal_facts WHERE id=$1", &[&id])
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let updated = row_to_fact(&updated_row);
            tx.commit()
                .await
                .map_err(|e| StorageError::Transaction(e.to_string()))?;
            return Ok(updated);
        }

        let open = tx
            .query_opt(
                "SELECT id FROM temporal_facts
                 WHERE COALESCE(user_id,'') = COALESCE($1,'') AND subject=$2 AND predicate=$3
                    AND valid_to IS NULL",
                &[&fact.user_id, &fact.subject, &fact.predicate],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        if let Some(row) = open {
            let open_id: String = row.get(0);
            tx.execute(
                "UPDATE temporal_facts SET valid_to=$2 WHERE id=$1",
                &[&open_id, &fact.valid_from.to_rfc3339()],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        }

        let metadata_json = fact.metadata.to_string();
        tx.execute(
            "INSERT INTO temporal_facts
                (id, user_id, subject, predicate, object, valid_from, valid_to, confidence, last_updated, metadata)
             VALUES ($1,$2,$3,$4,$5,$6,NULL,$7,$8,$9)",
            &[
                &fact.id, &fact.user_id, &fact.subject, &fact.predicate, &fact.object,
                &fact.valid_from.to_rfc3339(), &fact.confidence, &fact.last_updated.to_rfc3339(),
                &metadata_json,
            ],
        )
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(fact)
    }

    async fn facts_at_time(
        &self,
        user_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> OpenMemoryResult<Vec<TemporalFact>> {
        let client = self.client().await?;
        let at_str = at.to_rfc3339();
        let rows = client
            .query(
                "SELECT * FROM temporal_facts
                 WHERE COALESCE(user_id,'') = COALESCE($1,'')
                    AND valid_from <= $2 AND (valid_to IS NULL OR valid_to > $2)
                 ORDER BY confidence DESC, valid_from DESC",
                &[&user_id, &at_str],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(rows.iter().map(row_to_fact).collect())
    }

    async fn upsert_edge(&self, edge: TemporalEdge) -> OpenMemoryResult<TemporalEdge> {
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        let open = tx
            .query_opt(
                "SELECT id FROM temporal_edges
                 WHERE COALESCE(user_id,'') = COALESCE($1,'') AND source_id=$2 AND target_id=$3
                    AND relation_type=$4 AND valid_to IS NULL",
                &[&edge.user_id, &edge.source_id, &edge.target_id, &edge.relation_type],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        if let Some(row) = open {
            let open_id: String = row.get(0);
            tx.execute(
                "UPDATE temporal_edges SET valid_to=$2 WHERE id=$1",
                &[&open_id, &edge.valid_from.to_rfc3339()],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        }

        let metadata_json = edge.metadata.to_string();
        tx.execute(
            "INSERT INTO temporal_edges
                (id, user_id, source_id, target_id, relation_type, valid_from, valid_to, weight, last_updated, metadata)
             VALUES ($1,$2,$3,$4,$5,$6,NULL,$7,$8,$9)",
            &[
                &edge.id, &edge.user_id, &edge.source_id, &edge.target_id, &edge.relation_type,
                &edge.valid_from.to_rfc3339(), &edge.weight, &edge.last_updated.to_rfc3339(),
                &metadata_json,
            ],
        )
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(edge)
    }

    async fn edges_at_time(
        &self,
        user_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> OpenMemoryResult<Vec<TemporalEdge>> {
        let client = self.client().await?;
        let at_str = at.to_rfc3339();
        let rows = client
            .query(
                "SELECT * FROM temporal_edges
                 WHERE COALESCE(user_id,'') = COALESCE($1,'')
                    AND valid_from <= $2 AND (valid_to IS NULL OR valid_to > $2)
                 ORDER BY weight DESC, valid_from DESC",
                &[&user_id, &at_str],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(rows.iter().map(row_to_edge).collect())
    }

    async fn record_event(&self, event: TemporalAuditEvent) -> OpenMemoryResult<()> {
        let client = self.client().await?;
        let delta_json = event.delta.to_string();
        client
            .execute(
                "INSERT INTO temporal_events
                    (id, entity_type, entity_id, event_type, recorded_at, actor_kind, actor_id, delta)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
                &[
                    &event.id, &event.entity_type, &event.entity_id, &event.event_type,
                    &event.recorded_at.to_rfc3339(), &event.actor_kind, &event.actor_id,
                    &delta_json,
                ],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get_events(&self, entity_type: &str, entity_id: &str) -> OpenMemoryResult<Vec<TemporalAuditEvent>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT * FROM temporal_events WHERE entity_type=$1 AND entity_id=$2
                 ORDER BY recorded_at ASC",
                &[&entity_type, &entity_id],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(rows
            .iter()
            .map(|row| {
                let delta: String = row.get("delta");
                TemporalAuditEvent {
                    id: row.get("id"),
                    entity_type: row.get("entity_type"),
                    entity_id: row.get("entity_id"),
                    event_type: row.get("event_type"),
                    recorded_at: parse_ts(row.get::<_, &str>("recorded_at")),
                    actor_kind: row.get("actor_kind"),
                    actor_id: row.get("actor_id"),
                    delta: serde_json::from_str(&delta).unwrap_or(serde_json::Value::Null),
                }
            })
            .collect())
    }

    async fn stale_open_facts(&self, before: DateTime<Utc>) -> OpenMemoryResult<Vec<TemporalFact>> {
        let client = self.client().await?;
        let before_str = before.to_rfc3339();
        let rows = client
            .query(
                "SELECT * FROM temporal_facts WHERE valid_to IS NULL AND last_updated < $1",
                &[&before_str],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(rows.iter().map(row_to_fact).collect())
    }

    async fn set_fact_confidence(
        &self,
        id: &str,
        confidence: f64,
        valid_to: Option<DateTime<Utc>>,
    ) -> OpenMemoryResult<()> {
        let client = self.client().await?;
        let valid_to_str = valid_to.map(|t| t.to_rfc3339());
        client
            .execute(
                "UPDATE temporal_facts SET confidence=$2, valid_to=$3 WHERE id=$1",
                &[&id, &confidence, &valid_to_str],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
