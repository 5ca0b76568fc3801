use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use openmemory_core::config::DecayConfig;
use openmemory_core::errors::OpenMemoryResult;
use openmemory_core::models::{
    Event, EventActor, EventPayload, TemporalAuditEvent, TemporalEdge, TemporalFact,
};
use openmemory_core::traits::{Clock, EventBus, TemporalRepository};

/// A fact as of a point in time, plus the audit events recorded against it —
/// the "what did we believe, and why" query `spec.md` §4.7 implies but does
/// not name (SPEC_FULL.md §4.7's supplement).
#[derive(Debug, Clone)]
pub struct FactReconstruction {
    pub fact: Option<TemporalFact>,
    pub history: Vec<TemporalAuditEvent>,
}

/// Orchestrates `spec.md` §4.7's `insertFact`/`queryFactsAtTime` contract,
/// the mirrored edge operations, the confidence-decay sweep, and the
/// event-sourced audit trail layered on top of the bitemporal rows.
pub struct TemporalService {
    repo: Arc<dyn TemporalRepository>,
    events: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    decay: DecayConfig,
}

const ACTOR: &str = "temporal-graph";

impl TemporalService {
    pub fn new(
        repo: Arc<dyn TemporalRepository>,
        events: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        decay: DecayConfig,
    ) -> Self {
        Self { repo, events, clock, decay }
    }

    async fn emit_and_record(&self, entity_type: &str, entity_id: &str, payload: EventPayload, delta: Value) {
        let event = Event::new(EventActor::System(ACTOR.to_string()), payload);
        let audit = TemporalAuditEvent {
            id: event.event_id.clone(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event_type: event.payload.topic().to_string(),
            recorded_at: event.recorded_at,
            actor_kind: "system".to_string(),
            actor_id: ACTOR.to_string(),
            delta,
        };
        if let Err(err) = self.repo.record_event(audit).await {
            tracing::warn!(error = %err, "failed to append temporal audit event");
        }
        self.events.publish(event).await;
    }

    /// `spec.md` §4.7's `insertFact(subject, predicate, object, validFrom,
    /// confidence, metadata, userId)`.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_fact(
        &self,
        user_id: Option<String>,
        subject: String,
        predicate: String,
        object: String,
        valid_from: DateTime<Utc>,
        confidence: f64,
        metadata: Value,
    ) -> OpenMemoryResult<TemporalFact> {
        let open_same_key: Vec<TemporalFact> = self
            .repo
            .facts_at_time(user_id.as_deref(), valid_from)
            .await?
            .into_iter()
            .filter(|f| f.subject == subject && f.predicate == predicate)
            .collect();
        let exact = open_same_key.iter().find(|f| f.object == object).cloned();
        let prior_open = open_same_key.into_iter().next();

        let fact = TemporalFact {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            subject,
            predicate,
            object,
            valid_from,
            valid_to: None,
            confidence,
            last_updated: valid_from,
            metadata,
        };
        let result = self.repo.upsert_fact(fact).await?;

        if let Some(exact) = exact {
            self.emit_and_record(
                "temporal_fact",
                &result.id,
                EventPayload::TemporalFactUpdated { fact_id: result.id.clone() },
                serde_json::json!({"confidence": result.confidence, "prev_confidence": exact.confidence}),
            )
            .await;
        } else {
            if let Some(prior) = prior_open {
                self.emit_and_record(
                    "temporal_fact",
                    &prior.id,
                    EventPayload::TemporalFactDeleted { fact_id: prior.id.clone() },
                    serde_json::json!({"valid_to": valid_from}),
                )
                .await;
            }
            self.emit_and_record(
                "temporal_fact",
                &result.id,
                EventPayload::TemporalFactCreated { fact_id: result.id.clone() },
                serde_json::json!({"object": result.object, "confidence": result.confidence}),
            )
            .await;
        }

        Ok(result)
    }

    pub async fn facts_at_time(
        &self,
        user_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> OpenMemoryResult<Vec<TemporalFact>> {
        self.repo.facts_at_time(user_id, at).await
    }

    /// `spec.md` §4.7: "Edges mirror facts, keyed by (source, target,
    /// relationType), weighted, with the same open-window invariant."
    pub async fn insert_edge(
        &self,
        user_id: Option<String>,
        source_id: String,
        target_id: String,
        relation_type: String,
        valid_from: DateTime<Utc>,
        weight: f64,
        metadata: Value,
    ) -> OpenMemoryResult<TemporalEdge> {
        let prior_open = self
            .repo
            .edges_at_time(user_id.as_deref(), valid_from)
            .await?
            .into_iter()
            .find(|e| e.source_id == source_id && e.target_id == target_id && e.relation_type == relation_type);

        let edge = TemporalEdge {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            source_id,
            target_id,
            relation_type,
            valid_from,
            valid_to: None,
            weight,
            last_updated: valid_from,
            metadata,
        };
        let result = self.repo.upsert_edge(edge).await?;

        if let Some(prior) = prior_open {
            self.emit_and_record(
                "temporal_edge",
                &prior.id,
                EventPayload::TemporalEdgeDeleted { edge_id: prior.id.clone() },
                serde_json::json!({"valid_to": valid_from}),
            )
            .await;
        }
        self.emit_and_record(
            "temporal_edge",
            &result.id,
            EventPayload::TemporalEdgeCreated { edge_id: result.id.clone() },
            serde_json::json!({"weight": result.weight}),
        )
        .await;

        Ok(result)
    }

    pub async fn edges_at_time(
        &self,
        user_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> OpenMemoryResult<Vec<TemporalEdge>> {
        self.repo.edges_at_time(user_id, at).await
    }

    /// Off-path confidence decay (`spec.md` §4.7): `c' = c ·
    /// exp(-λ_semantic·Δt_days)` applied to facts not updated within
    /// `freshness_window`; closes facts whose decayed confidence drops
    /// below `cold_threshold`. Returns the number of facts closed.
    pub async fn decay_confidence_sweep(&self, freshness_window: Duration) -> OpenMemoryResult<u64> {
        let now = self.clock.now();
        let before = now - freshness_window;
        let stale = self.repo.stale_open_facts(before).await?;
        let mut closed = 0u64;
        for fact in stale {
            let dt_days = (now - fact.last_updated).num_seconds() as f64 / 86_400.0;
            let decayed = fact.confidence * (-self.decay.lambda_semantic * dt_days).exp();
            if decayed < self.decay.cold_threshold {
                self.repo.set_fact_confidence(&fact.id, decayed, Some(now)).await?;
                self.emit_and_record(
                    "temporal_fact",
                    &fact.id,
                    EventPayload::TemporalFactDeleted { fact_id: fact.id.clone() },
                    serde_json::json!({"reason": "confidence_decay", "confidence": decayed}),
                )
                .await;
                closed += 1;
            } else {
                self.repo.set_fact_confidence(&fact.id, decayed, None).await?;
            }
        }
        Ok(closed)
    }

    /// Current row for `(subject, predicate)` as of `as_of`, plus its full
    /// audit history — how we got there, not just where we are.
    pub async fn reconstruct_fact_at(
        &self,
        user_id: Option<&str>,
        subject: &str,
        predicate: &str,
        as_of: DateTime<Utc>,
    ) -> OpenMemoryResult<FactReconstruction> {
        let fact = self
            .repo
            .facts_at_time(user_id, as_of)
            .await?
            .into_iter()
            .find(|f| f.subject == subject && f.predicate == predicate);

        let history = match &fact {
            Some(f) => self.repo.get_events("temporal_fact", &f.id).await?,
            None => Vec::new(),
        };

        Ok(FactReconstruction { fact, history })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use openmemory_core::traits::SystemClock;
    use openmemory_storage::sqlite::SqliteDb;
    use test_fixtures::NullEventBus;

    use super::*;

    fn build() -> TemporalService {
        let db = Arc::new(SqliteDb::open_in_memory().unwrap());
        TemporalService::new(db, Arc::new(NullEventBus), Arc::new(SystemClock), DecayConfig::default())
    }

    #[tokio::test]
    async fn insert_fact_closes_prior_on_conflicting_object() {
        let svc = build();
        let t1 = Utc::now();
        let t2 = t1 + Duration::hours(1);

        svc.insert_fact(
            Some("alice".into()), "alice".into(), "role".into(), "engineer".into(),
            t1, 0.9, Value::Null,
        ).await.unwrap();
        svc.insert_fact(
            Some("alice".into()), "alice".into(), "role".into(), "manager".into(),
            t2, 0.9, Value::Null,
        ).await.unwrap();

        let at_t2 = svc.facts_at_time(Some("alice"), t2).await.unwrap();
        assert_eq!(at_t2.len(), 1);
        assert_eq!(at_t2[0].object, "manager");
    }

    #[tokio::test]
    async fn reconstruct_fact_at_returns_history() {
        let svc = build();
        let t1 = Utc::now();
        let fact = svc
            .insert_fact(
                Some("bob".into()), "bob".into(), "role".into(), "engineer".into(),
                t1, 0.8, Value::Null,
            )
            .await
            .unwrap();

        let recon = svc.reconstruct_fact_at(Some("bob"), "bob", "role", t1).await.unwrap();
        assert_eq!(recon.fact.unwrap().id, fact.id);
        assert!(!recon.history.is_empty());
    }

    #[tokio::test]
    async fn decay_sweep_closes_low_confidence_stale_facts() {
        let svc = build();
        let t1 = Utc::now() - Duration::days(3650);
        svc.insert_fact(
            Some("carol".into()), "carol".into(), "mood".into(), "happy".into(),
            t1, 0.5, Value::Null,
        ).await.unwrap();

        let closed = svc.decay_confidence_sweep(Duration::hours(1)).await.unwrap();
        assert_eq!(closed, 1);
    }
}
