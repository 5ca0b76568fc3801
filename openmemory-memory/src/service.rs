use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use openmemory_classify::{Classifier, LogisticHead};
use openmemory_core::config::OpenMemoryConfig;
use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, ValidationError};
use openmemory_core::models::{Event, EventActor, EventPayload, Memory, Sector, StoredVector};
use openmemory_core::traits::{
    Clock, ClassifierHeadRepository, Embedder, EventBus, MemoryRepository, MemoryWriteTransaction,
    VectorRepository, WaypointRepository,
};

use crate::{simhash, waypoints};

/// Parameters for [`MemoryService::add`] (`spec.md` §4.4).
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub content: String,
    pub user_id: Option<String>,
    pub tags: BTreeSet<String>,
    pub metadata: Value,
    pub sector_override: Option<Sector>,
}

/// Fields an [`MemoryService::update`] call may change; `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdatePatch {
    pub content: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub metadata: Option<Value>,
    pub sector: Option<Sector>,
}

/// Orchestrates ingest/update/delete across the memory, vector and
/// waypoint repositories plus the classifier, embedder and event bus.
pub struct MemoryService {
    memories: Arc<dyn MemoryRepository>,
    vectors: Arc<dyn VectorRepository>,
    waypoint_repo: Arc<dyn WaypointRepository>,
    memory_tx: Arc<dyn MemoryWriteTransaction>,
    classifier_heads: Arc<dyn ClassifierHeadRepository>,
    embedder: Arc<dyn Embedder>,
    events: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    classifier: Classifier,
    config: OpenMemoryConfig,
}

fn normalize_user_id(user_id: Option<String>) -> Option<String> {
    user_id.filter(|s| !s.is_empty())
}

fn mean_vector(vectors: &[openmemory_core::traits::EmbeddedVector]) -> (usize, Vec<f32>) {
    let Some(first) = vectors.first() else {
        return (0, Vec::new());
    };
    let dim = first.dim;
    let mut sum = vec![0f32; dim];
    let mut count = 0usize;
    for v in vectors {
        if v.dim != dim {
            continue;
        }
        for (acc, x) in sum.iter_mut().zip(v.vec.iter()) {
            *acc += x;
        }
        count += 1;
    }
    if count == 0 {
        return (0, Vec::new());
    }
    for x in sum.iter_mut() {
        *x /= count as f32;
    }
    (dim, sum)
}

impl MemoryService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memories: Arc<dyn MemoryRepository>,
        vectors: Arc<dyn VectorRepository>,
        waypoint_repo: Arc<dyn WaypointRepository>,
        memory_tx: Arc<dyn MemoryWriteTransaction>,
        classifier_heads: Arc<dyn ClassifierHeadRepository>,
        embedder: Arc<dyn Embedder>,
        events: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        config: OpenMemoryConfig,
    ) -> Self {
        Self {
            memories,
            vectors,
            waypoint_repo,
            memory_tx,
            classifier_heads,
            embedder,
            events,
            clock,
            classifier: Classifier::new(),
            config,
        }
    }

    fn validate_content(&self, content: &str) -> Result<(), ValidationError> {
        if content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        if content.len() > self.config.max_payload_size {
            return Err(ValidationError::PayloadTooLarge {
                size: content.len(),
                max: self.config.max_payload_size,
            });
        }
        Ok(())
    }

    fn encrypt_if_enabled(&self, content: &str) -> OpenMemoryResult<(String, u32)> {
        if !self.config.encryption.enabled {
            return Ok((content.to_string(), 0));
        }
        let envelope = openmemory_security::encrypt(
            content,
            &self.config.encryption.key,
            &self.config.encryption.salt,
            self.config.encryption.key_version,
        )?;
        Ok((envelope, self.config.encryption.key_version))
    }

    /// Decrypt `memory.content` if it carries an encryption envelope;
    /// otherwise return it unchanged.
    pub fn hydrate_content(&self, memory: &Memory) -> OpenMemoryResult<String> {
        if openmemory_security::is_envelope(&memory.content) {
            let plain = openmemory_security::decrypt(
                &memory.content,
                &self.config.encryption.key,
                &self.config.encryption.salt,
            )?;
            Ok(plain)
        } else {
            Ok(memory.content.clone())
        }
    }

    /// `spec.md` §4.4's `add` contract.
    pub async fn add(&self, req: AddRequest) -> OpenMemoryResult<String> {
        self.validate_content(&req.content)?;
        let user_id = normalize_user_id(req.user_id);
        let fingerprint = simhash::compute(&req.content);
        let now = self.clock.now();

        if let Some(mut existing) = self
            .memories
            .get_by_simhash(user_id.as_deref(), &fingerprint)
            .await?
        {
            existing.last_seen_at = now;
            existing.coactivations += 1;
            existing.salience =
                (existing.salience + self.config.dynamics.alpha_recall).min(self.config.decay.max_salience);
            existing.version += 1;
            self.memories.update(&existing).await?;
            self.events
                .publish(Event::new(
                    EventActor::System("memory-core".to_string()),
                    EventPayload::MemoryUpdated {
                        memory_id: existing.id.clone(),
                        user_id: existing.user_id.clone(),
                    },
                ))
                .await;
            return Ok(existing.id);
        }

        let rule_classification = match req.sector_override {
            Some(sector) => openmemory_classify::Classification {
                primary: sector,
                additional: Vec::new(),
                confidence: 1.0,
            },
            None => self.classifier.classify(&req.content),
        };

        let mut sectors = vec![rule_classification.primary];
        sectors.extend(rule_classification.additional.iter().copied());

        let embedded = match self.embedder.embed_multi_sector(&req.content, &sectors).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "embedding failed, falling back to keyword-only indexing");
                Vec::new()
            }
        };
        let (mean_dim, mean_vec) = mean_vector(&embedded);

        // The learned head only ever overrides the *primary* sector label
        // (not which sectors got embedded above); it predicts from the
        // mean vector, which only exists once embedding has run.
        let classification = if req.sector_override.is_some() {
            rule_classification
        } else {
            let head = self.classifier_heads.load_head(user_id.as_deref()).await?;
            let head = head.as_ref().map(LogisticHead::from);
            self.classifier.classify_with_head(
                &req.content,
                &mean_vec,
                head.as_ref(),
                self.config.scoring.classifier_override_threshold,
            )
        };

        let (stored_content, key_version) = self.encrypt_if_enabled(&req.content)?;

        let id = uuid::Uuid::new_v4().to_string();
        let memory = Memory {
            id: id.clone(),
            user_id: user_id.clone(),
            segment: 0,
            content: stored_content,
            simhash: fingerprint,
            primary_sector: classification.primary,
            tags: req.tags,
            metadata: req.metadata,
            created_at: now,
            updated_at: now,
            last_seen_at: now,
            salience: 1.0,
            decay_lambda: self.config.decay.lambda_for(classification.primary),
            version: 1,
            mean_dim,
            mean_vec,
            compressed_vec: None,
            feedback_score: 0.0,
            generated_summary: String::new(),
            coactivations: 1,
            encryption_key_version: key_version,
            archived: false,
        };

        let stored: Vec<StoredVector> = embedded
            .into_iter()
            .map(|v| {
                let mut sv = StoredVector::new(&memory.id, v.sector, v.vec);
                sv.user_id = memory.user_id.clone();
                sv
            })
            .collect();

        // Candidates are computed against memories that exist *before*
        // this insert, so the new row can't end up wired to itself.
        let recent = self.memories.recent_for_user(user_id.as_deref(), 6).await?;
        let new_waypoints =
            waypoints::candidate_waypoints(&memory, &recent, now, self.config.decay.max_waypoint_weight);

        // `spec.md` §4.4 step 6: memory row, vector rows and new
        // waypoints commit as one transaction.
        self.memory_tx
            .add_memory_atomic(
                &memory,
                &stored,
                &new_waypoints,
                self.config.dynamics.eta_trace,
                self.config.decay.max_waypoint_weight,
            )
            .await?;

        self.events
            .publish(Event::new(
                EventActor::System("memory-core".to_string()),
                EventPayload::MemoryAdded {
                    memory_id: memory.id.clone(),
                    user_id: memory.user_id.clone(),
                },
            ))
            .await;

        Ok(id)
    }

    /// `spec.md` §4.4's `update` contract.
    pub async fn update(&self, id: &str, patch: UpdatePatch) -> OpenMemoryResult<()> {
        let mut memory = self
            .memories
            .get(id)
            .await?
            .ok_or_else(|| OpenMemoryError::NotFound(id.to_string()))?;

        let mut content_changed = false;
        if let Some(content) = patch.content {
            self.validate_content(&content)?;
            let (stored, key_version) = self.encrypt_if_enabled(&content)?;
            memory.content = stored;
            memory.simhash = simhash::compute(&content);
            memory.encryption_key_version = key_version;
            content_changed = true;
        }
        if let Some(tags) = patch.tags {
            memory.tags = tags;
        }
        if let Some(metadata) = patch.metadata {
            memory.metadata = metadata;
        }
        if let Some(sector) = patch.sector {
            memory.primary_sector = sector;
            memory.decay_lambda = self.config.decay.lambda_for(sector);
        }

        let now = self.clock.now();
        memory.updated_at = now;
        memory.last_seen_at = now;
        memory.version += 1;

        if content_changed {
            let sectors = [memory.primary_sector];
            match self
                .embedder
                .embed_multi_sector(&memory.content, &sectors)
                .await
            {
                Ok(embedded) => {
                    let (mean_dim, mean_vec) = mean_vector(&embedded);
                    memory.mean_dim = mean_dim;
                    memory.mean_vec = mean_vec;
                    let stored: Vec<StoredVector> = embedded
                        .into_iter()
                        .map(|v| {
                            let mut sv = StoredVector::new(&memory.id, v.sector, v.vec);
                            sv.user_id = memory.user_id.clone();
                            sv
                        })
                        .collect();
                    self.vectors.store_vectors(&stored).await?;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "re-embedding on update failed, keeping stale vectors");
                }
            }
        }

        self.memories.update(&memory).await?;

        self.events
            .publish(Event::new(
                EventActor::System("memory-core".to_string()),
                EventPayload::MemoryUpdated {
                    memory_id: memory.id.clone(),
                    user_id: memory.user_id.clone(),
                },
            ))
            .await;

        Ok(())
    }

    /// `spec.md` §4.4's `delete` contract.
    pub async fn delete(&self, id: &str) -> OpenMemoryResult<()> {
        let memory = self
            .memories
            .get(id)
            .await?
            .ok_or_else(|| OpenMemoryError::NotFound(id.to_string()))?;

        self.vectors.delete_vectors(id).await?;
        self.waypoint_repo.delete_for_memory(id).await?;
        self.memories.delete(id).await?;

        self.events
            .publish(Event::new(
                EventActor::System("memory-core".to_string()),
                EventPayload::MemoryDeleted {
                    memory_id: id.to_string(),
                    user_id: memory.user_id,
                },
            ))
            .await;

        Ok(())
    }

    /// `spec.md` §4.4's `deleteAll` contract (memories, vectors, waypoints;
    /// temporal facts/edges are cascaded by `openmemory-temporal`).
    pub async fn delete_all(&self, user_id: &str) -> OpenMemoryResult<u64> {
        self.vectors.delete_vectors_by_user(user_id).await?;
        self.memories.delete_all_for_user(user_id).await
    }
}
