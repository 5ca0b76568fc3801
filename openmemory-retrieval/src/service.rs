use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use openmemory_core::config::{DynamicsConfig, ScoringConfig};
use openmemory_core::errors::OpenMemoryResult;
use openmemory_core::models::{Event, EventActor, EventPayload, Memory, Sector};
use openmemory_core::traits::{Clock, Embedder, EventBus, MemoryRepository, VectorRepository, WaypointRepository};
use openmemory_dynamics::reinforcement::reinforce_recalled_salience;
use openmemory_dynamics::spreading::spreading_activation;

use crate::features::{keyword_overlap, recency_score, tag_match};

/// `spec.md` §4.8's `hsgQuery` options.
#[derive(Debug, Clone, Default)]
pub struct HsgOptions {
    pub user_id: Option<String>,
    pub sector_hints: Vec<Sector>,
    pub tag_hints: BTreeSet<String>,
    pub expand: bool,
}

/// One scored candidate, with the ids traversed to reach it.
#[derive(Debug, Clone)]
pub struct HsgResult {
    pub memory: Memory,
    pub score: f64,
    pub path: Vec<String>,
}

/// Orchestrates `spec.md` §4.8's eight-step query: classify, embed per
/// sector, union candidate sets, batch-fetch, composite-score, cutoff,
/// reinforce, emit.
pub struct RetrievalService {
    memories: Arc<dyn MemoryRepository>,
    vectors: Arc<dyn VectorRepository>,
    waypoints: Arc<dyn WaypointRepository>,
    embedder: Arc<dyn Embedder>,
    events: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    classifier: openmemory_classify::Classifier,
    scoring: ScoringConfig,
    dynamics: DynamicsConfig,
}

impl RetrievalService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memories: Arc<dyn MemoryRepository>,
        vectors: Arc<dyn VectorRepository>,
        waypoints: Arc<dyn WaypointRepository>,
        embedder: Arc<dyn Embedder>,
        events: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        scoring: ScoringConfig,
        dynamics: DynamicsConfig,
    ) -> Self {
        Self {
            memories,
            vectors,
            waypoints,
            embedder,
            events,
            clock,
            classifier: openmemory_classify::Classifier::new(),
            scoring,
            dynamics,
        }
    }

    pub async fn query(&self, query_text: &str, top_k: usize, options: HsgOptions) -> OpenMemoryResult<Vec<HsgResult>> {
        let classification = self.classifier.classify(query_text);
        let mut sectors: Vec<Sector> = vec![classification.primary];
        sectors.extend(classification.additional.iter().copied());
        sectors.extend(options.sector_hints.iter().copied());
        sectors.sort();
        sectors.dedup();

        let query_vecs = self.embedder.embed_query_for_all_sectors(query_text).await;

        let results = match query_vecs {
            Ok(vecs) if vecs.values().any(|v| !v.is_empty()) => {
                self.vector_query(query_text, top_k, &options, &sectors, &vecs).await?
            }
            Ok(_) => {
                tracing::warn!("embedder returned no vectors, falling back to keyword search");
                self.keyword_query(query_text, top_k, &options).await?
            }
            Err(err) => {
                tracing::warn!(error = %err, "query embedding failed, falling back to keyword search");
                self.keyword_query(query_text, top_k, &options).await?
            }
        };

        self.reinforce_and_emit(&results, &options).await;

        Ok(results)
    }

    async fn vector_query(
        &self,
        query_text: &str,
        top_k: usize,
        options: &HsgOptions,
        sectors: &[Sector],
        query_vecs: &HashMap<Sector, Vec<f32>>,
    ) -> OpenMemoryResult<Vec<HsgResult>> {
        let oversample = top_k * self.scoring.oversample;
        let mut best_similarity: HashMap<String, f64> = HashMap::new();
        let mut sector_hit_count: HashMap<String, usize> = HashMap::new();

        for sector in sectors {
            let Some(qvec) = query_vecs.get(sector) else { continue };
            if qvec.is_empty() {
                continue;
            }
            let hits = self
                .vectors
                .search_similar(*sector, qvec, oversample, options.user_id.as_deref())
                .await?;
            for (id, score) in hits {
                best_similarity
                    .entry(id.clone())
                    .and_modify(|s| *s = s.max(score))
                    .or_insert(score);
                *sector_hit_count.entry(id).or_insert(0) += 1;
            }
        }

        if best_similarity.is_empty() {
            return self.keyword_query(query_text, top_k, options).await;
        }

        let ids: Vec<String> = best_similarity.keys().cloned().collect();
        let candidates = self.memories.get_by_ids(&ids).await?;
        let candidates: Vec<Memory> = candidates
            .into_iter()
            .filter(|m| m.user_id == options.user_id)
            .collect();

        let adjacency = self.candidate_adjacency(&candidates, options.user_id.as_deref()).await?;
        let iterations = if options.expand { 2 } else { 1 };
        let seeds: Vec<String> = candidates.iter().map(|m| m.id.clone()).collect();
        let activation = spreading_activation(&seeds, &adjacency, &self.dynamics, Some(iterations));
        let activation: HashMap<String, f64> = activation.into_iter().collect();

        let now = self.clock.now();
        let mut scored: Vec<HsgResult> = candidates
            .into_iter()
            .map(|m| {
                let similarity = *best_similarity.get(&m.id).unwrap_or(&0.0);
                let recency = recency_score(m.last_seen_at, now, self.scoring.recency_tau_secs);
                let tags = tag_match(&m.tags, &options.tag_hints);
                let keyword = keyword_overlap(&m.content, query_text);
                let overlap_count = sector_hit_count.get(&m.id).copied().unwrap_or(1).saturating_sub(1);
                let waypoint_energy = (activation.get(&m.id).copied().unwrap_or(1.0) - 1.0).max(0.0);

                let score = self.scoring.similarity * similarity
                    + self.scoring.recency * recency
                    + self.scoring.tag_match * tags
                    + self.scoring.keyword * keyword
                    + self.scoring.salience * m.salience
                    + self.scoring.waypoint * waypoint_energy
                    + self.scoring.overlap * overlap_count as f64;

                let path = adjacency
                    .get(&m.id)
                    .map(|ns| ns.iter().map(|(id, _)| id.clone()).collect())
                    .unwrap_or_else(|| vec![m.id.clone()]);

                HsgResult { memory: m, score, path }
            })
            .collect();

        scored.retain(|r| r.score >= self.scoring.min_score);
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.memory.last_seen_at.cmp(&a.memory.last_seen_at))
                .then_with(|| a.memory.id.cmp(&b.memory.id))
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    /// Pure keyword/tag search used when embedding fails or yields no
    /// vectors (`spec.md` §4.8): `similarity=0`, keyword dominates.
    async fn keyword_query(&self, query_text: &str, top_k: usize, options: &HsgOptions) -> OpenMemoryResult<Vec<HsgResult>> {
        let pool_size = (top_k * self.scoring.oversample).max(50);
        let pool = self.memories.recent_for_user(options.user_id.as_deref(), pool_size).await?;

        let now = self.clock.now();
        let mut scored: Vec<HsgResult> = pool
            .into_iter()
            .map(|m| {
                let recency = recency_score(m.last_seen_at, now, self.scoring.recency_tau_secs);
                let tags = tag_match(&m.tags, &options.tag_hints);
                let keyword = keyword_overlap(&m.content, query_text);
                let score = self.scoring.recency * recency
                    + self.scoring.tag_match * tags
                    + self.scoring.keyword * keyword
                    + self.scoring.salience * m.salience;
                let path = vec![m.id.clone()];
                HsgResult { memory: m, score, path }
            })
            .collect();

        scored.retain(|r| r.score >= self.scoring.min_score);
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.memory.last_seen_at.cmp(&a.memory.last_seen_at))
                .then_with(|| a.memory.id.cmp(&b.memory.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Builds an adjacency map restricted to edges where both endpoints are
    /// in the candidate set — "reachable within 1 hop from any other in
    /// the candidate set" (`spec.md` §4.8).
    async fn candidate_adjacency(
        &self,
        candidates: &[Memory],
        user_id: Option<&str>,
    ) -> OpenMemoryResult<HashMap<String, Vec<(String, f64)>>> {
        let candidate_ids: HashSet<String> = candidates.iter().map(|m| m.id.clone()).collect();
        let mut adjacency: HashMap<String, Vec<(String, f64)>> = HashMap::new();
        for m in candidates {
            let neighbors = self.waypoints.neighbors(&m.id, user_id).await?;
            for edge in neighbors {
                let other = if edge.src_id == m.id { edge.dst_id } else { edge.src_id };
                if candidate_ids.contains(&other) {
                    adjacency.entry(m.id.clone()).or_default().push((other, edge.weight));
                }
            }
        }
        Ok(adjacency)
    }

    /// `spec.md` §4.6 reinforcement on recall, plus the optional
    /// `memory_queried` event.
    async fn reinforce_and_emit(&self, results: &[HsgResult], options: &HsgOptions) {
        for r in results {
            if let Some(new_salience) = reinforce_recalled_salience(
                r.memory.salience,
                r.score,
                self.scoring.min_score,
                &self.dynamics,
                1.0,
            ) {
                let mut updated = r.memory.clone();
                updated.salience = new_salience;
                if let Err(err) = self.memories.update(&updated).await {
                    tracing::warn!(error = %err, memory_id = %updated.id, "recall reinforcement failed");
                }
            }
        }

        self.events
            .publish(Event::new(
                EventActor::System("retrieval".to_string()),
                EventPayload::MemoryQueried { user_id: options.user_id.clone(), result_count: results.len() },
            ))
            .await;
    }
}
