//! Test doubles shared across the workspace's integration tests: a
//! deterministic embedder, a no-op event bus, a settable clock and a
//! `Memory` builder with sane defaults. Each crate's own tests are free to
//! write narrower stubs where these don't fit; this crate exists so the
//! common case doesn't get re-implemented five times.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use openmemory_core::errors::EmbeddingError;
use openmemory_core::models::{Event, Memory, Sector};
use openmemory_core::traits::{Clock, EmbeddedVector, Embedder, EventBus};

/// Deterministic, hash-derived embedder (`spec.md` §6.1's Non-goal on
/// hosting a real model — every test needs *a* vector, not a good one).
/// Same shape two texts hash the same, which is enough to exercise
/// similarity scoring and cache-key behaviour without a network call.
pub struct HashEmbedder {
    pub dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let hash = blake3::hash(text.as_bytes());
        let bytes = hash.as_bytes();
        (0..self.dim)
            .map(|i| (bytes[i % bytes.len()] as f32 / 255.0) * 2.0 - 1.0)
            .collect()
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(32)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_multi_sector(&self, text: &str, sectors: &[Sector]) -> Result<Vec<EmbeddedVector>, EmbeddingError> {
        let vec = self.vector_for(text);
        Ok(sectors
            .iter()
            .map(|s| EmbeddedVector { sector: *s, vec: vec.clone(), dim: self.dim })
            .collect())
    }

    async fn embed_query_for_all_sectors(&self, text: &str) -> Result<HashMap<Sector, Vec<f32>>, EmbeddingError> {
        let vec = self.vector_for(text);
        Ok(Sector::ALL.iter().map(|s| (*s, vec.clone())).collect())
    }
}

/// Discards every published event. Useful wherever a test only cares
/// about repository/service state, not side-channel notifications.
#[derive(Debug, Default)]
pub struct NullEventBus;

#[async_trait]
impl EventBus for NullEventBus {
    async fn publish(&self, _event: Event) {}
}

/// A [`Clock`] whose `now()` is set by the test, so decay/dynamics code
/// under test sees a fixed or manually-advanced instant instead of the
/// real wall clock.
pub struct FixedClock {
    micros: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { micros: AtomicI64::new(at.timestamp_micros()) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.micros.store(at.timestamp_micros(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.micros.fetch_add(delta.num_microseconds().unwrap_or(0), Ordering::SeqCst);
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst)).unwrap_or_else(Utc::now)
    }
}

/// A plausible, fully-populated `Memory` for tests that don't care about
/// most fields. Override whatever the test actually exercises.
pub fn sample_memory(id: &str, user_id: Option<&str>, content: &str) -> Memory {
    let now = Utc::now();
    Memory {
        id: id.to_string(),
        user_id: user_id.map(|s| s.to_string()),
        segment: 0,
        content: content.to_string(),
        simhash: format!("{:016x}", blake3::hash(content.as_bytes()).as_bytes()[0]),
        primary_sector: Sector::Semantic,
        tags: BTreeSet::new(),
        metadata: serde_json::Value::Null,
        created_at: now,
        updated_at: now,
        last_seen_at: now,
        salience: 1.0,
        decay_lambda: 0.005,
        version: 1,
        mean_dim: 0,
        mean_vec: Vec::new(),
        compressed_vec: None,
        feedback_score: 0.0,
        generated_summary: String::new(),
        coactivations: 0,
        encryption_key_version: 0,
        archived: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed_query_for_all_sectors("hello").await.unwrap();
        let b = embedder.embed_query_for_all_sectors("hello").await.unwrap();
        assert_eq!(a.get(&Sector::Semantic), b.get(&Sector::Semantic));
    }

    #[test]
    fn fixed_clock_advances_by_delta() {
        let clock = FixedClock::new(Utc::now());
        let before = clock.now();
        clock.advance(chrono::Duration::seconds(60));
        assert_eq!((clock.now() - before).num_seconds(), 60);
    }

    #[test]
    fn sample_memory_has_defaults() {
        let m = sample_memory("m1", Some("u1"), "hello world");
        assert_eq!(m.id, "m1");
        assert_eq!(m.salience, 1.0);
    }
}
