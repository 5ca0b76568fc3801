use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use openmemory_core::models::Sector;

#[derive(Debug, Clone)]
pub struct CachedSectorVector {
    pub sector: Sector,
    pub vec: Vec<f32>,
    pub dim: usize,
    pub user_id: Option<String>,
    pub metadata: Option<Value>,
}

impl CachedSectorVector {
    fn byte_len(&self) -> usize {
        self.dim * std::mem::size_of::<f32>()
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Entry {
    vectors: Vec<CachedSectorVector>,
    bytes: usize,
}

struct Inner {
    entries: HashMap<String, Entry>,
    /// Most-recently-used ids at the back.
    order: Vec<String>,
    total_bytes: usize,
}

/// Process-wide vector cache keyed by memory id. LRU by access order,
/// bounded by entry count and total byte size (`spec.md` §4.3).
pub struct VectorCache {
    inner: Mutex<Inner>,
    max_entries: usize,
    max_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl VectorCache {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: Vec::new(),
                total_bytes: 0,
            }),
            max_entries,
            max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&self, memory_id: &str) -> Option<Vec<CachedSectorVector>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.contains_key(memory_id) {
            touch(&mut inner.order, memory_id);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return inner.entries.get(memory_id).map(|e| e.vectors.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set(&self, memory_id: String, vectors: Vec<CachedSectorVector>) {
        let bytes: usize = vectors.iter().map(CachedSectorVector::byte_len).sum();
        let mut inner = self.inner.lock().unwrap();

        if let Some(old) = inner.entries.remove(&memory_id) {
            inner.total_bytes = inner.total_bytes.saturating_sub(old.bytes);
            inner.order.retain(|id| id != &memory_id);
        }

        inner.entries.insert(memory_id.clone(), Entry { vectors, bytes });
        inner.total_bytes += bytes;
        inner.order.push(memory_id);

        while (inner.entries.len() > self.max_entries || inner.total_bytes > self.max_bytes)
            && !inner.order.is_empty()
        {
            let evict_id = inner.order.remove(0);
            if let Some(e) = inner.entries.remove(&evict_id) {
                inner.total_bytes = inner.total_bytes.saturating_sub(e.bytes);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn invalidate(&self, memory_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(e) = inner.entries.remove(memory_id) {
            inner.total_bytes = inner.total_bytes.saturating_sub(e.bytes);
            inner.order.retain(|id| id != memory_id);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn touch(order: &mut Vec<String>, id: &str) {
    if let Some(pos) = order.iter().position(|x| x == id) {
        let id = order.remove(pos);
        order.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_entry(dim: usize) -> Vec<CachedSectorVector> {
        vec![CachedSectorVector {
            sector: Sector::Semantic,
            vec: vec![0.0; dim],
            dim,
            user_id: None,
            metadata: None,
        }]
    }

    #[test]
    fn hit_and_miss_counted() {
        let cache = VectorCache::new(10, 1_000_000);
        assert!(cache.get("a").is_none());
        cache.set("a".to_string(), vec_entry(4));
        assert!(cache.get("a").is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn evicts_lru_on_count_cap() {
        let cache = VectorCache::new(2, 1_000_000);
        cache.set("a".to_string(), vec_entry(4));
        cache.set("b".to_string(), vec_entry(4));
        cache.get("a");
        cache.set("c".to_string(), vec_entry(4));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = VectorCache::new(10, 1_000_000);
        cache.set("a".to_string(), vec_entry(4));
        cache.invalidate("a");
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_on_byte_cap() {
        let cache = VectorCache::new(100, 32);
        cache.set("a".to_string(), vec_entry(4));
        cache.set("b".to_string(), vec_entry(4));
        assert_eq!(cache.len(), 1);
    }
}
