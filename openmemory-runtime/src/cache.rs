use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// Process-local TTL key/value cache (`spec.md` §4.9) backing rate-limit
/// counters and small derived values the HSG and dynamics layers don't
/// want to recompute on every call. Each key carries its own expiry set
/// at write time; there is no background sweeper, expired entries are
/// simply treated as absent and overwritten on next write.
pub struct KvCache {
    inner: DashMap<String, Entry>,
    default_ttl: Duration,
}

impl KvCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self { inner: DashMap::new(), default_ttl }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let expired = match self.inner.get(key) {
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.inner.remove(key);
        }
        None
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        self.inner.insert(key.into(), Entry { value, expires_at: Instant::now() + ttl });
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.remove(key);
    }

    /// Atomically increments the integer stored at `key` (treating a
    /// missing or expired entry as `0`) and returns the new value. Resets
    /// the key's TTL to `default_ttl` on every call.
    pub fn incr(&self, key: &str) -> i64 {
        let ttl = self.default_ttl;
        let mut entry = self.inner.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::from(0),
            expires_at: Instant::now() + ttl,
        });
        if entry.expires_at <= Instant::now() {
            entry.value = Value::from(0);
        }
        let next = entry.value.as_i64().unwrap_or(0) + 1;
        entry.value = Value::from(next);
        entry.expires_at = Instant::now() + ttl;
        next
    }
}

impl Default for KvCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_roundtrips() {
        let cache = KvCache::default();
        cache.set("a", Value::from(42));
        assert_eq!(cache.get("a"), Some(Value::from(42)));
    }

    #[test]
    fn incr_starts_at_one_and_accumulates() {
        let cache = KvCache::default();
        assert_eq!(cache.incr("hits"), 1);
        assert_eq!(cache.incr("hits"), 2);
        assert_eq!(cache.incr("hits"), 3);
    }

    #[test]
    fn invalidate_removes_the_entry() {
        let cache = KvCache::default();
        cache.set("a", Value::from(1));
        cache.invalidate("a");
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let cache = KvCache::new(Duration::from_millis(0));
        cache.set("a", Value::from(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a"), None);
    }
}
