use std::time::Duration;

use async_trait::async_trait;

use crate::errors::OpenMemoryResult;

/// A named, TTL-bounded mutual-exclusion lock backed by the metadata store
/// (`spec.md` §4.9 / §9). `acquire` returns an opaque token on success and
/// `None` if the key is already held; `release` only succeeds if the
/// caller still presents the token it was granted.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    async fn acquire(&self, key: &str, ttl: Duration) -> OpenMemoryResult<Option<String>>;
    async fn release(&self, key: &str, token: &str) -> OpenMemoryResult<bool>;
}
