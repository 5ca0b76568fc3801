use async_trait::async_trait;

use openmemory_core::errors::{OpenMemoryResult, StorageError};
use openmemory_core::traits::DistributedLock;

use super::PgDb;

#[async_trait]
impl DistributedLock for PgDb {
    async fn acquire(&self, key: &str, ttl: std::time::Duration) -> OpenMemoryResult<Option<String>> {
        let client = self.client().await?;
        let token = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now();
        let expires_at = now + chrono::Duration::milliseconds((ttl.as_secs_f64() * 1000.0) as i64);
        let rows = client
            .execute(
                "INSERT INTO runtime_locks (key, token, expires_at) VALUES ($1,$2,$3)
                 ON CONFLICT (key) DO UPDATE SET token = $2, expires_at = $3
                 WHERE runtime_locks.expires_at < $4",
                &[&key, &token, &expires_at.to_rfc3339(), &now.to_rfc3339()],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(if rows > 0 { Some(token) } else { None })
    }

    async fn release(&self, key: &str, token: &str) -> OpenMemoryResult<bool> {
        let client = self.client().await?;
        let rows = client
            .execute(
                "DELETE FROM runtime_locks WHERE key = $1 AND token = $2",
                &[&key, &token],
            )
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(rows > 0)
    }
}
