use async_trait::async_trait;
use rusqlite::params;

use openmemory_core::errors::{OpenMemoryError, OpenMemoryResult, StorageError};
use openmemory_core::traits::DistributedLock;

use super::SqliteDb;

#[async_trait]
impl DistributedLock for SqliteDb {
    async fn acquire(&self, key: &str, ttl: std::time::Duration) -> OpenMemoryResult<Option<String>> {
        let key = key.to_string();
        let token = uuid::Uuid::new_v4().to_string();
        let ttl_secs = ttl.as_secs_f64();
        self.with_conn(move |conn| {
            let now = chrono::Utc::now();
            let expires_at = now + chrono::Duration::milliseconds((ttl_secs * 1000.0) as i64);
            let rows = conn
                .execute(
                    "INSERT INTO runtime_locks (key, token, expires_at) VALUES (?1,?2,?3)
                     ON CONFLICT(key) DO UPDATE SET token = ?2, expires_at = ?3
                     WHERE runtime_locks.expires_at < ?4",
                    params![key, token, expires_at.to_rfc3339(), now.to_rfc3339()],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(rows > 0)
        })
        .await
        .map(|held| if held { Some(token) } else { None })
        .map_err(OpenMemoryError::from)
    }

    async fn release(&self, key: &str, token: &str) -> OpenMemoryResult<bool> {
        let key = key.to_string();
        let token = token.to_string();
        self.with_conn(move |conn| {
            let rows = conn
                .execute(
                    "DELETE FROM runtime_locks WHERE key = ?1 AND token = ?2",
                    params![key, token],
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(rows > 0)
        })
        .await
        .map_err(OpenMemoryError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_fails_while_first_holds() {
        let db = SqliteDb::open_in_memory().unwrap();
        let first = db.acquire("sweep", std::time::Duration::from_secs(60)).await.unwrap();
        assert!(first.is_some());
        let second = db.acquire("sweep", std::time::Duration::from_secs(60)).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn release_with_wrong_token_fails() {
        let db = SqliteDb::open_in_memory().unwrap();
        let token = db.acquire("sweep", std::time::Duration::from_secs(60)).await.unwrap().unwrap();
        assert!(!db.release("sweep", "not-the-token").await.unwrap());
        assert!(db.release("sweep", &token).await.unwrap());
    }

    #[tokio::test]
    async fn acquire_succeeds_again_after_release() {
        let db = SqliteDb::open_in_memory().unwrap();
        let token = db.acquire("sweep", std::time::Duration::from_secs(60)).await.unwrap().unwrap();
        db.release("sweep", &token).await.unwrap();
        assert!(db.acquire("sweep", std::time::Duration::from_secs(60)).await.unwrap().is_some());
    }
}
