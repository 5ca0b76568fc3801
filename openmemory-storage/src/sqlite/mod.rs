//! SQLite-backed repository implementations.
//!
//! A single connection is held behind a blocking mutex and all
//! `rusqlite` calls are dispatched through `tokio::task::spawn_blocking`,
//! so the rest of the engine can stay `async fn` while the underlying
//! driver call is synchronous (`spec.md` §5, the same
//! `WriteConnection`/`ReadPool::with_conn` idiom used throughout).

mod classifier_heads;
mod locks;
mod memory_repo;
mod memory_tx;
mod temporal_repo;
mod vector_repo;
mod waypoint_repo;

pub use memory_repo::row_to_memory;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use openmemory_core::errors::StorageError;

/// Owns the single SQLite connection for one context/worker.
#[derive(Clone)]
pub struct SqliteDb {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDb {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let mut conn = Connection::open(path).map_err(|e| StorageError::Backend(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )
        .map_err(|e| StorageError::Backend(e.to_string()))?;
        crate::migrations::run_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let mut conn =
            Connection::open_in_memory().map_err(|e| StorageError::Backend(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        crate::migrations::run_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on a blocking thread.
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StorageError::PoolExhausted)?;
            f(&guard)
        })
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?
    }
}
