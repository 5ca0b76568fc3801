use rusqlite::Connection;

use openmemory_core::errors::StorageError;

pub(super) fn apply(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS runtime_locks (
            key TEXT PRIMARY KEY,
            token TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| StorageError::Backend(e.to_string()))
}
