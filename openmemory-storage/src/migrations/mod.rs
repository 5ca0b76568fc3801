//! Forward-only, numbered schema migrations, each run inside its own
//! transaction and recorded into `schema_version`.

mod v001_initial;
mod v002_locks;

use rusqlite::Connection;

use openmemory_core::errors::StorageError;

type MigrationFn = fn(&Connection) -> Result<(), StorageError>;

struct Migration {
    version: u32,
    name: &'static str,
    apply: MigrationFn,
}

fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "initial_schema",
            apply: v001_initial::apply,
        },
        Migration {
            version: 2,
            name: "runtime_locks",
            apply: v002_locks::apply,
        },
    ]
}

/// Idempotently bring `conn`'s schema up to the latest known version.
pub fn run_migrations(conn: &mut Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| StorageError::Backend(e.to_string()))?;

    let current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    for m in all_migrations() {
        if m.version <= current {
            continue;
        }
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        (m.apply)(&tx).map_err(|e| StorageError::Migration {
            version: m.version,
            name: m.name.to_string(),
            cause: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
            rusqlite::params![m.version, m.name],
        )
        .map_err(|e| StorageError::Backend(e.to_string()))?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        tracing::info!(version = m.version, name = m.name, "applied migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();
        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
