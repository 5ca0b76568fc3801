use std::sync::Arc;

use openmemory_core::config::BackendKind;
use openmemory_core::traits::DistributedLock;
use openmemory_storage::sqlite::SqliteDb;

/// Picks the [`DistributedLock`] implementation matching
/// `backends.metadata_backend` (`spec.md` §9's Open Question on lock
/// backend selection). `Valkey` has no client crate in this workspace's
/// dependency stack, so it falls back to the SQLite-backed lock rather
/// than fabricating a dependency; Postgres callers should construct
/// their `PgDb` directly and use it as a `DistributedLock` without going
/// through this helper.
pub fn select_lock_backend(kind: BackendKind, sqlite: Arc<SqliteDb>) -> Arc<dyn DistributedLock> {
    match kind {
        BackendKind::Sqlite => sqlite,
        BackendKind::Postgres => {
            tracing::warn!("postgres lock backend requested through select_lock_backend; construct PgDb directly instead. falling back to sqlite");
            sqlite
        }
        BackendKind::Valkey => {
            tracing::warn!("valkey lock backend is not implemented (no redis client crate in the dependency stack); falling back to sqlite");
            sqlite
        }
    }
}
