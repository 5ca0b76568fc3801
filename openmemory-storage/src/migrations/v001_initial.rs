use rusqlite::Connection;

use openmemory_core::errors::StorageError;

pub(super) fn apply(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            segment INTEGER NOT NULL DEFAULT 0,
            content TEXT NOT NULL,
            simhash TEXT NOT NULL,
            primary_sector TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            metadata TEXT NOT NULL DEFAULT 'null',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_seen_at TEXT NOT NULL,
            salience REAL NOT NULL DEFAULT 1.0,
            decay_lambda REAL NOT NULL DEFAULT 0.005,
            version INTEGER NOT NULL DEFAULT 1,
            mean_dim INTEGER NOT NULL DEFAULT 0,
            mean_vec BLOB,
            compressed_vec BLOB,
            feedback_score REAL NOT NULL DEFAULT 0.0,
            generated_summary TEXT NOT NULL DEFAULT '',
            coactivations INTEGER NOT NULL DEFAULT 1,
            encryption_key_version INTEGER NOT NULL DEFAULT 0,
            archived INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_memories_user_simhash
            ON memories(COALESCE(user_id, ''), simhash);
        CREATE INDEX IF NOT EXISTS idx_memories_salience ON memories(salience);

        CREATE TABLE IF NOT EXISTS vectors (
            memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            sector TEXT NOT NULL,
            user_id TEXT,
            vec BLOB NOT NULL,
            dim INTEGER NOT NULL,
            metadata TEXT,
            PRIMARY KEY (memory_id, sector)
        );
        CREATE INDEX IF NOT EXISTS idx_vectors_sector_user ON vectors(sector, user_id);

        CREATE TABLE IF NOT EXISTS waypoints (
            src_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            dst_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            user_id TEXT,
            weight REAL NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_waypoints_pair
            ON waypoints(src_id, dst_id, COALESCE(user_id, ''));
        CREATE INDEX IF NOT EXISTS idx_waypoints_src ON waypoints(src_id);
        CREATE INDEX IF NOT EXISTS idx_waypoints_dst ON waypoints(dst_id);

        CREATE TABLE IF NOT EXISTS temporal_facts (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            subject TEXT NOT NULL,
            predicate TEXT NOT NULL,
            object TEXT NOT NULL,
            valid_from TEXT NOT NULL,
            valid_to TEXT,
            confidence REAL NOT NULL,
            last_updated TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT 'null'
        );
        CREATE INDEX IF NOT EXISTS idx_facts_open
            ON temporal_facts(COALESCE(user_id, ''), subject, predicate, valid_to);

        CREATE TABLE IF NOT EXISTS temporal_edges (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            source_id TEXT NOT NULL,
            target_id TEXT NOT NULL,
            relation_type TEXT NOT NULL,
            valid_from TEXT NOT NULL,
            valid_to TEXT,
            weight REAL NOT NULL,
            last_updated TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT 'null'
        );
        CREATE INDEX IF NOT EXISTS idx_edges_open
            ON temporal_edges(COALESCE(user_id, ''), source_id, target_id, relation_type, valid_to);

        CREATE TABLE IF NOT EXISTS temporal_events (
            id TEXT PRIMARY KEY,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            actor_kind TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            delta TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_entity ON temporal_events(entity_type, entity_id, recorded_at);

        CREATE TABLE IF NOT EXISTS user_summaries (
            user_id TEXT PRIMARY KEY,
            summary TEXT NOT NULL DEFAULT '',
            reflection_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS classifier_heads (
            user_id TEXT PRIMARY KEY,
            dim INTEGER NOT NULL,
            weights TEXT NOT NULL,
            bias TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            learning_rate REAL NOT NULL
        );
        ",
    )
    .map_err(|e| StorageError::Backend(e.to_string()))
}
