use serde::{Deserialize, Serialize};

use super::validate_table_name;
use crate::errors::ConfigError;

/// Persistence driver selector. Metadata and vector storage select
/// backends independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Postgres,
    Valkey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    pub metadata_backend: BackendKind,
    pub vector_backend: BackendKind,
    pub pg_schema: String,
    pub pg_table: String,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            metadata_backend: BackendKind::Sqlite,
            vector_backend: BackendKind::Sqlite,
            pg_schema: "public".to_string(),
            pg_table: "openmemory_memories".to_string(),
        }
    }
}

impl BackendsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_table_name(&self.pg_table)?;
        validate_table_name(&self.pg_schema)?;
        Ok(())
    }
}
