//! Validated, immutable runtime configuration.

mod backend;
mod decay;
mod dynamics;
mod encryption;
mod scoring;
mod tier;

pub use backend::{BackendKind, BackendsConfig};
pub use decay::DecayConfig;
pub use dynamics::DynamicsConfig;
pub use encryption::EncryptionConfig;
pub use scoring::ScoringConfig;
pub use tier::{Tier, TierProfile};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// The single assembled, validated configuration value for a running
/// OpenMemory core instance. Construct via [`OpenMemoryConfig::from_toml`]
/// or [`OpenMemoryConfig::from_env`]; both fail fast rather than returning
/// a partially-invalid value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenMemoryConfig {
    pub tier: Tier,
    pub backends: BackendsConfig,
    pub decay: DecayConfig,
    pub dynamics: DynamicsConfig,
    pub scoring: ScoringConfig,
    pub encryption: EncryptionConfig,
    pub db_path: String,
    pub max_payload_size: usize,
    pub max_retries: u32,
    pub event_max_listeners: usize,
}

impl Default for OpenMemoryConfig {
    fn default() -> Self {
        Self {
            tier: Tier::Smart,
            backends: BackendsConfig::default(),
            decay: DecayConfig::default(),
            dynamics: DynamicsConfig::default(),
            scoring: ScoringConfig::default(),
            encryption: EncryptionConfig::default(),
            db_path: "./data/openmemory.sqlite".to_string(),
            max_payload_size: 1_000_000,
            max_retries: 3,
            event_max_listeners: 100,
        }
    }
}

impl OpenMemoryConfig {
    /// Parse and validate a TOML document. Unset fields fall back to
    /// [`Default`] on each nested config struct.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            toml::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Assemble configuration purely from process environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Ok(tier) = std::env::var("OPENMEMORY_TIER") {
            cfg.tier = tier.parse()?;
        }
        if let Ok(path) = std::env::var("OPENMEMORY_DB_PATH") {
            cfg.db_path = path;
        }
        if let Ok(key) = std::env::var("OPENMEMORY_ENCRYPTION_KEY") {
            cfg.encryption.enabled = true;
            cfg.encryption.key = key;
        }
        if let Ok(salt) = std::env::var("OPENMEMORY_ENCRYPTION_SALT") {
            cfg.encryption.salt = salt;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.encryption.validate()?;
        self.backends.validate()?;
        validate_table_name(&self.backends.pg_table)?;
        Ok(())
    }

    /// The resolved {dim, cache_segments, max_active} profile for `self.tier`.
    pub fn tier_profile(&self) -> TierProfile {
        self.tier.profile()
    }
}

/// Table names are restricted to `[A-Za-z0-9_]` so they can be safely
/// interpolated into quoted identifiers without further escaping.
pub fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ConfigError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        OpenMemoryConfig::default().validate().unwrap();
    }

    #[test]
    fn encryption_without_key_fails() {
        let mut cfg = OpenMemoryConfig::default();
        cfg.encryption.enabled = true;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_table_name_rejected() {
        assert!(validate_table_name("mem; drop table").is_err());
        assert!(validate_table_name("openmemory_memories").is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = OpenMemoryConfig::from_toml("tier = \"deep\"\n").unwrap();
        assert!(matches!(cfg.tier, Tier::Deep));
        assert_eq!(cfg.max_retries, 3);
    }
}
