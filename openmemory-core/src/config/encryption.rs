use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Content-encryption settings. Disabled by default; when enabled both
/// `key` and `salt` MUST be explicitly set to non-default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    pub enabled: bool,
    pub key: String,
    pub salt: String,
    pub key_version: u32,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key: String::new(),
            salt: String::new(),
            key_version: 1,
        }
    }
}

impl EncryptionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && (self.key.is_empty() || self.salt.is_empty()) {
            return Err(ConfigError::EncryptionKeyMissing);
        }
        Ok(())
    }
}
