use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Named configuration profile selecting vector dimension, cache segments
/// and concurrency caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Smart,
    Deep,
    Hybrid,
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Smart
    }
}

/// Resolved profile values for a [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierProfile {
    pub vec_dim: usize,
    pub cache_segments: usize,
    pub max_active: usize,
}

impl Tier {
    pub fn profile(&self) -> TierProfile {
        match self {
            Tier::Fast => TierProfile {
                vec_dim: 768,
                cache_segments: 2,
                max_active: 32,
            },
            Tier::Smart => TierProfile {
                vec_dim: 768,
                cache_segments: 5,
                max_active: 64,
            },
            Tier::Deep => TierProfile {
                vec_dim: 1024,
                cache_segments: 10,
                max_active: 128,
            },
            Tier::Hybrid => TierProfile {
                vec_dim: 768,
                cache_segments: 8,
                max_active: 100,
            },
        }
    }
}

impl FromStr for Tier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Tier::Fast),
            "smart" => Ok(Tier::Smart),
            "deep" => Ok(Tier::Deep),
            "hybrid" => Ok(Tier::Hybrid),
            other => Err(ConfigError::InvalidTier(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_match_spec_table() {
        assert_eq!(Tier::Fast.profile().vec_dim, 768);
        assert_eq!(Tier::Deep.profile().vec_dim, 1024);
        assert_eq!(Tier::Hybrid.profile().max_active, 100);
    }

    #[test]
    fn invalid_tier_name_errors() {
        assert!("ludicrous".parse::<Tier>().is_err());
    }
}
