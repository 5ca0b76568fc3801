use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cognitive category of a memory, driving decay rate and scoring weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Episodic,
    Semantic,
    Procedural,
    Emotional,
    Reflective,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Episodic,
        Sector::Semantic,
        Sector::Procedural,
        Sector::Emotional,
        Sector::Reflective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Episodic => "episodic",
            Sector::Semantic => "semantic",
            Sector::Procedural => "procedural",
            Sector::Emotional => "emotional",
            Sector::Reflective => "reflective",
        }
    }
}

impl std::str::FromStr for Sector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episodic" => Ok(Sector::Episodic),
            "semantic" => Ok(Sector::Semantic),
            "procedural" => Ok(Sector::Procedural),
            "emotional" => Ok(Sector::Emotional),
            "reflective" => Ok(Sector::Reflective),
            other => Err(format!("unknown sector: {other}")),
        }
    }
}

/// A single ingested memory (`spec.md` §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub user_id: Option<String>,
    pub segment: i64,
    /// Possibly an encryption envelope; see `openmemory-security`.
    pub content: String,
    /// 64-bit simhash fingerprint, hex-encoded.
    pub simhash: String,
    pub primary_sector: Sector,
    pub tags: BTreeSet<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub salience: f64,
    pub decay_lambda: f64,
    pub version: u64,
    pub mean_dim: usize,
    pub mean_vec: Vec<f32>,
    pub compressed_vec: Option<Vec<u8>>,
    pub feedback_score: f64,
    pub generated_summary: String,
    pub coactivations: u64,
    pub encryption_key_version: u32,
    pub archived: bool,
}

impl Memory {
    pub fn is_orphaned_candidate(&self, has_vectors: bool) -> bool {
        !has_vectors
    }
}
