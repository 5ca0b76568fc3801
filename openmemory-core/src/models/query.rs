use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Sector;

/// Point-in-time query using bitemporal semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsOfQuery {
    pub system_time: DateTime<Utc>,
    pub valid_time: DateTime<Utc>,
    pub filter: Option<MemoryFilter>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryFilter {
    pub sectors: Option<Vec<Sector>>,
    pub tags: Option<Vec<String>>,
}

/// Allen's-interval-algebra-flavoured range query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalRangeQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub mode: TemporalRangeMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalRangeMode {
    Overlaps,
    Contains,
    StartedDuring,
    EndedDuring,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalDirection {
    Forward,
    Backward,
    Both,
}
