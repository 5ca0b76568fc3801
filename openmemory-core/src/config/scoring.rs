use serde::{Deserialize, Serialize};

/// HSG composite-score feature weights (`spec.md` §4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub similarity: f64,
    pub overlap: f64,
    pub waypoint: f64,
    pub recency: f64,
    pub tag_match: f64,
    pub salience: f64,
    pub keyword: f64,
    pub min_score: f64,
    pub recency_tau_secs: f64,
    pub oversample: usize,
    pub classifier_override_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            similarity: 1.0,
            overlap: 0.5,
            waypoint: 0.3,
            recency: 0.2,
            tag_match: 0.4,
            salience: 0.1,
            keyword: 0.05,
            min_score: 0.0,
            recency_tau_secs: 86_400.0,
            oversample: 3,
            classifier_override_threshold: 0.6,
        }
    }
}
