use serde::{Deserialize, Serialize};

use crate::models::Sector;

/// Per-sector decay lambdas and the salience floor below which a memory
/// becomes eligible for deletion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub lambda_episodic: f64,
    pub lambda_semantic: f64,
    pub lambda_procedural: f64,
    pub lambda_emotional: f64,
    pub lambda_reflective: f64,
    pub cold_threshold: f64,
    pub prune_threshold: f64,
    pub max_salience: f64,
    pub max_waypoint_weight: f64,
    pub sweep_ratio: f64,
    pub sweep_batch_size: usize,
    pub sweep_sleep_ms: u64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            lambda_episodic: 0.015,
            lambda_semantic: 0.005,
            lambda_procedural: 0.008,
            lambda_emotional: 0.02,
            lambda_reflective: 0.001,
            cold_threshold: 0.05,
            prune_threshold: 0.05,
            max_salience: 1.0,
            max_waypoint_weight: 1.0,
            sweep_ratio: 0.1,
            sweep_batch_size: 500,
            sweep_sleep_ms: 10,
        }
    }
}

impl DecayConfig {
    pub fn lambda_for(&self, sector: Sector) -> f64 {
        match sector {
            Sector::Episodic => self.lambda_episodic,
            Sector::Semantic => self.lambda_semantic,
            Sector::Procedural => self.lambda_procedural,
            Sector::Emotional => self.lambda_emotional,
            Sector::Reflective => self.lambda_reflective,
        }
    }
}
