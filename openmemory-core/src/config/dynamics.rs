use serde::{Deserialize, Serialize};

/// Coefficients for reinforcement, spreading activation and consolidation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// alpha: recall-reinforcement salience boost factor
    pub alpha_recall: f64,
    /// beta: emotional-sector reinforcement multiplier
    pub beta_emotional: f64,
    /// gamma: spreading-activation edge-weight multiplier
    pub gamma_graph: f64,
    /// theta: consolidation trigger coefficient
    pub theta_consolidation: f64,
    /// eta: waypoint reinforcement increment on insert/traversal
    pub eta_trace: f64,
    /// tau: spreading-activation convergence threshold
    pub tau_energy_threshold: f64,
    pub spreading_default_iterations: u32,
    pub spreading_max_iterations: u32,
    pub reinf_salience_boost: f64,
    pub reinf_waypoint_boost: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            alpha_recall: 0.05,
            beta_emotional: 0.1,
            gamma_graph: 0.3,
            theta_consolidation: 0.5,
            eta_trace: 0.1,
            tau_energy_threshold: 0.01,
            spreading_default_iterations: 2,
            spreading_max_iterations: 4,
            reinf_salience_boost: 0.05,
            reinf_waypoint_boost: 0.1,
        }
    }
}
