use chrono::{DateTime, Utc};

use openmemory_core::models::Memory;

/// Result of decaying one memory's salience.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayOutcome {
    pub id: String,
    pub new_salience: f64,
    pub is_cold: bool,
}

/// `spec.md` §4.6's decay sweep formula applied to one batch:
/// `newSalience = oldSalience · exp(-λ·Δt_minutes)`. Pure and
/// allocation-light so callers can run it over arbitrarily large batches
/// without this function touching storage itself.
pub fn decay_batch(memories: &[Memory], now: DateTime<Utc>, cold_threshold: f64) -> Vec<DecayOutcome> {
    memories
        .iter()
        .map(|m| {
            let dt_minutes = (now - m.last_seen_at).num_seconds() as f64 / 60.0;
            let new_salience = if dt_minutes <= 0.0 {
                m.salience
            } else {
                m.salience * (-m.decay_lambda * dt_minutes).exp()
            };
            DecayOutcome {
                id: m.id.clone(),
                new_salience,
                is_cold: new_salience < cold_threshold,
            }
        })
        .collect()
}

/// Multiplicative idle-edge decay factor (`spec.md` §4.6): `exp(-λ·Δt_days)`,
/// λ tied to the source memory's sector.
pub fn edge_decay_factor(lambda: f64, idle_days: f64) -> f64 {
    if idle_days <= 0.0 {
        1.0
    } else {
        (-lambda * idle_days).exp()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use test_fixtures::sample_memory;

    fn memory(salience: f64, lambda: f64, last_seen_minutes_ago: i64) -> Memory {
        let mut m = sample_memory("m1", None, "");
        m.last_seen_at = Utc::now() - Duration::minutes(last_seen_minutes_ago);
        m.salience = salience;
        m.decay_lambda = lambda;
        m
    }

    #[test]
    fn matches_documented_decay_convergence() {
        let m = memory(1.0, 0.015, 100);
        let out = decay_batch(&[m], Utc::now(), 0.05);
        assert!((out[0].new_salience - 0.223).abs() < 1e-3);
    }

    #[test]
    fn flags_cold_below_threshold() {
        let m = memory(0.06, 0.1, 100_000);
        let out = decay_batch(&[m], Utc::now(), 0.05);
        assert!(out[0].is_cold);
    }
}
