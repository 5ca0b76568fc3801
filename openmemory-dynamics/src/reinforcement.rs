use openmemory_core::config::DynamicsConfig;

/// Salience boost for a recalled memory (`spec.md` §4.6): `salience +=
/// reinfSalienceBoost · score`, clamped to `max_salience`. Returns `None`
/// when `score < min_score` — the memory wasn't reinforced.
pub fn reinforce_recalled_salience(
    old_salience: f64,
    score: f64,
    min_score: f64,
    cfg: &DynamicsConfig,
    max_salience: f64,
) -> Option<f64> {
    if score < min_score {
        return None;
    }
    Some((old_salience + cfg.reinf_salience_boost * score).min(max_salience))
}

/// Waypoint weight boost for an edge traversed while answering a query.
pub fn reinforce_traversed_waypoint(old_weight: f64, cfg: &DynamicsConfig, max_weight: f64) -> f64 {
    (old_weight + cfg.reinf_waypoint_boost).min(max_weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_min_score_is_not_reinforced() {
        let cfg = DynamicsConfig::default();
        assert!(reinforce_recalled_salience(0.5, 0.1, 0.3, &cfg, 1.0).is_none());
    }

    #[test]
    fn boost_clamps_to_max_salience() {
        let cfg = DynamicsConfig::default();
        let boosted = reinforce_recalled_salience(0.98, 1.0, 0.3, &cfg, 1.0).unwrap();
        assert!(boosted <= 1.0);
    }
}
