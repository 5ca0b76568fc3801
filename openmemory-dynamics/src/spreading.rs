use std::cmp::Ordering;
use std::collections::HashMap;

use openmemory_core::config::DynamicsConfig;

/// Spreading activation from a seed set (`spec.md` §4.6): `a[i]=1` for seeds,
/// then `a'[j] += γ · Σ_i a[i]·w(i,j)` for up to `iterations` rounds
/// (default/cap from `cfg`), clamped to 1 and stopping early once the total
/// delta across a round drops below `cfg.tau_energy_threshold`.
///
/// `adjacency` maps a node id to its `(neighbor, weight)` edges — callers
/// assemble this from `WaypointRepository::neighbors` before calling in,
/// since this function itself performs no I/O.
pub fn spreading_activation(
    seeds: &[String],
    adjacency: &HashMap<String, Vec<(String, f64)>>,
    cfg: &DynamicsConfig,
    iterations: Option<u32>,
) -> Vec<(String, f64)> {
    let max_iter = iterations
        .unwrap_or(cfg.spreading_default_iterations)
        .min(cfg.spreading_max_iterations);

    let mut activation: HashMap<String, f64> = seeds.iter().map(|s| (s.clone(), 1.0)).collect();

    for _ in 0..max_iter {
        let mut next = activation.clone();
        let mut total_delta = 0.0;
        for (i, a_i) in activation.iter() {
            let Some(neighbors) = adjacency.get(i) else {
                continue;
            };
            for (j, w) in neighbors {
                let delta = cfg.gamma_graph * a_i * w;
                let entry = next.entry(j.clone()).or_insert(0.0);
                let before = *entry;
                *entry = (*entry + delta).min(1.0);
                total_delta += (*entry - before).abs();
            }
        }
        activation = next;
        if total_delta < cfg.tau_energy_threshold {
            break;
        }
    }

    let mut out: Vec<(String, f64)> = activation.into_iter().collect();
    out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagates_to_neighbors_and_clamps() {
        let mut adjacency = HashMap::new();
        adjacency.insert("a".to_string(), vec![("b".to_string(), 1.0), ("c".to_string(), 1.0)]);
        let cfg = DynamicsConfig { gamma_graph: 0.9, tau_energy_threshold: 0.0001, ..DynamicsConfig::default() };

        let result = spreading_activation(&["a".to_string()], &adjacency, &cfg, Some(2));
        let b = result.iter().find(|(id, _)| id == "b").unwrap().1;
        assert!(b > 0.0 && b <= 1.0);
    }

    #[test]
    fn isolated_seed_has_no_effect() {
        let adjacency = HashMap::new();
        let cfg = DynamicsConfig::default();
        let result = spreading_activation(&["lonely".to_string()], &adjacency, &cfg, Some(2));
        assert_eq!(result, vec![("lonely".to_string(), 1.0)]);
    }
}
