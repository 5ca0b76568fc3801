use chrono::{DateTime, Utc};

use openmemory_core::config::DynamicsConfig;
use openmemory_core::models::{Memory, UserSummary};

/// Whether enough recall activity has accumulated since the last pass to
/// justify running consolidation, gated by `dynamicsTheta`
/// (`spec.md` §4.1/§4.6).
pub fn should_consolidate(activity_score: f64, cfg: &DynamicsConfig) -> bool {
    activity_score * cfg.theta_consolidation >= 1.0
}

/// Folds recently recalled memories into a user's running summary,
/// bumping `reflectionCount` (`spec.md` §3.6).
pub fn consolidate_user_summary(
    existing: Option<UserSummary>,
    user_id: &str,
    recalled: &[Memory],
    now: DateTime<Utc>,
) -> UserSummary {
    let mut summary = existing.unwrap_or_else(|| UserSummary {
        user_id: user_id.to_string(),
        summary: String::new(),
        reflection_count: 0,
        created_at: now,
        updated_at: now,
    });

    let highlights: Vec<&str> = recalled
        .iter()
        .map(|m| m.generated_summary.as_str())
        .filter(|s| !s.is_empty())
        .take(5)
        .collect();
    if !highlights.is_empty() {
        summary.summary = highlights.join("; ");
    }
    summary.reflection_count += 1;
    summary.updated_at = now;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_below_theta_does_not_trigger() {
        let cfg = DynamicsConfig { theta_consolidation: 0.5, ..DynamicsConfig::default() };
        assert!(!should_consolidate(1.0, &cfg));
        assert!(should_consolidate(3.0, &cfg));
    }

    #[test]
    fn consolidation_increments_reflection_count() {
        let summary = consolidate_user_summary(None, "u1", &[], Utc::now());
        assert_eq!(summary.reflection_count, 1);
        let again = consolidate_user_summary(Some(summary), "u1", &[], Utc::now());
        assert_eq!(again.reflection_count, 2);
    }
}
