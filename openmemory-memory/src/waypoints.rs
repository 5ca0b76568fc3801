use chrono::{DateTime, Utc};

use openmemory_core::models::{Memory, Waypoint};

const WAYPOINT_CANDIDATES: usize = 5;

/// Best-effort weight for a new waypoint between a just-ingested memory and
/// an older one: closer in time and more similar in content score higher.
/// `spec.md` §4.4 step 6 only names "weighted by 1/timegap + cosine-mean";
/// the exact blend is this crate's call, clamped into the legal range.
fn edge_weight(now: DateTime<Utc>, other: &Memory, mean_vec: &[f32], max_weight: f64) -> f64 {
    let timegap_days = (now - other.last_seen_at).num_seconds().max(1) as f64 / 86_400.0;
    let recency_term = 1.0 / (1.0 + timegap_days);
    let similarity_term = if mean_vec.is_empty() || other.mean_vec.is_empty() {
        0.0
    } else {
        openmemory_vector::cosine_similarity(mean_vec, &other.mean_vec).max(0.0)
    };
    (recency_term + similarity_term).clamp(f64::MIN_POSITIVE, max_weight)
}

/// Build candidate waypoints from `new_memory` to up to [`WAYPOINT_CANDIDATES`]
/// of `recent` (the same user's most recently seen memories, excluding
/// `new_memory` itself).
pub fn candidate_waypoints(
    new_memory: &Memory,
    recent: &[Memory],
    now: DateTime<Utc>,
    max_weight: f64,
) -> Vec<Waypoint> {
    recent
        .iter()
        .filter(|m| m.id != new_memory.id)
        .take(WAYPOINT_CANDIDATES)
        .map(|other| Waypoint {
            src_id: new_memory.id.clone(),
            dst_id: other.id.clone(),
            user_id: new_memory.user_id.clone(),
            weight: edge_weight(now, other, &new_memory.mean_vec, max_weight),
            created_at: now,
            updated_at: now,
        })
        .collect()
}
