use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// Lowercase, whitespace-tokenize. Same shape as `openmemory-memory`'s
/// simhash normalisation, duplicated here to keep this crate's dependency
/// surface limited to read-side concerns.
fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

/// Jaccard-ish token overlap between candidate text and the query — the
/// `keyword` feature in `spec.md` §4.8's composite score.
pub fn keyword_overlap(candidate_text: &str, query_text: &str) -> f64 {
    let candidate_tokens = tokenize(candidate_text);
    let query_tokens = tokenize(query_text);
    if query_tokens.is_empty() {
        return 0.0;
    }
    let hits = query_tokens.intersection(&candidate_tokens).count();
    hits as f64 / query_tokens.len() as f64
}

/// `|tags ∩ tagHints| / max(1, |tagHints|)`.
pub fn tag_match(candidate_tags: &BTreeSet<String>, tag_hints: &BTreeSet<String>) -> f64 {
    if tag_hints.is_empty() {
        return 0.0;
    }
    let hits = candidate_tags.intersection(tag_hints).count();
    hits as f64 / tag_hints.len() as f64
}

/// `exp(-(now-lastSeenAt)/τ_recency)`.
pub fn recency_score(last_seen_at: DateTime<Utc>, now: DateTime<Utc>, tau_secs: f64) -> f64 {
    let age_secs = (now - last_seen_at).num_seconds().max(0) as f64;
    if tau_secs <= 0.0 {
        return 0.0;
    }
    (-age_secs / tau_secs).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_overlap_counts_shared_tokens() {
        assert_eq!(keyword_overlap("the cat sat", "cat mat"), 0.5);
    }

    #[test]
    fn tag_match_empty_hints_is_zero() {
        let tags: BTreeSet<String> = ["a".to_string()].into();
        assert_eq!(tag_match(&tags, &BTreeSet::new()), 0.0);
    }

    #[test]
    fn recency_decays_with_age() {
        let now = Utc::now();
        let fresh = recency_score(now, now, 100.0);
        let old = recency_score(now - chrono::Duration::seconds(1000), now, 100.0);
        assert!(fresh > old);
    }
}
