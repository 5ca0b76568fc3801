use super::cosine_similarity;

/// In-memory batch cosine top-k. Ties are broken by ascending id, matching
/// the ordering a backend-native ANN search would otherwise not guarantee
/// (`spec.md` §4.3).
pub fn batch_top_k(query: &[f32], candidates: &[(String, Vec<f32>)], top_k: usize) -> Vec<(String, f64)> {
    let mut scored: Vec<(String, f64)> = candidates
        .iter()
        .map(|(id, v)| (id.clone(), cosine_similarity(query, v)))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_score_desc_then_id_asc() {
        let query = vec![1.0f32, 0.0];
        let candidates = vec![
            ("b".to_string(), vec![1.0, 0.0]),
            ("a".to_string(), vec![1.0, 0.0]),
            ("c".to_string(), vec![0.0, 1.0]),
        ];
        let top = batch_top_k(&query, &candidates, 2);
        assert_eq!(top[0].0, "a");
        assert_eq!(top[1].0, "b");
    }

    #[test]
    fn respects_top_k() {
        let query = vec![1.0f32];
        let candidates: Vec<_> = (0..10).map(|i| (format!("m{i}"), vec![1.0f32])).collect();
        let top = batch_top_k(&query, &candidates, 3);
        assert_eq!(top.len(), 3);
    }
}
