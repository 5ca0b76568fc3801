/// Cosine similarity, guarding zero-norm vectors and unequal lengths by
/// returning 0 rather than NaN or panicking (`spec.md` §4.3, §8).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Euclidean distance; returns `f64::INFINITY` on mismatched lengths so
/// callers can treat it as "not comparable" without panicking.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_unit_vectors_score_one() {
        let v = vec![0.6f32, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_norm_guarded() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn unequal_lengths_guarded() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn empty_vectors_guarded() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn symmetric(a in proptest::collection::vec(-10.0f32..10.0, 1..16),
                      b in proptest::collection::vec(-10.0f32..10.0, 1..16)) {
            prop_assume!(a.len() == b.len());
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-9);
        }

        #[test]
        fn bounded(a in proptest::collection::vec(-10.0f32..10.0, 1..16),
                   b in proptest::collection::vec(-10.0f32..10.0, 1..16)) {
            prop_assume!(a.len() == b.len());
            let s = cosine_similarity(&a, &b);
            prop_assert!(s >= -1.0 - 1e-9 && s <= 1.0 + 1e-9);
        }
    }
}
