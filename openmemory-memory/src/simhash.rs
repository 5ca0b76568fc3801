//! 64-bit locality-sensitive fingerprint for near-duplicate detection at
//! ingest (`spec.md` §3.1, §4.4 step 2). Deterministic for normalized
//! content: each token is hashed with BLAKE3 (stable across processes,
//! unlike `DefaultHasher`'s randomized per-run seed) and the fingerprint
//! bit is the sign of the sum of per-token bit votes.

fn normalize(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn hash_token(token: &str) -> u64 {
    let digest = blake3::hash(token.as_bytes());
    let bytes = digest.as_bytes();
    u64::from_le_bytes(bytes[0..8].try_into().unwrap())
}

/// Compute the simhash of `content`, returned as a lowercase hex string.
pub fn compute(content: &str) -> String {
    let normalized = normalize(content);
    let mut votes = [0i64; 64];
    for token in normalized.split(' ').filter(|t| !t.is_empty()) {
        let h = hash_token(token);
        for (bit, vote) in votes.iter_mut().enumerate() {
            if (h >> bit) & 1 == 1 {
                *vote += 1;
            } else {
                *vote -= 1;
            }
        }
    }
    let mut fingerprint: u64 = 0;
    for (bit, vote) in votes.iter().enumerate() {
        if *vote > 0 {
            fingerprint |= 1 << bit;
        }
    }
    format!("{fingerprint:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_content() {
        assert_eq!(compute("hello world"), compute("hello world"));
    }

    #[test]
    fn normalizes_whitespace_and_case() {
        assert_eq!(compute("Hello   World"), compute("hello world"));
    }

    #[test]
    fn differs_for_different_content() {
        assert_ne!(compute("hello world"), compute("goodbye world"));
    }
}
