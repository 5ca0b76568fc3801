/// Convert SQLite-style `?` placeholders to Postgres-style `$N`,
/// respecting single-quoted string literals and the `??` escape for a
/// literal question mark. Idempotent on SQL that already contains no bare
/// `?` (e.g. already-numbered text passes through unchanged).
pub fn translate_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_quote = false;
    let mut counter = 0u32;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                out.push(c);
            }
            '?' if !in_quote => {
                if chars.peek() == Some(&'?') {
                    chars.next();
                    out.push('?');
                } else {
                    counter += 1;
                    out.push('$');
                    out.push_str(&counter.to_string());
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_sequential_placeholders() {
        let sql = "SELECT * FROM memories WHERE id = ? AND user_id = ?";
        let out = translate_placeholders(sql);
        assert_eq!(
            out,
            "SELECT * FROM memories WHERE id = $1 AND user_id = $2"
        );
    }

    #[test]
    fn respects_quoted_literals() {
        let sql = "SELECT '?' AS literal WHERE id = ?";
        let out = translate_placeholders(sql);
        assert_eq!(out, "SELECT '?' AS literal WHERE id = $1");
    }

    #[test]
    fn escaped_double_question_mark_is_literal() {
        // The `??` escape only collapses outside quotes; SQLite already
        // treats a `?` inside a string literal as a literal character, so
        // a quoted `??` stays two characters.
        let sql = "SELECT content FROM memories WHERE content LIKE ?? AND id = ?";
        let out = translate_placeholders(sql);
        assert_eq!(
            out,
            "SELECT content FROM memories WHERE content LIKE ? AND id = $1"
        );
    }

    #[test]
    fn idempotent_on_already_numbered_sql() {
        let sql = "SELECT * FROM memories WHERE id = $1";
        assert_eq!(translate_placeholders(sql), sql);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn never_panics_on_arbitrary_sql(sql in "\\PC*") {
            let _ = translate_placeholders(&sql);
        }

        #[test]
        fn numbered_output_has_no_bare_question_marks(n in 0usize..8) {
            let sql: String = std::iter::repeat("col = ? AND ").take(n).collect::<String>() + "1=1";
            let out = translate_placeholders(&sql);
            prop_assert!(!out.contains('?'));
        }
    }
}
