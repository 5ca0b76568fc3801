/// Insert a `user_id = ?` (or `user_id IS NULL`) predicate at the
/// correct position in `sql`: before a top-level `ORDER BY` / `LIMIT` /
/// `GROUP BY`, tracking parenthesis depth so a clause inside a subquery
/// is never mistaken for the outer query's tail. Returns the rewritten
/// SQL and whether a new `?` placeholder was appended (false for the
/// `IS NULL` form).
pub fn inject_user_scope(sql: &str, has_user_id: bool) -> (String, bool) {
    let insertion_byte = find_tail_keyword(sql);
    let has_where = has_top_level_where(&sql[..insertion_byte]);

    let predicate = if has_user_id {
        "user_id = ?"
    } else {
        "user_id IS NULL"
    };

    let fragment = if has_where {
        format!(" AND ({predicate})")
    } else {
        format!(" WHERE {predicate}")
    };

    let mut out = String::with_capacity(sql.len() + fragment.len());
    out.push_str(&sql[..insertion_byte]);
    out.push_str(&fragment);
    out.push_str(&sql[insertion_byte..]);

    (out, has_user_id)
}

/// Byte offset of the first top-level `ORDER BY`, `LIMIT` or `GROUP BY`
/// keyword, or `sql.len()` if none exists.
fn find_tail_keyword(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let upper = sql.to_ascii_uppercase();
    let mut depth: i32 = 0;
    let mut in_quote = false;
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            _ => {}
        }

        if !in_quote && depth == 0 {
            for kw in ["ORDER BY", "GROUP BY", "LIMIT"] {
                if upper[i..].starts_with(kw) && word_boundary(&upper, i, kw.len()) {
                    return i;
                }
            }
        }
        i += 1;
    }

    sql.len()
}

fn word_boundary(s: &str, start: usize, len: usize) -> bool {
    let before_ok = start == 0 || !s.as_bytes()[start - 1].is_ascii_alphanumeric();
    let end = start + len;
    let after_ok = end >= s.len() || !s.as_bytes()[end].is_ascii_alphanumeric();
    before_ok && after_ok
}

fn has_top_level_where(prefix: &str) -> bool {
    let upper = prefix.to_ascii_uppercase();
    let mut depth: i32 = 0;
    let mut in_quote = false;
    let bytes = upper.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            _ => {}
        }
        if !in_quote && depth == 0 && upper[i..].starts_with("WHERE") && word_boundary(&upper, i, 5) {
            return true;
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_where_when_absent() {
        let (sql, appended) = inject_user_scope("SELECT * FROM memories", true);
        assert_eq!(sql, "SELECT * FROM memories WHERE user_id = ?");
        assert!(appended);
    }

    #[test]
    fn extends_existing_where() {
        let (sql, _) = inject_user_scope("SELECT * FROM memories WHERE archived = 0", true);
        assert_eq!(
            sql,
            "SELECT * FROM memories WHERE archived = 0 AND (user_id = ?)"
        );
    }

    #[test]
    fn inserts_before_order_by_and_limit() {
        let (sql, _) = inject_user_scope(
            "SELECT * FROM memories WHERE archived = 0 ORDER BY created_at DESC LIMIT 10",
            true,
        );
        assert_eq!(
            sql,
            "SELECT * FROM memories WHERE archived = 0 AND (user_id = ?) ORDER BY created_at DESC LIMIT 10"
        );
    }

    #[test]
    fn null_user_form_appends_no_param() {
        let (sql, appended) = inject_user_scope("SELECT * FROM memories", false);
        assert_eq!(sql, "SELECT * FROM memories WHERE user_id IS NULL");
        assert!(!appended);
    }

    #[test]
    fn ignores_keywords_inside_subquery_parens() {
        let (sql, _) = inject_user_scope(
            "SELECT * FROM memories WHERE id IN (SELECT id FROM x ORDER BY y)",
            true,
        );
        assert_eq!(
            sql,
            "SELECT * FROM memories WHERE id IN (SELECT id FROM x ORDER BY y) AND (user_id = ?)"
        );
    }
}
