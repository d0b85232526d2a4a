//! Token-boundary substitution
//!
//! All textual substitution during replacement detection goes through
//! `substitute_token`, so the boundary rules live in exactly one place. A
//! token occurrence only counts when both its neighbors are delimiters (or
//! the string edge); the delimiter set below is load-bearing, heuristics
//! downstream depend on precisely this behavior.

/// Characters that end a token
pub const SPECIAL_CHARACTERS: &[char] = &[
    ';', ',', '(', ')', '=', '+', '-', '>', '<', '.', '[', ']', '{', '}', '!', '&', '|', '*', '/',
    '%', '?', ':', ' ', '"', '\n',
];

fn is_boundary(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => SPECIAL_CHARACTERS.contains(&c),
    }
}

/// Byte offsets of boundary-delimited occurrences of `token` in `text`
fn token_occurrences(text: &str, token: &str) -> Vec<usize> {
    if token.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(position) = text[from..].find(token) {
        let start = from + position;
        let end = start + token.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if is_boundary(before) && is_boundary(after) {
            out.push(start);
        }
        from = start + 1;
    }
    out
}

/// Replace every boundary-delimited occurrence of `before` with `after`
pub fn substitute_token(text: &str, before: &str, after: &str) -> String {
    let occurrences = token_occurrences(text, before);
    if occurrences.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for start in occurrences {
        if start < cursor {
            continue;
        }
        out.push_str(&text[cursor..start]);
        out.push_str(after);
        cursor = start + before.len();
    }
    out.push_str(&text[cursor..]);
    out
}

/// Pairwise form: substitute `before` → `after` in `text1` only when
/// `after` also occurs as a token of `text2`, so a substitution is never
/// invented out of context
pub fn substitute_token_pairwise(text1: &str, text2: &str, before: &str, after: &str) -> String {
    if before == after {
        return text1.to_string();
    }
    if token_occurrences(text2, after).is_empty() && !text2.contains(after) {
        return text1.to_string();
    }
    substitute_token(text1, before, after)
}

/// Number of boundary-delimited occurrences of `token`
pub fn count_instances(text: &str, token: &str) -> usize {
    token_occurrences(text, token).len()
}

/// True when `text` contains `token` with boundary delimiters on both sides
pub fn contains_token(text: &str, token: &str) -> bool {
    !token_occurrences(text, token).is_empty()
}

/// Is the byte at `position` inside a single-quoted run?
pub fn is_inside_single_quotes(text: &str, position: usize) -> bool {
    let quotes = text[..position].matches('\'').count();
    quotes % 2 == 1
}

/// Is the byte at `position` inside a double-quoted run?
pub fn is_inside_double_quotes(text: &str, position: usize) -> bool {
    let quotes = text[..position].matches('"').count();
    quotes % 2 == 1
}

/// Do the characters bracketing `token` agree between the two texts? Used
/// to keep all-uppercase constants out of the rename intersection when
/// their contexts differ.
pub fn same_chars_before_after(text1: &str, text2: &str, token: &str) -> bool {
    let occurrences1 = token_occurrences(text1, token);
    let occurrences2 = token_occurrences(text2, token);
    if occurrences1.len() != occurrences2.len() {
        return false;
    }
    occurrences1
        .iter()
        .zip(occurrences2.iter())
        .all(|(&p1, &p2)| {
            let before1 = text1[..p1].chars().next_back();
            let before2 = text2[..p2].chars().next_back();
            let after1 = text1[p1 + token.len()..].chars().next();
            let after2 = text2[p2 + token.len()..].chars().next();
            before1 == before2 && after1 == after2
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_whole_tokens_only() {
        assert_eq!(substitute_token("x = index + 1;\n", "x", "y"), "y = index + 1;\n");
        // `x` inside `index` is not a token occurrence
        assert_eq!(
            substitute_token("index = index + 1;\n", "x", "y"),
            "index = index + 1;\n"
        );
    }

    #[test]
    fn substitutes_inside_calls_and_indexing() {
        assert_eq!(substitute_token("foo(a, b);\n", "a", "c"), "foo(c, b);\n");
        assert_eq!(substitute_token("items[i] = 0;\n", "i", "j"), "items[j] = 0;\n");
    }

    #[test]
    fn counts_boundary_occurrences() {
        assert_eq!(count_instances("a + a * a;\n", "a"), 3);
        assert_eq!(count_instances("alpha + beta;\n", "a"), 0);
    }

    #[test]
    fn quote_position_checks() {
        let s = r#"log("a(b", x)"#;
        let inside = s.find("a(b").unwrap();
        assert!(is_inside_double_quotes(s, inside + 1));
        let outside = s.find('x').unwrap();
        assert!(!is_inside_double_quotes(s, outside));
    }

    #[test]
    fn same_context_check() {
        assert!(same_chars_before_after(
            "set(MAX);\n",
            "put(MAX);\n",
            "MAX"
        ));
        assert!(!same_chars_before_after(
            "set(MAX);\n",
            "limit = MAX + 1;\n",
            "MAX"
        ));
    }
}
