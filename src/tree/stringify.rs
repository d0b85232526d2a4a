//! Token rendering
//!
//! Fragment texts are the single source of truth for every textual
//! heuristic downstream, so rendering must be deterministic and identical
//! for identical token streams. `proc-macro2` renders tokens with uniform
//! spacing; the fixups below tighten punctuation into the conventional
//! reading form (`foo(a, b)`, `self.x`, `a::b`) without touching operator
//! spacing.

use once_cell::sync::Lazy;
use quote::ToTokens;
use regex::Regex;

static CALL_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([\w\)\]"'!?]) \("#).unwrap());
static INDEX_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\w\)\]]) \[").unwrap());
static MACRO_BANG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w) !\s*([\(\[\{])").unwrap());

/// Render any syntax node to its normalized text
pub fn render<T: ToTokens>(node: &T) -> String {
    normalize_tokens(&node.to_token_stream().to_string())
}

/// Normalize a raw token-stream rendering
pub fn normalize_tokens(raw: &str) -> String {
    let mut s = raw.to_string();
    s = s.replace(" :: ", "::");
    s = s.replace(" . ", ".");
    s = s.replace(" , ", ", ");
    s = s.replace(" ;", ";");
    s = s.replace(" : ", ": ");
    s = s.replace("& mut ", "&mut ");
    s = s.replace("& self", "&self");
    s = s.replace(" ?", "?");
    s = MACRO_BANG.replace_all(&s, "$1!$2").into_owned();
    s = CALL_PAREN.replace_all(&s, "$1(").into_owned();
    s = INDEX_BRACKET.replace_all(&s, "$1[").into_owned();
    s = s.replace("( ", "(");
    s = s.replace(" )", ")");
    s = s.replace("[ ", "[");
    s = s.replace(" ]", "]");
    s = s.replace("! ", "!");
    s.trim().to_string()
}

/// Leaf statement text: normalized tokens plus the statement terminator
pub fn statement_text(rendered: &str, has_semicolon: bool) -> String {
    let trimmed = rendered.trim_end_matches(';').trim_end();
    if has_semicolon {
        format!("{};\n", trimmed)
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_call_tightly() {
        let expr: syn::Expr = syn::parse_str("foo(a, b)").unwrap();
        assert_eq!(render(&expr), "foo(a, b)");
    }

    #[test]
    fn renders_assignment_with_spaced_operators() {
        let expr: syn::Expr = syn::parse_str("x = x + 1").unwrap();
        assert_eq!(render(&expr), "x = x + 1");
    }

    #[test]
    fn renders_field_access_and_paths() {
        let expr: syn::Expr = syn::parse_str("self.items.len()").unwrap();
        assert_eq!(render(&expr), "self.items.len()");
        let expr: syn::Expr = syn::parse_str("Vec::new()").unwrap();
        assert_eq!(render(&expr), "Vec::new()");
    }

    #[test]
    fn renders_macro_statement() {
        let stmt: syn::Stmt = syn::parse_str("println!(\"{}\", count);").unwrap();
        assert_eq!(render(&stmt), "println!(\"{}\", count);");
    }

    #[test]
    fn renders_unary_not() {
        let expr: syn::Expr = syn::parse_str("!done && ready").unwrap();
        assert_eq!(render(&expr), "!done && ready");
    }

    #[test]
    fn statement_text_appends_terminator() {
        assert_eq!(statement_text("x = x + 1", true), "x = x + 1;\n");
        assert_eq!(statement_text("x + 1", false), "x + 1\n");
    }
}
