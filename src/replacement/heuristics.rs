//! String-based heuristics
//!
//! No single formula decides that two statements are the same edit. The
//! classifier instead runs a bank of narrowly scoped pattern recognizers,
//! each a pure predicate over the two texts and the replacement set
//! accumulated so far: it either confirms equivalence (optionally adding
//! typed replacements) or declines, leaving the pair to looser matching
//! passes or to rejection.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::fragment::CodeFragment;
use crate::replacement::info::ReplacementInfo;
use crate::replacement::util::{contains_token, substitute_token};
use crate::replacement::{Replacement, ReplacementKind};

pub static SPLIT_CONDITIONAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\|\|)|(&&)").unwrap());

pub static SPLIT_CONCAT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\+\s*").unwrap());

/// Longest common prefix of two strings, on char boundaries
pub fn common_prefix(s1: &str, s2: &str) -> String {
    s1.chars()
        .zip(s2.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a)
        .collect()
}

/// Longest common suffix, excluding any overlap with the given prefix
pub fn common_suffix(s1: &str, s2: &str, prefix_len: usize) -> String {
    let chars1: Vec<char> = s1.chars().collect();
    let chars2: Vec<char> = s2.chars().collect();
    let limit1 = chars1.len().saturating_sub(prefix_len);
    let limit2 = chars2.len().saturating_sub(prefix_len);
    let mut suffix = Vec::new();
    let mut i = 0;
    while i < limit1 && i < limit2 {
        let c1 = chars1[chars1.len() - 1 - i];
        let c2 = chars2[chars2.len() - 1 - i];
        if c1 != c2 {
            break;
        }
        suffix.push(c1);
        i += 1;
    }
    suffix.reverse();
    suffix.into_iter().collect()
}

/// The middles left after removing the common prefix and suffix
fn bracketed_difference(s1: &str, s2: &str) -> (String, String) {
    let prefix = common_prefix(s1, s2);
    let suffix = common_suffix(s1, s2, prefix.chars().count());
    let middle = |s: &str| {
        let chars: Vec<char> = s.chars().collect();
        let start = prefix.chars().count();
        let end = chars.len() - suffix.chars().count();
        if start <= end {
            chars[start..end].iter().collect::<String>()
        } else {
            String::new()
        }
    };
    (middle(s1), middle(s2))
}

/// Texts equal once the `mut` binding modifier is ignored
pub fn differ_only_in_mut_modifier(s1: &str, s2: &str) -> Option<Replacement> {
    if s1 == s2 {
        return None;
    }
    let stripped1 = s1.replace("let mut ", "let ");
    let stripped2 = s2.replace("let mut ", "let ");
    if stripped1 == stripped2 {
        if s1.contains("let mut ") {
            Some(Replacement::new("let mut", "let", ReplacementKind::MutModifier))
        } else {
            Some(Replacement::new("let", "let mut", ReplacementKind::MutModifier))
        }
    } else {
        None
    }
}

/// Texts equal once `self.` qualification is ignored
pub fn differ_only_in_self_qualifier(s1: &str, s2: &str) -> Option<Replacement> {
    if s1 == s2 {
        return None;
    }
    let stripped1 = s1.replace("self.", "");
    let stripped2 = s2.replace("self.", "");
    if stripped1 == stripped2 {
        if s1.contains("self.") {
            Some(Replacement::new("self.", "", ReplacementKind::SelfQualifier))
        } else {
            Some(Replacement::new("", "self.", ReplacementKind::SelfQualifier))
        }
    } else {
        None
    }
}

const PREFIX_OPERATORS: &[&str] = &["!", "-", "*", "&", "&mut "];

/// The difference is a cast suffix or a prefix operator bracketed by a
/// common prefix and suffix
pub fn differ_only_in_cast_or_prefix_operator(s1: &str, s2: &str) -> bool {
    if s1 == s2 {
        return false;
    }
    let (diff1, diff2) = bracketed_difference(s1, s2);
    let one_sided = |present: &str, absent: &str| {
        absent.is_empty()
            && (PREFIX_OPERATORS.contains(&present)
                || present.starts_with("as ")
                || (present.starts_with(" as ") && !present.contains(';')))
    };
    one_sided(diff1.trim_end(), diff2.trim()) || one_sided(diff2.trim_end(), diff1.trim())
}

/// `cond` on one side, `!cond` (or the operator-inverted form) on the other
pub fn invert_conditional(s1: &str, s2: &str) -> Option<Replacement> {
    let t1 = s1.trim();
    let t2 = s2.trim();
    let inverted = |plain: &str, negated: &str| {
        negated.strip_prefix('!').map_or(false, |rest| {
            let rest = rest.trim_start();
            rest == plain
                || (rest.starts_with('(')
                    && rest.ends_with(')')
                    && rest[1..rest.len() - 1].trim() == plain)
        })
    };
    if inverted(t1, t2) || inverted(t2, t1) {
        return Some(Replacement::new(t1, t2, ReplacementKind::InvertConditional));
    }
    let flipped = |a: &str, b: &str, op1: &str, op2: &str| {
        a.contains(op1) && b == a.replacen(op1, op2, 1)
    };
    if flipped(t1, t2, "==", "!=")
        || flipped(t1, t2, "!=", "==")
        || flipped(t2, t1, "==", "!=")
        || flipped(t2, t1, "!=", "==")
    {
        return Some(Replacement::new(t1, t2, ReplacementKind::InvertConditional));
    }
    None
}

/// Split a conditional into its sub-clauses
pub fn conditional_clauses(s: &str) -> Vec<String> {
    SPLIT_CONDITIONAL_PATTERN
        .split(s)
        .map(|c| c.trim().trim_matches(|c: char| c == '(' || c == ')').trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// The two conditionals share at least one sub-clause after splitting on
/// `&&`/`||`, and every recorded operator replacement is a legal inversion
pub fn common_conditional(s1: &str, s2: &str, info: &mut ReplacementInfo) -> bool {
    if !(s1.contains("&&") || s1.contains("||") || s2.contains("&&") || s2.contains("||")) {
        return false;
    }
    let clauses1 = conditional_clauses(s1);
    let clauses2 = conditional_clauses(s2);
    let common: Vec<&String> = clauses1.iter().filter(|c| clauses2.contains(c)).collect();
    if common.is_empty() {
        // an inverted clause still counts as shared structure
        let inverted = clauses1.iter().any(|c1| {
            clauses2
                .iter()
                .any(|c2| invert_conditional(c1, c2).is_some())
        });
        if !inverted {
            return false;
        }
        for c1 in &clauses1 {
            for c2 in &clauses2 {
                if let Some(replacement) = invert_conditional(c1, c2) {
                    info.add_replacement(replacement);
                }
            }
        }
        return true;
    }
    !common.is_empty()
}

const VALID_OPERATOR_PAIRS: &[(&str, &str)] = &[("==", "!="), ("!=", "=="), ("&&", "||"), ("||", "&&")];

/// Only `==`↔`!=` and `&&`↔`||` are legal single-operator replacements;
/// anything else marks the pair incoherent
pub fn contains_valid_operator_replacements(info: &ReplacementInfo) -> bool {
    info.replacements()
        .iter()
        .filter(|r| r.kind().same_kind(&ReplacementKind::InfixOperator))
        .all(|r| {
            VALID_OPERATOR_PAIRS
                .iter()
                .any(|(a, b)| r.before() == *a && r.after() == *b)
        })
}

/// Pull `(name, right-hand side)` out of a `let` statement
fn declaration_parts(s: &str) -> Option<(String, String)> {
    let trimmed = s.trim_end().trim_end_matches(';');
    let rest = trimmed.strip_prefix("let ")?;
    let eq = rest.find('=')?;
    let lhs = rest[..eq].trim();
    let name = lhs
        .trim_start_matches("mut ")
        .split(':')
        .next()?
        .trim()
        .to_string();
    Some((name, rest[eq + 1..].trim().to_string()))
}

/// Pull `(target, right-hand side)` out of a plain assignment
fn assignment_parts(s: &str) -> Option<(String, String)> {
    let trimmed = s.trim_end().trim_end_matches(';');
    if trimmed.starts_with("let ") || trimmed.starts_with("return") {
        return None;
    }
    let eq = trimmed.find('=')?;
    // skip compound and comparison operators
    let before = trimmed.as_bytes()[..eq].last().copied();
    let after = trimmed.as_bytes().get(eq + 1).copied();
    if matches!(before, Some(b'+') | Some(b'-') | Some(b'*') | Some(b'/') | Some(b'%') | Some(b'!') | Some(b'<') | Some(b'>'))
        || after == Some(b'=')
    {
        return None;
    }
    Some((
        trimmed[..eq].trim().to_string(),
        trimmed[eq + 1..].trim().to_string(),
    ))
}

/// `let x = E;` on one side, `x = E;` on the other
pub fn declaration_vs_assignment(s1: &str, s2: &str, info: &mut ReplacementInfo) -> bool {
    let pair = declaration_parts(s1)
        .zip(assignment_parts(s2))
        .or_else(|| declaration_parts(s2).zip(assignment_parts(s1)));
    match pair {
        Some(((name1, rhs1), (name2, rhs2))) => {
            if rhs1 != rhs2 {
                return false;
            }
            if name1 != name2 {
                info.add_replacement(Replacement::new(name1, name2, ReplacementKind::VariableName));
            }
            true
        }
        None => false,
    }
}

/// `let x = E;` on one side, `return E;` on the other
pub fn declaration_vs_return(s1: &str, s2: &str) -> bool {
    let returned = |s: &str| -> Option<String> {
        s.trim_end()
            .trim_end_matches(';')
            .strip_prefix("return ")
            .map(|r| r.trim().to_string())
    };
    match (declaration_parts(s1), returned(s2)) {
        (Some((_, rhs)), Some(expr)) if rhs == expr => return true,
        _ => {}
    }
    matches!(
        (declaration_parts(s2), returned(s1)),
        (Some((_, rhs)), Some(expr)) if rhs == expr
    )
}

/// Two distinct variables on side 1 collapsed into one on side 2 (or the
/// reverse): surfaces as multiple renames sharing an endpoint
pub fn equal_after_argument_merge(info: &mut ReplacementInfo) -> bool {
    let renames: Vec<(String, String)> = info
        .replacements_of_kind(ReplacementKind::VariableName)
        .iter()
        .map(|r| (r.before().to_string(), r.after().to_string()))
        .collect();
    let mut merged = false;
    for (_, after) in &renames {
        let sources: Vec<&String> = renames
            .iter()
            .filter(|(_, a)| a == after)
            .map(|(b, _)| b)
            .collect();
        if sources.len() >= 2 {
            let before = sources
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(",");
            info.add_replacement(Replacement::new(
                before,
                after.clone(),
                ReplacementKind::MergeVariable,
            ));
            merged = true;
        }
    }
    merged && info.texts_equal_after_merge()
}

/// The argument list grew: every surviving argument matches and each extra
/// is a plain identifier (a newly added parameter or attribute)
pub fn equal_after_new_argument_additions(
    fragment1: &CodeFragment,
    fragment2: &CodeFragment,
    info: &mut ReplacementInfo,
) -> bool {
    let call1 = match fragment1.invocation_covering_entire_fragment() {
        Some(c) => c,
        None => return false,
    };
    let call2 = match fragment2.invocation_covering_entire_fragment() {
        Some(c) => c,
        None => return false,
    };
    if !call1.identical_name(call2) || call1.arguments.len() >= call2.arguments.len() {
        return false;
    }
    // the old arguments must survive as a subsequence of the new list
    let mut position = 0usize;
    for argument in &call1.arguments {
        match call2.arguments[position..].iter().position(|a| {
            a == argument
                || info
                    .replacements()
                    .iter()
                    .any(|r| r.before() == argument && r.after() == a)
        }) {
            Some(offset) => position += offset + 1,
            None => return false,
        }
    }
    let extras: Vec<&String> = call2
        .arguments
        .iter()
        .filter(|a| !call1.arguments.contains(a))
        .collect();
    if extras.is_empty() {
        return false;
    }
    let plain_identifier =
        |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if !extras.iter().all(|e| plain_identifier(e)) {
        return false;
    }
    for extra in extras {
        info.add_replacement(Replacement::new("", extra.clone(), ReplacementKind::AddVariable));
    }
    true
}

/// One old variable fans out into several new arguments
pub fn split_variable_replacement(info: &mut ReplacementInfo) -> bool {
    let renames: Vec<(String, String)> = info
        .replacements_of_kind(ReplacementKind::VariableName)
        .iter()
        .map(|r| (r.before().to_string(), r.after().to_string()))
        .collect();
    let mut split = false;
    for (before, _) in &renames {
        let targets: Vec<&String> = renames
            .iter()
            .filter(|(b, _)| b == before)
            .map(|(_, a)| a)
            .collect();
        if targets.len() >= 2 {
            let after = targets
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(",");
            info.add_replacement(Replacement::new(
                before.clone(),
                after,
                ReplacementKind::SplitVariable,
            ));
            split = true;
        }
    }
    split
}

/// Covering calls agree except the argument order: `f(a, b)` vs `f(b, a)`
pub fn swapped_arguments(
    fragment1: &CodeFragment,
    fragment2: &CodeFragment,
) -> Option<Replacement> {
    let call1 = fragment1.invocation_covering_entire_fragment()?;
    let call2 = fragment2.invocation_covering_entire_fragment()?;
    if call1.identical_name(call2)
        && call1.identical_receiver(call2)
        && call1.swapped_arguments(call2)
    {
        return Some(Replacement::new(
            call1.arguments.join(", "),
            call2.arguments.join(", "),
            ReplacementKind::SwapArgument,
        ));
    }
    None
}

/// Concatenation folding: tokens joined by `+` on one side collapse into a
/// single literal on the other
pub fn common_concat(s1: &str, s2: &str, info: &mut ReplacementInfo) -> Option<Replacement> {
    if !s1.contains('+') && !s2.contains('+') {
        return None;
    }
    let fold = |concatenated: &str, folded: &str| -> Option<Replacement> {
        let tokens: Vec<String> = SPLIT_CONCAT_PATTERN
            .split(concatenated.trim())
            .map(|t| t.trim().to_string())
            .collect();
        if tokens.len() < 2 {
            return None;
        }
        if !tokens.iter().all(|t| t.starts_with('"') && t.ends_with('"') && t.len() >= 2) {
            return None;
        }
        let joined: String = tokens
            .iter()
            .map(|t| &t[1..t.len() - 1])
            .collect::<Vec<_>>()
            .join("");
        let folded_content = folded.trim();
        if folded_content.starts_with('"')
            && folded_content.ends_with('"')
            && folded_content.len() >= 2
            && folded_content[1..folded_content.len() - 1] == joined
        {
            Some(Replacement::new(
                concatenated.trim(),
                folded_content,
                ReplacementKind::Concatenation,
            ))
        } else {
            None
        }
    };
    let (expr1, expr2) = (main_expression(s1), main_expression(s2));
    let replacement = fold(&expr1, &expr2).or_else(|| fold(&expr2, &expr1))?;
    info.add_replacement(replacement.clone());
    Some(replacement)
}

fn main_expression(s: &str) -> String {
    let mut t = s.trim_end().trim_end_matches(';').trim();
    if let Some(rest) = t.strip_prefix("return ") {
        t = rest.trim();
    }
    if t.starts_with("let ") {
        if let Some(eq) = t.find('=') {
            t = t[eq + 1..].trim();
        }
    }
    t.to_string()
}

/// Rejection check: a declaration pair where the name, the type, and the
/// initializer were all replaced has nothing left in common
pub fn variable_declarations_with_everything_replaced(
    fragment1: &CodeFragment,
    fragment2: &CodeFragment,
    info: &ReplacementInfo,
) -> bool {
    let declarations1 = &fragment1.variable_declarations;
    let declarations2 = &fragment2.variable_declarations;
    if declarations1.len() != 1 || declarations2.len() != 1 {
        return false;
    }
    let d1 = &declarations1[0];
    let d2 = &declarations2[0];
    let name_replaced = d1.name != d2.name;
    let type_replaced = match (&d1.type_annotation, &d2.type_annotation) {
        (Some(t1), Some(t2)) => t1 != t2,
        (None, None) => false,
        _ => true,
    };
    let initializer_replaced = match (&d1.initializer, &d2.initializer) {
        (Some(i1), Some(i2)) => {
            let mut text = i1.clone();
            for replacement in info.replacements() {
                text = substitute_token(&text, replacement.before(), replacement.after());
            }
            text != *i2 || {
                // every part substituted counts as replaced even when the
                // final texts line up
                info.replacements()
                    .iter()
                    .any(|r| r.before() == i1.as_str() && r.after() == i2.as_str())
            }
        }
        (None, None) => false,
        _ => true,
    };
    name_replaced && type_replaced && initializer_replaced
}

/// Rejection check: an assignment pair with both sides of `=` replaced
pub fn variable_assignment_with_everything_replaced(
    s1: &str,
    s2: &str,
    info: &ReplacementInfo,
) -> bool {
    let (lhs1, rhs1) = match assignment_parts(s1) {
        Some(parts) => parts,
        None => return false,
    };
    let (lhs2, rhs2) = match assignment_parts(s2) {
        Some(parts) => parts,
        None => return false,
    };
    let replaced = |before: &str, after: &str| {
        before != after
            && info
                .replacements()
                .iter()
                .any(|r| contains_token(before, r.before()) || r.before() == before)
            && info
                .replacements()
                .iter()
                .any(|r| contains_token(after, r.after()) || r.after() == after)
    };
    replaced(&lhs1, &lhs2) && replaced(&rhs1, &rhs2)
}

/// Name-compatibility cutoff for covering-call replacements
const NAME_COMPATIBILITY_THRESHOLD: f64 = 0.5;

/// Rejection check: both statements are covered by a single call, and the
/// two calls share neither name similarity nor argument evidence, so a
/// substitution of one whole call for the other explains nothing. Identical
/// argument lists (including both empty) are sufficient evidence on their
/// own; otherwise a compatible name plus at least one shared argument is
/// required.
pub fn invocation_with_everything_replaced(
    fragment1: &CodeFragment,
    fragment2: &CodeFragment,
) -> bool {
    let call1 = match fragment1.invocation_covering_entire_fragment() {
        Some(c) => c,
        None => return false,
    };
    let call2 = match fragment2.invocation_covering_entire_fragment() {
        Some(c) => c,
        None => return false,
    };
    if call1.name == call2.name {
        return false;
    }
    if call1.equal_arguments(call2) {
        return false;
    }
    let name_compatible = call1.name.contains(&call2.name)
        || call2.name.contains(&call1.name)
        || crate::distance::normalized_distance(&call1.name, &call2.name)
            < NAME_COMPATIBILITY_THRESHOLD;
    let shared_arguments = !call1.argument_intersection(call2).is_empty();
    !(name_compatible && shared_arguments)
}

/// Rejection check: a creation pair where the created type and every
/// argument changed, unless the types are visibly compatible or one side
/// takes no arguments
pub fn creation_with_everything_replaced(
    fragment1: &CodeFragment,
    fragment2: &CodeFragment,
    info: &ReplacementInfo,
) -> bool {
    let creation1 = match fragment1.creation_covering_entire_fragment() {
        Some(c) => c,
        None => return false,
    };
    let creation2 = match fragment2.creation_covering_entire_fragment() {
        Some(c) => c,
        None => return false,
    };
    if creation1.name == creation2.name {
        return false;
    }
    // zero-argument accommodation
    if creation1.arguments.is_empty() || creation2.arguments.is_empty() {
        return false;
    }
    // type compatibility: one type name embeds the other
    let compatible = creation1.name.contains(&creation2.name) || creation2.name.contains(&creation1.name);
    if compatible {
        return false;
    }
    let common: Vec<_> = creation1
        .arguments
        .iter()
        .filter(|a| creation2.arguments.contains(a))
        .collect();
    if !common.is_empty() {
        return false;
    }
    // no shared arguments and a foreign type: coherent only when each old
    // argument is individually explained by a recorded replacement
    let all_explained = creation1.arguments.iter().all(|argument| {
        info.replacements()
            .iter()
            .any(|r| r.before() == argument.as_str())
    });
    !all_explained
}

impl ReplacementInfo {
    /// Texts equal once merge replacements collapse their sources
    fn texts_equal_after_merge(&self) -> bool {
        let mut text = self.argumentized_string1().to_string();
        for replacement in self.replacements() {
            if replacement.kind().same_kind(&ReplacementKind::MergeVariable) {
                for source in replacement.before().split(',') {
                    text = substitute_token(&text, source, replacement.after());
                }
            }
        }
        text == self.argumentized_string2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_and_suffix() {
        assert_eq!(common_prefix("return a;\n", "return b;\n"), "return ");
        assert_eq!(common_suffix("return a;\n", "return b;\n", 7), ";\n");
    }

    #[test]
    fn mut_modifier_only_difference() {
        let r = differ_only_in_mut_modifier("let mut x = 0;\n", "let x = 0;\n").unwrap();
        assert!(r.kind().same_kind(&ReplacementKind::MutModifier));
        assert!(differ_only_in_mut_modifier("let mut x = 0;\n", "let y = 0;\n").is_none());
    }

    #[test]
    fn self_qualifier_only_difference() {
        let r = differ_only_in_self_qualifier("self.count += 1;\n", "count += 1;\n").unwrap();
        assert!(r.kind().same_kind(&ReplacementKind::SelfQualifier));
    }

    #[test]
    fn cast_bracketed_by_common_text() {
        assert!(differ_only_in_cast_or_prefix_operator(
            "let w = size as u64;\n",
            "let w = size;\n"
        ));
        assert!(differ_only_in_cast_or_prefix_operator(
            "ready = !flag;\n",
            "ready = flag;\n"
        ));
        assert!(!differ_only_in_cast_or_prefix_operator(
            "ready = flag;\n",
            "ready = other;\n"
        ));
    }

    #[test]
    fn invert_conditional_forms() {
        assert!(invert_conditional("done", "!done").is_some());
        assert!(invert_conditional("a == b", "a != b").is_some());
        assert!(invert_conditional("a == b", "a < b").is_none());
    }

    #[test]
    fn operator_replacement_validity() {
        let mut info = ReplacementInfo::new("a && b".into(), "a || b".into());
        info.add_replacement(Replacement::new("&&", "||", ReplacementKind::InfixOperator));
        assert!(contains_valid_operator_replacements(&info));
        info.add_replacement(Replacement::new("+", "-", ReplacementKind::InfixOperator));
        assert!(!contains_valid_operator_replacements(&info));
    }

    #[test]
    fn declaration_assignment_equivalence() {
        let mut info = ReplacementInfo::new("let x = foo();\n".into(), "x = foo();\n".into());
        assert!(declaration_vs_assignment(
            "let x = foo();\n",
            "x = foo();\n",
            &mut info
        ));
        assert!(!declaration_vs_assignment(
            "let x = foo();\n",
            "x = bar();\n",
            &mut info
        ));
    }

    #[test]
    fn declaration_return_equivalence() {
        assert!(declaration_vs_return(
            "let result = compute(a);\n",
            "return compute(a);\n"
        ));
        assert!(!declaration_vs_return(
            "let result = compute(a);\n",
            "return compute(b);\n"
        ));
    }

    #[test]
    fn concat_folding() {
        let mut info = ReplacementInfo::new(
            "log(\"a\" + \"b\");\n".into(),
            "log(\"ab\");\n".into(),
        );
        let r = common_concat("\"a\" + \"b\"", "\"ab\"", &mut info).unwrap();
        assert!(r.kind().same_kind(&ReplacementKind::Concatenation));
    }

    #[test]
    fn conditional_clause_overlap() {
        let mut info = ReplacementInfo::new(String::new(), String::new());
        assert!(common_conditional(
            "if a > 0 && b < 10",
            "if a > 0 || c != 0",
            &mut info
        ));
        assert!(!common_conditional("if a > 0", "if b < 10", &mut info));
    }
}
