//! Replacement detection
//!
//! `find_replacements` is the core primitive: given the leftover "before"
//! and "after" token sets of one category, try every cross substitution on
//! side 1's working text and keep, per before-token, the single candidate
//! that lowers the edit distance the most. `classify` drives the primitive
//! across every token category and then asks the heuristics bank whether
//! the pair is coherently explained; `None` means the candidate pair is
//! rejected and the fragments fall through to looser matching passes.

use std::collections::BTreeMap;

use crate::core::call::CallKind;
use crate::core::fragment::CodeFragment;
use crate::distance::edit_distance_bounded;
use crate::replacement::heuristics;
use crate::replacement::info::ReplacementInfo;
use crate::replacement::util::{same_chars_before_after, substitute_token, substitute_token_pairwise};
use crate::replacement::{Direction, Replacement, ReplacementKind};

/// Ordered set semantics over a plain vector
fn remove_common_elements(set1: &mut Vec<String>, set2: &mut Vec<String>) {
    let common: Vec<String> = set1.iter().filter(|s| set2.contains(s)).cloned().collect();
    set1.retain(|s| !common.contains(s));
    set2.retain(|s| !common.contains(s));
}

/// Substitute formal parameters with actual arguments inside a token set
fn replace_parameters_with_arguments(
    set: &mut Vec<String>,
    parameter_to_argument: &BTreeMap<String, String>,
) {
    for token in set.iter_mut() {
        for (parameter, argument) in parameter_to_argument {
            if parameter != argument {
                *token = substitute_token(token, parameter, argument);
            }
        }
    }
}

/// The core primitive: one category of before/after token sets
pub fn find_replacements(
    before_tokens: &[String],
    after_tokens: &[String],
    info: &mut ReplacementInfo,
    kind: ReplacementKind,
) {
    if before_tokens.is_empty() || after_tokens.is_empty() {
        return;
    }
    for before in before_tokens {
        if info.raw_distance() == 0 {
            break;
        }
        let initial = info.raw_distance();
        let mut best: Option<(f64, Replacement, String)> = None;
        for after in after_tokens {
            let substituted = substitute_token_pairwise(
                info.argumentized_string1(),
                info.argumentized_string2(),
                before,
                after,
            );
            if substituted == info.argumentized_string1() {
                continue;
            }
            let raw = match edit_distance_bounded(&substituted, info.argumentized_string2(), initial)
            {
                Some(d) if d < initial => d,
                _ => continue,
            };
            let normalized = raw as f64
                / substituted
                    .chars()
                    .count()
                    .max(info.argumentized_string2().chars().count()) as f64;
            let better = match &best {
                Some((best_distance, _, _)) => normalized < *best_distance,
                None => true,
            };
            if better {
                best = Some((
                    normalized,
                    Replacement::new(before.clone(), after.clone(), kind),
                    substituted,
                ));
            }
        }
        if let Some((_, replacement, substituted)) = best {
            info.set_argumentized_string1(substituted);
            info.add_replacement(replacement);
        }
    }
}

/// Both names are plain identifiers starting in the same case class
fn variables_start_with_same_case(s1: &str, s2: &str) -> bool {
    let first = |s: &str| s.chars().next();
    match (first(s1), first(s2)) {
        (Some(c1), Some(c2)) => {
            (c1.is_lowercase() && c2.is_lowercase())
                || (c1.is_uppercase() && c2.is_uppercase())
                || (c1 == '_' && c2 == '_')
                || c1 == c2
        }
        _ => false,
    }
}

/// Outcome of classifying one candidate fragment pair
#[derive(Clone, Debug)]
pub struct Classification {
    /// The pair is the same statement intent, textual differences explained
    pub equivalent: bool,
    pub replacements: Vec<Replacement>,
}

/// Classify a textually different but candidate-matched fragment pair.
/// Returns `None` when no coherent explanation exists.
pub fn classify(
    fragment1: &CodeFragment,
    fragment2: &CodeFragment,
    argumentized1: &str,
    argumentized2: &str,
    parameter_to_argument: &BTreeMap<String, String>,
) -> Option<Classification> {
    let mut info = ReplacementInfo::new(argumentized1.to_string(), argumentized2.to_string());

    // cheap whole-statement shapes first
    if let Some(replacement) = heuristics::differ_only_in_mut_modifier(argumentized1, argumentized2)
    {
        info.add_replacement(replacement);
        return Some(finish(info, true));
    }
    if let Some(replacement) =
        heuristics::differ_only_in_self_qualifier(argumentized1, argumentized2)
    {
        info.add_replacement(replacement);
        return Some(finish(info, true));
    }
    if let Some(replacement) = heuristics::swapped_arguments(fragment1, fragment2) {
        info.add_replacement(replacement);
        return Some(finish(info, true));
    }

    // variable sets, minus the intersection
    let mut variables1: Vec<String> = fragment1.variables.clone();
    let mut variables2: Vec<String> = fragment2.variables.clone();
    let intersection: Vec<String> = variables1
        .iter()
        .filter(|v| variables2.contains(v))
        .cloned()
        .collect();
    let mut kept_intersection = Vec::new();
    for variable in &intersection {
        // a bare name that appears `self.`-qualified on exactly one side is
        // not really common
        let qualified = format!("self.{}", variable);
        if !variable.starts_with("self.")
            && !intersection.contains(&qualified)
            && (variables1.contains(&qualified) || variables2.contains(&qualified))
        {
            continue;
        }
        // all-uppercase constants stay in the intersection only when their
        // surrounding characters agree
        if !variable.is_empty()
            && *variable == variable.to_uppercase()
            && variable.chars().any(|c| c.is_alphabetic())
            && !same_chars_before_after(&fragment1.text, &fragment2.text, variable)
        {
            continue;
        }
        kept_intersection.push(variable.clone());
    }
    variables1.retain(|v| !kept_intersection.contains(v));
    variables2.retain(|v| !kept_intersection.contains(v));
    replace_parameters_with_arguments(&mut variables1, parameter_to_argument);
    replace_parameters_with_arguments(&mut variables2, parameter_to_argument);

    // invocation text sets; the covering call stays in the pool so a
    // variable that became a whole call (or the reverse) is explainable
    let mut invocations1: Vec<String> = fragment1
        .method_invocations
        .iter()
        .filter(|c| c.kind != CallKind::MethodRef)
        .map(|c| c.text.clone())
        .collect();
    let mut invocations2: Vec<String> = fragment2
        .method_invocations
        .iter()
        .filter(|c| c.kind != CallKind::MethodRef)
        .map(|c| c.text.clone())
        .collect();
    remove_common_elements(&mut invocations1, &mut invocations2);
    replace_parameters_with_arguments(&mut invocations1, parameter_to_argument);
    replace_parameters_with_arguments(&mut invocations2, parameter_to_argument);

    // a call argument collapsed into a plain variable
    let mut arguments1 = fragment1.arguments.clone();
    let mut arguments2 = fragment2.arguments.clone();
    remove_common_elements(&mut arguments1, &mut arguments2);
    find_replacements(
        &arguments1,
        &variables2,
        &mut info,
        ReplacementKind::ArgumentReplacedWithVariable,
    );

    // type replacements
    let mut types1 = fragment1.types.clone();
    let mut types2 = fragment2.types.clone();
    remove_common_elements(&mut types1, &mut types2);
    find_replacements(&types1, &types2, &mut info, ReplacementKind::Type);

    // operator replacements
    let mut operators1 = fragment1.infix_operators.clone();
    let mut operators2 = fragment2.infix_operators.clone();
    remove_common_elements(&mut operators1, &mut operators2);
    find_replacements(&operators1, &operators2, &mut info, ReplacementKind::InfixOperator);

    // the main minimization over variables and invocations together
    if info.raw_distance() > 0 {
        let mut before_tokens: Vec<(String, bool)> = Vec::new();
        before_tokens.extend(invocations1.iter().map(|s| (s.clone(), true)));
        before_tokens.extend(variables1.iter().map(|s| (s.clone(), false)));
        let mut after_tokens: Vec<(String, bool)> = Vec::new();
        after_tokens.extend(invocations2.iter().map(|s| (s.clone(), true)));
        after_tokens.extend(variables2.iter().map(|s| (s.clone(), false)));

        for (before, before_is_call) in &before_tokens {
            let initial = info.raw_distance();
            if initial == 0 {
                break;
            }
            let mut best: Option<(f64, Replacement, String)> = None;
            for (after, after_is_call) in &after_tokens {
                let substituted = substitute_token_pairwise(
                    info.argumentized_string1(),
                    info.argumentized_string2(),
                    before,
                    after,
                );
                if substituted == info.argumentized_string1() {
                    continue;
                }
                let raw =
                    match edit_distance_bounded(&substituted, info.argumentized_string2(), initial)
                    {
                        Some(d) if d < initial => d,
                        _ => continue,
                    };
                let replacement = match (*before_is_call, *after_is_call) {
                    (false, false) => {
                        if !variables_start_with_same_case(before, after) {
                            continue;
                        }
                        Replacement::new(before.clone(), after.clone(), ReplacementKind::VariableName)
                    }
                    (false, true) => Replacement::new(
                        before.clone(),
                        after.clone(),
                        ReplacementKind::VariableReplacedWithInvocation(
                            Direction::VariableToInvocation,
                        ),
                    ),
                    (true, false) => Replacement::new(
                        before.clone(),
                        after.clone(),
                        ReplacementKind::VariableReplacedWithInvocation(
                            Direction::InvocationToVariable,
                        ),
                    ),
                    (true, true) => {
                        Replacement::new(before.clone(), after.clone(), ReplacementKind::MethodInvocation)
                    }
                };
                let normalized = raw as f64
                    / substituted
                        .chars()
                        .count()
                        .max(info.argumentized_string2().chars().count())
                        as f64;
                let better = match &best {
                    Some((best_distance, _, _)) => normalized < *best_distance,
                    None => true,
                };
                if better {
                    best = Some((normalized, replacement, substituted));
                }
            }
            if let Some((distance, replacement, substituted)) = best {
                info.set_argumentized_string1(substituted);
                info.add_replacement(replacement);
                if distance == 0.0 {
                    break;
                }
            }
        }
    }

    // creation replacements
    let mut creations1: Vec<String> = fragment1.creations.iter().map(|c| c.text.clone()).collect();
    let mut creations2: Vec<String> = fragment2.creations.iter().map(|c| c.text.clone()).collect();
    remove_common_elements(&mut creations1, &mut creations2);
    find_replacements(&creations1, &creations2, &mut info, ReplacementKind::Creation);

    // literal replacements
    let mut string_literals1 = fragment1.string_literals.clone();
    let mut string_literals2 = fragment2.string_literals.clone();
    remove_common_elements(&mut string_literals1, &mut string_literals2);
    find_replacements(
        &string_literals1,
        &string_literals2,
        &mut info,
        ReplacementKind::StringLiteral,
    );

    let mut number_literals1 = fragment1.number_literals.clone();
    let mut number_literals2 = fragment2.number_literals.clone();
    remove_common_elements(&mut number_literals1, &mut number_literals2);
    find_replacements(
        &number_literals1,
        &number_literals2,
        &mut info,
        ReplacementKind::NumberLiteral,
    );
    if !fragment1.text.ends_with("= 0;\n") {
        find_replacements(
            &number_literals1,
            &variables2,
            &mut info,
            ReplacementKind::VariableReplacedWithNumberLiteral,
        );
    }

    find_replacements(
        &variables1,
        &fragment2.array_accesses,
        &mut info,
        ReplacementKind::VariableReplacedWithArrayAccess,
    );
    find_replacements(
        &fragment1.array_accesses,
        &variables2,
        &mut info,
        ReplacementKind::VariableReplacedWithArrayAccess,
    );
    find_replacements(
        &variables1,
        &fragment2.prefix_expressions,
        &mut info,
        ReplacementKind::VariableReplacedWithPrefixExpression,
    );
    find_replacements(
        &fragment1.prefix_expressions,
        &variables2,
        &mut info,
        ReplacementKind::VariableReplacedWithPrefixExpression,
    );
    find_replacements(
        &string_literals1,
        &variables2,
        &mut info,
        ReplacementKind::VariableReplacedWithStringLiteral,
    );
    if fragment1.null_literals.is_empty() && !fragment2.null_literals.is_empty() {
        let null2 = vec!["None".to_string()];
        find_replacements(
            &variables1,
            &null2,
            &mut info,
            ReplacementKind::VariableReplacedWithNullLiteral,
        );
    }
    if !fragment1.null_literals.is_empty() && fragment2.null_literals.is_empty() {
        let null1 = vec!["None".to_string()];
        find_replacements(&null1, &variables2, &mut info, ReplacementKind::NullLiteral);
    }
    let ends_with_bool = |text: &str| text.ends_with("= true;\n") || text.ends_with("= false;\n");
    if !ends_with_bool(&fragment1.text) {
        let mut bool_literals1 = fragment1.bool_literals.clone();
        let mut bool_literals2 = fragment2.bool_literals.clone();
        remove_common_elements(&mut bool_literals1, &mut bool_literals2);
        find_replacements(
            &bool_literals1,
            &variables2,
            &mut info,
            ReplacementKind::BooleanReplacedWithVariable,
        );
        if !ends_with_bool(&fragment2.text) {
            find_replacements(
                &bool_literals1,
                &bool_literals2,
                &mut info,
                ReplacementKind::BooleanLiteral,
            );
        }
    }

    // the equivalence verdict
    let s1 = info.argumentized_string1().to_string();
    let s2 = info.argumentized_string2().to_string();
    let strip_header = |s: &str| {
        s.strip_prefix("if ")
            .or_else(|| s.strip_prefix("while "))
            .map(|rest| rest.to_string())
    };
    if let (Some(condition1), Some(condition2)) = (strip_header(&s1), strip_header(&s2)) {
        if let Some(replacement) = heuristics::invert_conditional(&condition1, &condition2) {
            info.add_replacement(replacement);
            return Some(finish(info, true));
        }
    }
    let equivalent = info.texts_equal()
        || heuristics::differ_only_in_cast_or_prefix_operator(&s1, &s2)
        || heuristics::declaration_vs_assignment(&s1, &s2, &mut info)
        || heuristics::declaration_vs_return(&s1, &s2)
        || heuristics::declaration_vs_return(&fragment1.text, &fragment2.text)
        || (heuristics::common_conditional(&s1, &s2, &mut info)
            && heuristics::contains_valid_operator_replacements(&info))
        || heuristics::equal_after_argument_merge(&mut info)
        || heuristics::equal_after_new_argument_additions(fragment1, fragment2, &mut info)
        || heuristics::common_concat(&s1, &s2, &mut info).is_some();

    if !equivalent {
        // expose whatever was learned; the caller decides whether a fuzzy
        // pass can still use it
        return Some(finish(info, false));
    }
    if !heuristics::contains_valid_operator_replacements(&info) {
        return None;
    }
    heuristics::split_variable_replacement(&mut info);
    if heuristics::variable_declarations_with_everything_replaced(fragment1, fragment2, &info) {
        return None;
    }
    if heuristics::variable_assignment_with_everything_replaced(
        &fragment1.text,
        &fragment2.text,
        &info,
    ) {
        return None;
    }
    if heuristics::creation_with_everything_replaced(fragment1, fragment2, &info) {
        return None;
    }
    if heuristics::invocation_with_everything_replaced(fragment1, fragment2) {
        return None;
    }
    // a covering-call rename that survived everything else becomes a typed
    // invocation replacement
    if let (Some(call1), Some(call2)) = (
        fragment1.invocation_covering_entire_fragment(),
        fragment2.invocation_covering_entire_fragment(),
    ) {
        let already_explained = info.replacements().iter().any(|r| {
            r.before() == call1.text
                || r.after() == call2.text
                || r.before() == call1.name
        });
        if !call1.identical_name(call2) && call1.compatible_receiver(call2) && !already_explained {
            let kind = if call1.equal_arguments(call2) && call1.identical_receiver(call2) {
                ReplacementKind::MethodInvocationName
            } else {
                ReplacementKind::MethodInvocation
            };
            let replacement = match kind {
                ReplacementKind::MethodInvocationName => {
                    Replacement::new(call1.name.clone(), call2.name.clone(), kind)
                }
                _ => Replacement::new(call1.text.clone(), call2.text.clone(), kind),
            };
            info.add_replacement(replacement);
        }
    }
    Some(finish(info, true))
}

fn finish(info: ReplacementInfo, equivalent: bool) -> Classification {
    Classification {
        equivalent,
        replacements: info.into_replacements(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::decompose;

    fn leaf_pair(body1: &str, body2: &str) -> (crate::core::StatementTree, crate::core::StatementTree) {
        let block1: syn::Block = syn::parse_str(&format!("{{ {} }}", body1)).unwrap();
        let block2: syn::Block = syn::parse_str(&format!("{{ {} }}", body2)).unwrap();
        (decompose(&block1), decompose(&block2))
    }

    fn classify_single(body1: &str, body2: &str) -> Option<Classification> {
        let (tree1, tree2) = leaf_pair(body1, body2);
        let leaf1 = tree1.leaves()[0];
        let leaf2 = tree2.leaves()[0];
        let fragment1 = tree1.get(leaf1);
        let fragment2 = tree2.get(leaf2);
        classify(
            fragment1,
            fragment2,
            &fragment1.text,
            &fragment2.text,
            &BTreeMap::new(),
        )
    }

    #[test]
    fn rename_produces_single_variable_replacement() {
        let classification = classify_single("let a = foo();", "let b = foo();").unwrap();
        assert!(classification.equivalent);
        assert_eq!(classification.replacements.len(), 1);
        let replacement = &classification.replacements[0];
        assert_eq!(replacement.before(), "a");
        assert_eq!(replacement.after(), "b");
        assert!(replacement.kind().same_kind(&ReplacementKind::VariableName));
    }

    #[test]
    fn variable_to_invocation_replacement() {
        let classification = classify_single("return size;", "return items.len();").unwrap();
        assert!(classification.equivalent);
        assert!(classification.replacements.iter().any(|r| r
            .kind()
            .same_kind(&ReplacementKind::VariableReplacedWithInvocation(
                Direction::VariableToInvocation
            ))));
    }

    #[test]
    fn incompatible_operator_change_is_rejected() {
        // `<` to `>=` is not a legal operator replacement
        let classification = classify_single("flag = a < b;", "flag = a >= b;");
        assert!(classification.is_none());
    }

    #[test]
    fn type_change_recorded() {
        let classification = classify_single("let n: i32 = read();", "let n: i64 = read();").unwrap();
        assert!(classification.equivalent);
        assert!(classification
            .replacements
            .iter()
            .any(|r| r.kind().same_kind(&ReplacementKind::Type)));
    }
}
