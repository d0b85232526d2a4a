//! Matching orchestration
//!
//! `BodyMapper` aligns the fragment trees of two operations through two
//! symmetric procedures, `process_leaves` and `process_inner_nodes`, each an
//! ordered cascade of passes over the same shrinking candidate lists:
//!
//! 1. exact text at equal depth,
//! 2. exact text at any depth (statements moved across nesting levels),
//! 3. exact after replacement classification (renames and friends),
//! 4. unique longest-common-substring above half the longer text,
//! 5. normalized edit distance under the fuzzy threshold.
//!
//! Stricter and cheaper criteria run first and exhaustively, so no fuzzy
//! match is attempted once an exact one exists, and no fragment is matched
//! twice: an accepted pair leaves both pools immediately. The remaining
//! lists are threaded functionally from pass to pass; what survives the
//! whole cascade lands in the non-mapped collections, the expected signal
//! for added or deleted code, not an error.

pub mod composite_mapping;
pub mod leaf_mapping;
pub mod mapping;

pub use composite_mapping::CompositeMapping;
pub use leaf_mapping::LeafMapping;
pub use mapping::{CodeMapping, MappingKind};

use std::collections::BTreeMap;

use im::Vector;

use crate::core::fragment::{FragmentId, StatementTree};
use crate::core::operation::Operation;
use crate::distance::{longest_common_substrings, normalized_distance_ignore_case};
use crate::replacement::find::classify;
use crate::replacement::util::substitute_token;
use crate::replacement::{Replacement, ReplacementKind};

/// Edit-distance cutoff for the fuzzy pass; load-bearing, do not tune
const EDIT_DISTANCE_THRESHOLD: f64 = 0.4;
/// Common-substring share of the longer text required by the fuzzy pass
const COMMON_SUBSTRING_RATIO: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    ExactDepth,
    Exact,
    Replacement,
    CommonSubstring,
    EditDistance,
}

const STRICT_PASSES: &[Pass] = &[Pass::ExactDepth, Pass::Exact, Pass::Replacement];
const FUZZY_PASSES: &[Pass] = &[Pass::CommonSubstring, Pass::EditDistance];

/// Which side of the comparison a fragment belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    T1,
    T2,
}

/// Aligns the statement trees of one operation pair. Constructed once,
/// mutated only during construction, read-only afterward.
#[derive(Clone, Debug)]
pub struct BodyMapper {
    operation1: Operation,
    operation2: Operation,
    parameter_to_argument: BTreeMap<String, String>,
    argumentized1: Vec<Option<String>>,
    argumentized2: Vec<Option<String>>,
    mappings: Vec<CodeMapping>,
    non_mapped_leaves_t1: Vec<FragmentId>,
    non_mapped_leaves_t2: Vec<FragmentId>,
    non_mapped_inner_nodes_t1: Vec<FragmentId>,
    non_mapped_inner_nodes_t2: Vec<FragmentId>,
    fuzzy_matching: bool,
}

impl BodyMapper {
    /// Map two operations with no parameter binding
    pub fn new(operation1: Operation, operation2: Operation) -> Self {
        Self::with_parameter_map(operation1, operation2, BTreeMap::new())
    }

    /// Map two operations without the fuzzy passes (4 and 5); exact and
    /// replacement matching only
    pub fn new_without_fuzzy(operation1: Operation, operation2: Operation) -> Self {
        Self::build(operation1, operation2, BTreeMap::new(), false)
    }

    /// Map two operations, substituting formal parameters with the given
    /// actual arguments before any textual comparison
    pub fn with_parameter_map(
        operation1: Operation,
        operation2: Operation,
        parameter_to_argument: BTreeMap<String, String>,
    ) -> Self {
        Self::build(operation1, operation2, parameter_to_argument, true)
    }

    fn build(
        operation1: Operation,
        operation2: Operation,
        parameter_to_argument: BTreeMap<String, String>,
        fuzzy_matching: bool,
    ) -> Self {
        let mut mapper = Self::prepare(operation1, operation2, parameter_to_argument, fuzzy_matching);
        let leaves1: Vector<FragmentId> = mapper.operation1.body.leaves().into_iter().collect();
        let leaves2: Vector<FragmentId> = mapper.operation2.body.leaves().into_iter().collect();
        let (leaves1, leaves2) = mapper.process_leaves(leaves1, leaves2);
        let inner1: Vector<FragmentId> = mapper.operation1.body.inner_nodes().into_iter().collect();
        let inner2: Vector<FragmentId> = mapper.operation2.body.inner_nodes().into_iter().collect();
        let (inner1, inner2) = mapper.process_inner_nodes(inner1, inner2);
        mapper.non_mapped_leaves_t1 = leaves1.into_iter().collect();
        mapper.non_mapped_leaves_t2 = leaves2.into_iter().collect();
        mapper.non_mapped_inner_nodes_t1 = inner1.into_iter().collect();
        mapper.non_mapped_inner_nodes_t2 = inner2.into_iter().collect();
        mapper
    }

    /// Incremental extension: match a parent mapper's leftover tree-1
    /// fragments (plus the header expressions of its unmapped composites)
    /// against the body of an extracted operation
    pub fn from_parent_with_added(
        parent: &BodyMapper,
        added_operation: Operation,
        parameter_to_argument: BTreeMap<String, String>,
    ) -> Self {
        let mut leaves1: Vector<FragmentId> =
            parent.non_mapped_leaves_t1.iter().copied().collect();
        for &inner in &parent.non_mapped_inner_nodes_t1 {
            for &expression in parent.operation1.body.expressions_of(inner) {
                leaves1.push_back(expression);
            }
        }
        let inner1: Vector<FragmentId> =
            parent.non_mapped_inner_nodes_t1.iter().copied().collect();
        let mut mapper = Self::prepare(
            parent.operation1.clone(),
            added_operation,
            parameter_to_argument,
            parent.fuzzy_matching,
        );
        let leaves2: Vector<FragmentId> = mapper.operation2.body.leaves().into_iter().collect();
        let inner2: Vector<FragmentId> = mapper.operation2.body.inner_nodes().into_iter().collect();
        let (leaves1, leaves2) = mapper.process_leaves(leaves1, leaves2);
        let (inner1, inner2) = mapper.process_inner_nodes(inner1, inner2);
        mapper.non_mapped_leaves_t1 = leaves1.into_iter().collect();
        mapper.non_mapped_leaves_t2 = leaves2.into_iter().collect();
        mapper.non_mapped_inner_nodes_t1 = inner1.into_iter().collect();
        mapper.non_mapped_inner_nodes_t2 = inner2.into_iter().collect();
        mapper
    }

    /// Incremental extension for the inlined direction: match a removed
    /// operation's body against the parent mapper's leftover tree-2 side
    pub fn from_parent_with_removed(
        parent: &BodyMapper,
        removed_operation: Operation,
        parameter_to_argument: BTreeMap<String, String>,
    ) -> Self {
        let mut leaves2: Vector<FragmentId> =
            parent.non_mapped_leaves_t2.iter().copied().collect();
        for &inner in &parent.non_mapped_inner_nodes_t2 {
            for &expression in parent.operation2.body.expressions_of(inner) {
                leaves2.push_back(expression);
            }
        }
        let inner2: Vector<FragmentId> =
            parent.non_mapped_inner_nodes_t2.iter().copied().collect();
        let mut mapper = Self::prepare(
            removed_operation,
            parent.operation2.clone(),
            parameter_to_argument,
            parent.fuzzy_matching,
        );
        let leaves1: Vector<FragmentId> = mapper.operation1.body.leaves().into_iter().collect();
        let inner1: Vector<FragmentId> = mapper.operation1.body.inner_nodes().into_iter().collect();
        let (leaves1, leaves2) = mapper.process_leaves(leaves1, leaves2);
        let (inner1, inner2) = mapper.process_inner_nodes(inner1, inner2);
        mapper.non_mapped_leaves_t1 = leaves1.into_iter().collect();
        mapper.non_mapped_leaves_t2 = leaves2.into_iter().collect();
        mapper.non_mapped_inner_nodes_t1 = inner1.into_iter().collect();
        mapper.non_mapped_inner_nodes_t2 = inner2.into_iter().collect();
        mapper
    }

    fn prepare(
        operation1: Operation,
        operation2: Operation,
        parameter_to_argument: BTreeMap<String, String>,
        fuzzy_matching: bool,
    ) -> Self {
        let argumentized1 = argumentize(&operation1.body, &parameter_to_argument);
        let argumentized2 = argumentize(&operation2.body, &parameter_to_argument);
        Self {
            operation1,
            operation2,
            parameter_to_argument,
            argumentized1,
            argumentized2,
            mappings: Vec::new(),
            non_mapped_leaves_t1: Vec::new(),
            non_mapped_leaves_t2: Vec::new(),
            non_mapped_inner_nodes_t1: Vec::new(),
            non_mapped_inner_nodes_t2: Vec::new(),
            fuzzy_matching,
        }
    }

    pub fn operation1(&self) -> &Operation {
        &self.operation1
    }

    pub fn operation2(&self) -> &Operation {
        &self.operation2
    }

    pub fn mappings(&self) -> &[CodeMapping] {
        &self.mappings
    }

    pub fn non_mapped_leaves_t1(&self) -> &[FragmentId] {
        &self.non_mapped_leaves_t1
    }

    pub fn non_mapped_leaves_t2(&self) -> &[FragmentId] {
        &self.non_mapped_leaves_t2
    }

    pub fn non_mapped_inner_nodes_t1(&self) -> &[FragmentId] {
        &self.non_mapped_inner_nodes_t1
    }

    pub fn non_mapped_inner_nodes_t2(&self) -> &[FragmentId] {
        &self.non_mapped_inner_nodes_t2
    }

    /// Every replacement across all accepted mappings
    pub fn replacements(&self) -> Vec<&Replacement> {
        self.mappings
            .iter()
            .flat_map(|m| m.replacements().iter())
            .collect()
    }

    /// Replacements whose either side is a method invocation
    pub fn replacements_involving_method_invocation(&self) -> Vec<&Replacement> {
        self.replacements()
            .into_iter()
            .filter(|r| r.involves_invocation())
            .collect()
    }

    /// Variable-to-invocation (and reverse) replacements only
    pub fn variable_replacements_with_method_invocation(&self) -> Vec<&Replacement> {
        self.replacements()
            .into_iter()
            .filter(|r| {
                matches!(
                    r.kind(),
                    ReplacementKind::VariableReplacedWithInvocation(_)
                )
            })
            .collect()
    }

    /// Invocation rename replacements only
    pub fn method_invocation_replacements(&self) -> Vec<&Replacement> {
        self.replacements()
            .into_iter()
            .filter(|r| {
                matches!(
                    r.kind(),
                    ReplacementKind::MethodInvocation | ReplacementKind::MethodInvocationName
                )
            })
            .collect()
    }

    /// Number of exact leaf mappings (identical argumentized text, keyword
    /// statements excluded)
    pub fn exact_matches(&self) -> usize {
        self.mappings
            .iter()
            .filter(|m| matches!(m.kind, MappingKind::Leaf) && m.is_exact())
            .count()
    }

    fn tree(&self, side: Side) -> &StatementTree {
        match side {
            Side::T1 => &self.operation1.body,
            Side::T2 => &self.operation2.body,
        }
    }

    /// A fragment's text after parameter-to-argument substitution
    fn argumentized_text(&self, side: Side, id: FragmentId) -> &str {
        let cache = match side {
            Side::T1 => &self.argumentized1,
            Side::T2 => &self.argumentized2,
        };
        match cache.get(id.0).and_then(|t| t.as_ref()) {
            Some(text) => text,
            None => &self.tree(side).get(id).text,
        }
    }

    fn same_container(&self) -> bool {
        self.operation1.name == self.operation2.name
    }

    // ---- leaves ----------------------------------------------------------

    fn process_leaves(
        &mut self,
        leaves1: Vector<FragmentId>,
        leaves2: Vector<FragmentId>,
    ) -> (Vector<FragmentId>, Vector<FragmentId>) {
        let mut remaining = (leaves1, leaves2);
        for &pass in STRICT_PASSES {
            remaining = self.run_leaf_pass(pass, remaining.0, remaining.1);
        }
        if self.fuzzy_matching {
            for &pass in FUZZY_PASSES {
                remaining = self.run_leaf_pass(pass, remaining.0, remaining.1);
            }
        }
        remaining
    }

    fn run_leaf_pass(
        &mut self,
        pass: Pass,
        mut remaining1: Vector<FragmentId>,
        mut remaining2: Vector<FragmentId>,
    ) -> (Vector<FragmentId>, Vector<FragmentId>) {
        let forward = remaining1.len() <= remaining2.len();
        let outer: Vec<FragmentId> = if forward {
            remaining1.iter().copied().collect()
        } else {
            remaining2.iter().copied().collect()
        };
        let mut postponed: Vec<Vec<LeafMapping>> = Vec::new();
        for anchor in outer {
            let (pool1, pool2) = (&remaining1, &remaining2);
            if forward && !pool1.contains(&anchor) {
                continue;
            }
            if !forward && !pool2.contains(&anchor) {
                continue;
            }
            let inner: Vec<FragmentId> = if forward {
                remaining2.iter().copied().collect()
            } else {
                remaining1.iter().copied().collect()
            };
            let mut candidates: Vec<LeafMapping> = Vec::new();
            for other in inner {
                let (f1, f2) = if forward { (anchor, other) } else { (other, anchor) };
                if let Some(candidate) =
                    self.leaf_candidate(pass, f1, f2, &remaining1, &remaining2)
                {
                    candidates.push(candidate);
                }
            }
            if candidates.is_empty() {
                continue;
            }
            if pass == Pass::Replacement && postponable(&candidates) {
                postponed.push(candidates);
                continue;
            }
            let best = select_best_leaf(candidates);
            remove_fragment(&mut remaining1, best.mapping.fragment1);
            remove_fragment(&mut remaining2, best.mapping.fragment2);
            log::debug!(
                "leaf mapping [{:?}]: {:?} -> {:?}",
                pass,
                best.mapping.fragment1,
                best.mapping.fragment2
            );
            self.mappings.push(best.mapping);
        }
        if pass == Pass::Replacement {
            self.resolve_postponed(postponed, &mut remaining1, &mut remaining2);
        }
        (remaining1, remaining2)
    }

    /// Postponed variable-declaration sets: resolved against the accepted
    /// mappings' common replacements after the rest of the pass settled
    fn resolve_postponed(
        &mut self,
        postponed: Vec<Vec<LeafMapping>>,
        remaining1: &mut Vector<FragmentId>,
        remaining2: &mut Vector<FragmentId>,
    ) {
        for set in postponed {
            let usable: Vec<LeafMapping> = set
                .into_iter()
                .filter(|m| {
                    remaining1.contains(&m.mapping.fragment1)
                        && remaining2.contains(&m.mapping.fragment2)
                })
                .collect();
            if usable.is_empty() {
                continue;
            }
            let confirmed: Vec<&LeafMapping> = usable
                .iter()
                .filter(|candidate| {
                    self.mappings.iter().any(|accepted| {
                        candidate
                            .mapping
                            .common_replacements(accepted)
                            .iter()
                            .any(|replacement| {
                                replacement.kind().same_kind(&ReplacementKind::VariableName)
                                    && self
                                        .tree(Side::T1)
                                        .get(candidate.mapping.fragment1)
                                        .variable_declaration(replacement.before())
                                        .is_some()
                                    && self
                                        .tree(Side::T2)
                                        .get(candidate.mapping.fragment2)
                                        .variable_declaration(replacement.after())
                                        .is_some()
                            })
                    })
                })
                .collect();
            let chosen: Vec<CodeMapping> = if confirmed.is_empty() {
                vec![usable
                    .iter()
                    .min()
                    .expect("non-empty postponed set")
                    .mapping
                    .clone()]
            } else {
                confirmed.iter().map(|m| m.mapping.clone()).collect()
            };
            for mapping in chosen {
                if remaining1.contains(&mapping.fragment1) && remaining2.contains(&mapping.fragment2)
                {
                    remove_fragment(remaining1, mapping.fragment1);
                    remove_fragment(remaining2, mapping.fragment2);
                    self.mappings.push(mapping);
                }
            }
        }
    }

    fn leaf_candidate(
        &self,
        pass: Pass,
        f1: FragmentId,
        f2: FragmentId,
        remaining1: &Vector<FragmentId>,
        remaining2: &Vector<FragmentId>,
    ) -> Option<LeafMapping> {
        let tree1 = self.tree(Side::T1);
        let tree2 = self.tree(Side::T2);
        let fragment1 = tree1.get(f1);
        let fragment2 = tree2.get(f2);
        let argumentized1 = self.argumentized_text(Side::T1, f1);
        let argumentized2 = self.argumentized_text(Side::T2, f2);
        let texts_equal =
            fragment1.text == fragment2.text || argumentized1 == argumentized2;
        let mut replacements: Vec<Replacement> = Vec::new();
        let mut extracted = false;
        let mut inlined = false;
        match pass {
            Pass::ExactDepth => {
                if !(texts_equal && fragment1.depth == fragment2.depth) {
                    return None;
                }
            }
            Pass::Exact => {
                if !texts_equal {
                    return None;
                }
            }
            Pass::Replacement => {
                if texts_equal {
                    // already consumed by an earlier pass unless depth kept
                    // it out; still a legitimate zero-replacement candidate
                } else {
                    let classification = classify(
                        fragment1,
                        fragment2,
                        argumentized1,
                        argumentized2,
                        &self.parameter_to_argument,
                    )?;
                    if classification.equivalent {
                        replacements = classification.replacements;
                    } else if let Some(composite) = self.absorbed_statement_replacement(
                        f1,
                        f2,
                        argumentized1,
                        argumentized2,
                        remaining1,
                        remaining2,
                    ) {
                        replacements = vec![composite];
                    } else {
                        return None;
                    }
                    extracted = self.identical_with_extracted_variable(
                        argumentized1,
                        f2,
                        remaining2,
                    );
                    inlined =
                        self.identical_with_inlined_variable(argumentized2, f1, remaining1);
                }
            }
            Pass::CommonSubstring => {
                if texts_equal {
                    return None;
                }
                let substrings =
                    longest_common_substrings(&fragment1.text, &fragment2.text);
                let longer = fragment1
                    .text
                    .chars()
                    .count()
                    .max(fragment2.text.chars().count());
                let qualifies = substrings.len() == 1
                    && substrings[0].chars().count() as f64
                        > COMMON_SUBSTRING_RATIO * longer as f64;
                if !qualifies {
                    return None;
                }
                replacements = self.best_effort_replacements(
                    fragment1,
                    fragment2,
                    argumentized1,
                    argumentized2,
                );
            }
            Pass::EditDistance => {
                if texts_equal {
                    return None;
                }
                let distance =
                    normalized_distance_ignore_case(&fragment1.text, &fragment2.text);
                if distance >= EDIT_DISTANCE_THRESHOLD {
                    return None;
                }
                replacements = self.best_effort_replacements(
                    fragment1,
                    fragment2,
                    argumentized1,
                    argumentized2,
                );
            }
        }
        let mut mapping = CodeMapping::new(
            f1,
            f2,
            MappingKind::Leaf,
            fragment1.text.clone(),
            fragment2.text.clone(),
            argumentized1.to_string(),
            argumentized2.to_string(),
            fragment1.location,
            fragment2.location,
        );
        mapping.add_replacements(replacements);
        mapping.identical_with_extracted_variable = extracted;
        mapping.identical_with_inlined_variable = inlined;
        Some(LeafMapping::new(mapping, tree1, tree2, self.same_container()))
    }

    /// Replacements surfaced by classification even when the pair is not
    /// fully explained; the fuzzy passes attach whatever was learned
    fn best_effort_replacements(
        &self,
        fragment1: &crate::core::fragment::CodeFragment,
        fragment2: &crate::core::fragment::CodeFragment,
        argumentized1: &str,
        argumentized2: &str,
    ) -> Vec<Replacement> {
        classify(
            fragment1,
            fragment2,
            argumentized1,
            argumentized2,
            &self.parameter_to_argument,
        )
        .map(|c| c.replacements)
        .unwrap_or_default()
    }

    /// Split/merge detection: one side's text is the concatenation of the
    /// other side's fragment plus a run of its following neighbors
    fn absorbed_statement_replacement(
        &self,
        f1: FragmentId,
        f2: FragmentId,
        argumentized1: &str,
        argumentized2: &str,
        remaining1: &Vector<FragmentId>,
        remaining2: &Vector<FragmentId>,
    ) -> Option<Replacement> {
        let squeeze = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        let target1 = squeeze(argumentized1);
        let mut accumulated = squeeze(self.argumentized_text(Side::T2, f2));
        let mut absorbed = 0usize;
        if let Some(start) = remaining2.iter().position(|&id| id == f2) {
            for &next in remaining2.iter().skip(start + 1) {
                accumulated.push_str(&squeeze(self.argumentized_text(Side::T2, next)));
                absorbed += 1;
                if accumulated == target1 {
                    return Some(Replacement::new(
                        argumentized1,
                        argumentized2,
                        ReplacementKind::Composite {
                            additionally_matched: absorbed,
                        },
                    ));
                }
                if accumulated.len() > target1.len() {
                    break;
                }
            }
        }
        let target2 = squeeze(argumentized2);
        let mut accumulated = squeeze(self.argumentized_text(Side::T1, f1));
        let mut absorbed = 0usize;
        if let Some(start) = remaining1.iter().position(|&id| id == f1) {
            for &next in remaining1.iter().skip(start + 1) {
                accumulated.push_str(&squeeze(self.argumentized_text(Side::T1, next)));
                absorbed += 1;
                if accumulated == target2 {
                    return Some(Replacement::new(
                        argumentized1,
                        argumentized2,
                        ReplacementKind::Composite {
                            additionally_matched: absorbed,
                        },
                    ));
                }
                if accumulated.len() > target2.len() {
                    break;
                }
            }
        }
        None
    }

    /// A preceding tree-2 declaration whose initializer, inlined into the
    /// candidate's fragment-2 text, reproduces fragment 1 exactly marks the
    /// candidate as identical-up-to-an-extracted-variable
    fn identical_with_extracted_variable(
        &self,
        argumentized1: &str,
        f2: FragmentId,
        remaining2: &Vector<FragmentId>,
    ) -> bool {
        let argumentized2 = self.argumentized_text(Side::T2, f2).to_string();
        for &earlier in remaining2.iter() {
            if earlier == f2 {
                break;
            }
            let fragment = self.tree(Side::T2).get(earlier);
            for declaration in &fragment.variable_declarations {
                if let Some(initializer) = &declaration.initializer {
                    let inlined =
                        substitute_token(&argumentized2, &declaration.name, initializer);
                    if inlined == argumentized1 {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// The symmetric check for an inlined tree-1 temporary
    fn identical_with_inlined_variable(
        &self,
        argumentized2: &str,
        f1: FragmentId,
        remaining1: &Vector<FragmentId>,
    ) -> bool {
        let argumentized1 = self.argumentized_text(Side::T1, f1).to_string();
        for &earlier in remaining1.iter() {
            if earlier == f1 {
                break;
            }
            let fragment = self.tree(Side::T1).get(earlier);
            for declaration in &fragment.variable_declarations {
                if let Some(initializer) = &declaration.initializer {
                    let inlined =
                        substitute_token(&argumentized1, &declaration.name, initializer);
                    if inlined == argumentized2 {
                        return true;
                    }
                }
            }
        }
        false
    }

    // ---- inner nodes -----------------------------------------------------

    fn process_inner_nodes(
        &mut self,
        inner1: Vector<FragmentId>,
        inner2: Vector<FragmentId>,
    ) -> (Vector<FragmentId>, Vector<FragmentId>) {
        let mut remaining = (inner1, inner2);
        for &pass in STRICT_PASSES {
            remaining = self.run_inner_pass(pass, remaining.0, remaining.1);
        }
        if self.fuzzy_matching {
            for &pass in FUZZY_PASSES {
                remaining = self.run_inner_pass(pass, remaining.0, remaining.1);
            }
        }
        remaining
    }

    fn run_inner_pass(
        &mut self,
        pass: Pass,
        mut remaining1: Vector<FragmentId>,
        mut remaining2: Vector<FragmentId>,
    ) -> (Vector<FragmentId>, Vector<FragmentId>) {
        let forward = remaining1.len() <= remaining2.len();
        let outer: Vec<FragmentId> = if forward {
            remaining1.iter().copied().collect()
        } else {
            remaining2.iter().copied().collect()
        };
        for anchor in outer {
            if forward && !remaining1.contains(&anchor) {
                continue;
            }
            if !forward && !remaining2.contains(&anchor) {
                continue;
            }
            let inner: Vec<FragmentId> = if forward {
                remaining2.iter().copied().collect()
            } else {
                remaining1.iter().copied().collect()
            };
            let mut candidates: Vec<CompositeMapping> = Vec::new();
            for other in inner {
                let (f1, f2) = if forward { (anchor, other) } else { (other, anchor) };
                if let Some(candidate) = self.composite_candidate(pass, f1, f2) {
                    candidates.push(candidate);
                }
            }
            if candidates.is_empty() {
                continue;
            }
            let best = select_best_composite(candidates);
            remove_fragment(&mut remaining1, best.mapping.fragment1);
            remove_fragment(&mut remaining2, best.mapping.fragment2);
            log::debug!(
                "composite mapping [{:?}]: {:?} -> {:?}",
                pass,
                best.mapping.fragment1,
                best.mapping.fragment2
            );
            self.mappings.push(best.mapping);
        }
        (remaining1, remaining2)
    }

    fn composite_candidate(
        &self,
        pass: Pass,
        f1: FragmentId,
        f2: FragmentId,
    ) -> Option<CompositeMapping> {
        let tree1 = self.tree(Side::T1);
        let tree2 = self.tree(Side::T2);
        let fragment1 = tree1.get(f1);
        let fragment2 = tree2.get(f2);
        let argumentized1 = self.argumentized_text(Side::T1, f1);
        let argumentized2 = self.argumentized_text(Side::T2, f2);
        let texts_equal =
            fragment1.text == fragment2.text || argumentized1 == argumentized2;
        let mut score = self.composite_child_matching_score(f1, f2);
        let both_childless =
            fragment1.children.is_empty() && fragment2.children.is_empty();
        let mut replacements: Vec<Replacement> = Vec::new();
        match pass {
            Pass::ExactDepth => {
                if !(texts_equal
                    && fragment1.depth == fragment2.depth
                    && (score > 0.0 || both_childless))
                {
                    return None;
                }
            }
            Pass::Exact => {
                if !(texts_equal && (score > 0.0 || both_childless)) {
                    return None;
                }
            }
            Pass::Replacement => {
                if !texts_equal {
                    let classification = classify(
                        fragment1,
                        fragment2,
                        argumentized1,
                        argumentized2,
                        &self.parameter_to_argument,
                    )?;
                    if !classification.equivalent {
                        return None;
                    }
                    replacements = classification.replacements;
                }
                // only an operator inversion separates the two headers but
                // no children matched: still structurally the same node
                if score == 0.0 && replacements.len() == 1 {
                    let kind = replacements[0].kind();
                    if kind.same_kind(&ReplacementKind::InfixOperator)
                        || kind.same_kind(&ReplacementKind::InvertConditional)
                    {
                        score = 1.0;
                    }
                }
                if !(score > 0.0 || both_childless) {
                    return None;
                }
            }
            Pass::CommonSubstring => {
                if texts_equal || score <= 0.0 {
                    return None;
                }
                let substrings =
                    longest_common_substrings(&fragment1.text, &fragment2.text);
                let longer = fragment1
                    .text
                    .chars()
                    .count()
                    .max(fragment2.text.chars().count());
                let qualifies = substrings.len() == 1
                    && substrings[0].chars().count() as f64
                        > COMMON_SUBSTRING_RATIO * longer as f64;
                if !qualifies {
                    return None;
                }
            }
            Pass::EditDistance => {
                if texts_equal || score <= 0.0 {
                    return None;
                }
                let distance =
                    normalized_distance_ignore_case(&fragment1.text, &fragment2.text);
                if distance >= EDIT_DISTANCE_THRESHOLD {
                    return None;
                }
            }
        }
        let mut mapping = CodeMapping::new(
            f1,
            f2,
            MappingKind::Composite {
                child_matching_score: score,
            },
            fragment1.text.clone(),
            fragment2.text.clone(),
            argumentized1.to_string(),
            argumentized2.to_string(),
            fragment1.location,
            fragment2.location,
        );
        mapping.add_replacements(replacements);
        Some(CompositeMapping::new(mapping, tree1, tree2))
    }

    /// Fraction of the two composites' children covered by accepted
    /// mappings: direct children first, leaf descendants as the fallback
    /// structural signal
    fn composite_child_matching_score(&self, f1: FragmentId, f2: FragmentId) -> f64 {
        let tree1 = self.tree(Side::T1);
        let tree2 = self.tree(Side::T2);
        let children1 = tree1.children_of(f1);
        let children2 = tree2.children_of(f2);
        let mapped_direct = self
            .mappings
            .iter()
            .filter(|m| children1.contains(&m.fragment1) && children2.contains(&m.fragment2))
            .count();
        if mapped_direct > 0 {
            let denominator = children1.len().max(children2.len());
            return mapped_direct as f64 / denominator as f64;
        }
        let leaves1 = tree1.leaves_of(f1);
        let leaves2 = tree2.leaves_of(f2);
        let denominator = leaves1.len().max(leaves2.len());
        if denominator == 0 {
            return 0.0;
        }
        let mapped_leaves = self
            .mappings
            .iter()
            .filter(|m| leaves1.contains(&m.fragment1) && leaves2.contains(&m.fragment2))
            .count();
        mapped_leaves as f64 / denominator as f64
    }
}

/// Parameter-to-argument substitution applied to every fragment text, once
fn argumentize(
    tree: &StatementTree,
    parameter_to_argument: &BTreeMap<String, String>,
) -> Vec<Option<String>> {
    if parameter_to_argument.is_empty() {
        return vec![None; tree.len()];
    }
    tree.fragments()
        .map(|fragment| {
            let mut text = fragment.text.clone();
            for (parameter, argument) in parameter_to_argument {
                if parameter != argument {
                    text = substitute_token(&text, parameter, argument);
                }
            }
            if text == fragment.text {
                None
            } else {
                Some(text)
            }
        })
        .collect()
}

fn remove_fragment(remaining: &mut Vector<FragmentId>, id: FragmentId) {
    if let Some(position) = remaining.iter().position(|&x| x == id) {
        remaining.remove(position);
    }
}

/// A pass-3 candidate set is postponed when it consists of several
/// variable-declaration pairs indistinguishable by replacement kinds alone
fn postponable(candidates: &[LeafMapping]) -> bool {
    if candidates.len() < 2 {
        return false;
    }
    if !candidates.iter().all(|c| c.is_variable_declaration_pair) {
        return false;
    }
    let first_kinds = candidates[0].mapping.replacement_kinds();
    candidates.iter().skip(1).all(|c| {
        let kinds = c.mapping.replacement_kinds();
        kinds.len() == first_kinds.len()
            && kinds
                .iter()
                .all(|k| first_kinds.iter().any(|f| f.same_kind(k)))
    })
}

fn select_best_leaf(mut candidates: Vec<LeafMapping>) -> LeafMapping {
    candidates.sort();
    debug_assert!(
        candidates.len() < 2
            || candidates[0].cmp(&candidates[1]) != std::cmp::Ordering::Equal
            || candidates[0] == candidates[1],
        "leaf comparator chain produced an ambiguous best candidate"
    );
    candidates.remove(0)
}

fn select_best_composite(mut candidates: Vec<CompositeMapping>) -> CompositeMapping {
    candidates.sort();
    debug_assert!(
        candidates.len() < 2
            || candidates[0].cmp(&candidates[1]) != std::cmp::Ordering::Equal
            || candidates[0] == candidates[1],
        "composite comparator chain produced an ambiguous best candidate"
    );
    candidates.remove(0)
}
