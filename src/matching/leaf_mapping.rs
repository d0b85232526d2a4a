//! Leaf mapping candidates and their total order
//!
//! When several fragment-2 candidates pass the same matching-pass predicate
//! against one fragment-1, exactly one must win, deterministically. The
//! comparator is a strict chain: structural and semantic evidence first
//! (composite replacements, extracted-variable identity, congruent parents),
//! raw text distance next, and source position as the final tie-break of
//! last resort, so no tie survives.
//!
//! Every comparator input is computed at candidate construction, while the
//! trees are at hand; `Ord` then works on the candidate alone plus the
//! pairwise cross-checks the original comparator makes between two
//! candidates.

use std::cmp::Ordering;

use crate::core::fragment::{CompositeKind, FragmentId, StatementTree};
use crate::distance::{normalized_distance, normalized_distance_ignore_case};
use crate::matching::mapping::CodeMapping;
use crate::replacement::ReplacementKind;

/// A leaf-to-leaf candidate with its precomputed ranking signals
#[derive(Clone, Debug)]
pub struct LeafMapping {
    pub mapping: CodeMapping,
    pub(crate) edit_distance: f64,
    pub(crate) identical_depth_index_and_parent_type: bool,
    pub(crate) level_parent_edit_distance: Vec<f64>,
    pub(crate) identical_composite_children_structure: bool,
    pub(crate) depth_diff: usize,
    pub(crate) index_diff: usize,
    pub(crate) same_variable_declaration_type_in_parent: bool,
    pub(crate) parent_variable_token_intersection: usize,
    pub(crate) same_container: bool,
    pub(crate) parent_index_diff: Option<usize>,
    pub(crate) location_sum: usize,
    // data for the pairwise cross-referencing check
    pub(crate) is_variable_declaration_pair: bool,
    pub(crate) fragment2_start_line: usize,
    pub(crate) fragment2_end_line: usize,
    pub(crate) declared_names2: Vec<String>,
    pub(crate) single_creation_arguments2: Vec<String>,
    pub(crate) string_literals_identical: bool,
    pub(crate) number_literals_identical: bool,
}

impl LeafMapping {
    pub fn new(
        mapping: CodeMapping,
        tree1: &StatementTree,
        tree2: &StatementTree,
        same_container: bool,
    ) -> Self {
        let fragment1 = tree1.get(mapping.fragment1);
        let fragment2 = tree2.get(mapping.fragment2);
        let edit_distance = normalized_distance_ignore_case(&mapping.text1, &mapping.text2);
        let parent1 = tree1.parent_skipping_blocks(mapping.fragment1);
        let parent2 = tree2.parent_skipping_blocks(mapping.fragment2);
        let level_parent_edit_distance =
            level_parent_edit_distance(tree1, tree2, parent1, parent2);
        let declared_names2 = fragment2
            .variable_declarations
            .iter()
            .map(|d| d.name.clone())
            .collect();
        let single_creation_arguments2 = fragment2
            .creations
            .iter()
            .filter(|c| c.arguments.len() == 1)
            .map(|c| c.arguments[0].clone())
            .collect();
        let literals_identical = |l1: &[String], l2: &[String]| !l1.is_empty() && l1 == l2;
        Self {
            edit_distance,
            identical_depth_index_and_parent_type: identical_depth_index_and_parent_type(
                tree1, tree2, &mapping,
            ),
            level_parent_edit_distance,
            identical_composite_children_structure: identical_composite_children_structure(
                tree1, tree2, &mapping,
            ),
            depth_diff: fragment1.depth.abs_diff(fragment2.depth),
            index_diff: fragment1.index.abs_diff(fragment2.index),
            same_variable_declaration_type_in_parent: same_variable_declaration_type_in_parent(
                tree1, tree2, parent1, parent2,
            ),
            parent_variable_token_intersection: parent_variable_token_intersection(
                tree1, tree2, parent1, parent2,
            ),
            same_container,
            parent_index_diff: match (parent1, parent2) {
                (Some(p1), Some(p2)) => {
                    Some(tree1.get(p1).index.abs_diff(tree2.get(p2).index))
                }
                _ => None,
            },
            location_sum: mapping.location1.start_line() + mapping.location2.start_line(),
            is_variable_declaration_pair: fragment1.is_variable_declaration_statement()
                && fragment2.is_variable_declaration_statement(),
            fragment2_start_line: fragment2.location.start.line,
            fragment2_end_line: fragment2.location.end.line,
            declared_names2,
            single_creation_arguments2,
            string_literals_identical: literals_identical(
                &fragment1.string_literals,
                &fragment2.string_literals,
            ),
            number_literals_identical: literals_identical(
                &fragment1.number_literals,
                &fragment2.number_literals,
            ),
            mapping,
        }
    }

    pub fn edit_distance(&self) -> f64 {
        self.edit_distance
    }

    /// One candidate's target statement feeds the other's constructor: the
    /// earlier declaration is the one being referenced, so the referencing
    /// candidate yields
    fn references_mapping(&self, other: &LeafMapping) -> bool {
        if !self.is_variable_declaration_pair
            || !other.is_variable_declaration_pair
            || self.mapping.fragment1 != other.mapping.fragment1
        {
            return false;
        }
        if other.fragment2_end_line >= self.fragment2_start_line {
            return false;
        }
        other
            .declared_names2
            .iter()
            .any(|name| self.single_creation_arguments2.contains(name))
    }

    /// The shared-replacement-type overlap analysis: both candidates share
    /// some replacement kinds; if the rest of one candidate's kinds are all
    /// independently confirmed identical literal nodes, the candidate whose
    /// kinds are exactly the shared set wins
    fn replacement_overlap(&self, other: &LeafMapping) -> Option<Ordering> {
        let kinds1 = self.mapping.replacement_kinds();
        let kinds2 = other.mapping.replacement_kinds();
        let intersection: Vec<ReplacementKind> = kinds1
            .iter()
            .filter(|k| kinds2.iter().any(|o| o.same_kind(k)))
            .copied()
            .collect();
        if intersection.is_empty() {
            return None;
        }
        let equals_set = |kinds: &[ReplacementKind]| {
            kinds.len() == intersection.len()
                && kinds
                    .iter()
                    .all(|k| intersection.iter().any(|i| i.same_kind(k)))
        };
        if !equals_set(&kinds1) && !equals_set(&kinds2) {
            return None;
        }
        let mut same_replacement_count = 0usize;
        for kind in &intersection {
            let mine = self
                .mapping
                .replacements()
                .iter()
                .find(|r| r.kind().same_kind(kind));
            let theirs = other
                .mapping
                .replacements()
                .iter()
                .find(|r| r.kind().same_kind(kind));
            if let (Some(mine), Some(theirs)) = (mine, theirs) {
                if mine.before() == theirs.before() || mine.after() == theirs.after() {
                    same_replacement_count += 1;
                }
            }
        }
        let rest = |kinds: &[ReplacementKind]| -> Vec<ReplacementKind> {
            kinds
                .iter()
                .filter(|k| !intersection.iter().any(|i| i.same_kind(k)))
                .copied()
                .collect()
        };
        let rest1 = rest(&kinds1);
        let rest2 = rest(&kinds2);
        let confirmed = |kinds: &[ReplacementKind], of: &LeafMapping| {
            !kinds.is_empty()
                && kinds.iter().all(|k| {
                    (k.same_kind(&ReplacementKind::StringLiteral) && of.string_literals_identical)
                        || (k.same_kind(&ReplacementKind::NumberLiteral)
                            && of.number_literals_identical)
                })
        };
        let identical_nodes = confirmed(&rest1, other) || confirmed(&rest2, self);
        if same_replacement_count == intersection.len() && identical_nodes {
            if equals_set(&kinds1) && !equals_set(&kinds2) {
                return Some(Ordering::Less);
            }
            if equals_set(&kinds2) && !equals_set(&kinds1) {
                return Some(Ordering::Greater);
            }
        }
        None
    }

    fn compare_by_parent_levels(&self, other: &LeafMapping) -> Ordering {
        let levels1 = &self.level_parent_edit_distance;
        let levels2 = &other.level_parent_edit_distance;
        let min_size = levels1.len().min(levels2.len());
        let mut sum1 = 0.0;
        let mut sum2 = 0.0;
        let mut head_zeros1 = 0usize;
        let mut head_zeros2 = 0usize;
        for i in 0..min_size {
            sum1 += levels1[i];
            if levels1[i] == 0.0 && sum1 == 0.0 {
                head_zeros1 += 1;
            }
            sum2 += levels2[i];
            if levels2[i] == 0.0 && sum2 == 0.0 {
                head_zeros2 += 1;
            }
        }
        if levels1.len() == levels2.len() {
            if sum1 == 0.0 && sum2 > 0.0 {
                return Ordering::Less;
            }
            if sum2 == 0.0 && sum1 > 0.0 {
                return Ordering::Greater;
            }
            if head_zeros1 != head_zeros2 {
                return head_zeros2.cmp(&head_zeros1);
            }
            if levels1.len() == 2
                && levels1[1] == 0.0
                && levels2.len() == 2
                && levels2[1] == 0.0
                && levels1[0] != levels2[0]
            {
                let difference = (levels1[0] - levels2[0]).abs();
                let minimum = levels1[0].min(levels2[0]);
                if difference > minimum {
                    return levels1[0].total_cmp(&levels2[0]);
                }
            }
        }
        let has_zero1 = levels1.contains(&0.0);
        let has_zero2 = levels2.contains(&0.0);
        if (levels1.len() != levels2.len() || has_zero1 != has_zero2) && levels1[0] != levels2[0] {
            if sum1 < sum2 && levels2[0] != 0.0 {
                return Ordering::Less;
            }
            if sum2 < sum1 && levels1[0] != 0.0 {
                return Ordering::Greater;
            }
        }
        match (
            self.identical_composite_children_structure,
            other.identical_composite_children_structure,
        ) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        if self.depth_diff != other.depth_diff {
            return self.depth_diff.cmp(&other.depth_diff);
        }
        if self.index_diff != other.index_diff {
            return self.index_diff.cmp(&other.index_diff);
        }
        let parent_distance1 = self.level_parent_edit_distance[0];
        let parent_distance2 = other.level_parent_edit_distance[0];
        match (
            self.same_variable_declaration_type_in_parent,
            other.same_variable_declaration_type_in_parent,
        ) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        if self.parent_variable_token_intersection != other.parent_variable_token_intersection {
            return other
                .parent_variable_token_intersection
                .cmp(&self.parent_variable_token_intersection);
        }
        if self.same_container
            && other.same_container
            && self.level_parent_edit_distance.len() == 2
            && self.level_parent_edit_distance[1] == 0.0
            && other.level_parent_edit_distance.len() == 2
            && other.level_parent_edit_distance[1] == 0.0
            && parent_distance1 != parent_distance2
        {
            if let (Some(diff1), Some(diff2)) = (self.parent_index_diff, other.parent_index_diff) {
                if diff1 != diff2 {
                    return diff1.cmp(&diff2);
                }
            }
        }
        if parent_distance1 == parent_distance2 {
            return self.location_sum.cmp(&other.location_sum);
        }
        parent_distance1.total_cmp(&parent_distance2)
    }
}

impl PartialEq for LeafMapping {
    fn eq(&self, other: &Self) -> bool {
        self.mapping.fragment1 == other.mapping.fragment1
            && self.mapping.fragment2 == other.mapping.fragment2
    }
}

impl Eq for LeafMapping {}

impl PartialOrd for LeafMapping {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LeafMapping {
    fn cmp(&self, other: &Self) -> Ordering {
        let composite1 = self.mapping.composite_replacement();
        let composite2 = other.mapping.composite_replacement();
        match (composite1, composite2) {
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (Some(mine), Some(theirs)) => {
                return theirs
                    .additionally_matched()
                    .cmp(&mine.additionally_matched());
            }
            (None, None) => {}
        }
        let concatenation1 = self.mapping.contains_kind(ReplacementKind::Concatenation);
        let concatenation2 = other.mapping.contains_kind(ReplacementKind::Concatenation);
        if concatenation1 != concatenation2 {
            // the candidate without a concatenation fold is the safer pick
            return if concatenation1 {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        if self.edit_distance != other.edit_distance {
            match (
                self.mapping.identical_with_extracted_variable,
                other.mapping.identical_with_extracted_variable,
            ) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
            match (
                self.mapping.identical_with_inlined_variable,
                other.mapping.identical_with_inlined_variable,
            ) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
            match (
                self.identical_depth_index_and_parent_type,
                other.identical_depth_index_and_parent_type,
            ) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
            if self.references_mapping(other) {
                return Ordering::Greater;
            }
            if other.references_mapping(self) {
                return Ordering::Less;
            }
            if let Some(ordering) = self.replacement_overlap(other) {
                return ordering;
            }
            return self.edit_distance.total_cmp(&other.edit_distance);
        }
        self.compare_by_parent_levels(other)
    }
}

/// Per-level parent-chain distances, skipping bare block wrappers; a pair
/// of absent parents is the method signature and contributes zero
fn level_parent_edit_distance(
    tree1: &StatementTree,
    tree2: &StatementTree,
    first_parent1: Option<FragmentId>,
    first_parent2: Option<FragmentId>,
) -> Vec<f64> {
    let mut levels = vec![parent_edit_distance(tree1, tree2, first_parent1, first_parent2)];
    let mut current1 = first_parent1;
    let mut current2 = first_parent2;
    while let (Some(p1), Some(p2)) = (current1, current2) {
        let next1 = tree1.parent_skipping_blocks(p1);
        let next2 = tree2.parent_skipping_blocks(p2);
        levels.push(parent_edit_distance(tree1, tree2, next1, next2));
        current1 = next1;
        current2 = next2;
    }
    levels
}

fn parent_edit_distance(
    tree1: &StatementTree,
    tree2: &StatementTree,
    parent1: Option<FragmentId>,
    parent2: Option<FragmentId>,
) -> f64 {
    match (parent1, parent2) {
        (None, None) => 0.0,
        (None, Some(p2)) => normalized_distance("{", &tree2.get(p2).text),
        (Some(p1), None) => normalized_distance(&tree1.get(p1).text, "{"),
        (Some(p1), Some(p2)) => normalized_distance(&tree1.get(p1).text, &tree2.get(p2).text),
    }
}

fn identical_depth_index_and_parent_type(
    tree1: &StatementTree,
    tree2: &StatementTree,
    mapping: &CodeMapping,
) -> bool {
    let fragment1 = tree1.get(mapping.fragment1);
    let fragment2 = tree2.get(mapping.fragment2);
    if fragment1.is_variable_declaration_statement() && fragment2.is_variable_declaration_statement()
    {
        return false;
    }
    let parent1 = tree1.parent_skipping_blocks(mapping.fragment1);
    let parent2 = tree2.parent_skipping_blocks(mapping.fragment2);
    if let (Some(p1), Some(p2)) = (parent1, parent2) {
        let parent_fragment1 = tree1.get(p1);
        let parent_fragment2 = tree2.get(p2);
        if parent_fragment1.composite_kind() == parent_fragment2.composite_kind()
            && parent_fragment1.composite_kind() != Some(CompositeKind::MatchArm)
        {
            if parent_fragment1.text == parent_fragment2.text {
                return true;
            }
            return fragment1.depth == fragment2.depth && fragment1.index == fragment2.index;
        }
    }
    false
}

fn identical_composite_children_structure(
    tree1: &StatementTree,
    tree2: &StatementTree,
    mapping: &CodeMapping,
) -> bool {
    let parent1 = match tree1.get(mapping.fragment1).parent {
        Some(p) => p,
        None => return false,
    };
    let parent2 = match tree2.get(mapping.fragment2).parent {
        Some(p) => p,
        None => return false,
    };
    let composites1: Vec<FragmentId> = tree1
        .children_of(parent1)
        .iter()
        .copied()
        .filter(|&c| tree1.get(c).is_composite())
        .collect();
    let composites2: Vec<FragmentId> = tree2
        .children_of(parent2)
        .iter()
        .copied()
        .filter(|&c| tree2.get(c).is_composite())
        .collect();
    if composites1.len() != 1 || composites2.len() != 1 {
        return false;
    }
    let inner1 = inner_nodes_of(tree1, composites1[0]);
    let inner2 = inner_nodes_of(tree2, composites2[0]);
    if inner1.len() != inner2.len() || inner1.is_empty() {
        return false;
    }
    inner1
        .iter()
        .zip(inner2.iter())
        .all(|(&a, &b)| tree1.get(a).text == tree2.get(b).text)
}

fn inner_nodes_of(tree: &StatementTree, id: FragmentId) -> Vec<FragmentId> {
    let mut out = Vec::new();
    collect_inner(tree, id, &mut out);
    out
}

fn collect_inner(tree: &StatementTree, id: FragmentId, out: &mut Vec<FragmentId>) {
    for &child in tree.children_of(id) {
        collect_inner(tree, child, out);
    }
    if tree.get(id).is_composite() {
        out.push(id);
    }
}

fn same_variable_declaration_type_in_parent(
    tree1: &StatementTree,
    tree2: &StatementTree,
    parent1: Option<FragmentId>,
    parent2: Option<FragmentId>,
) -> bool {
    let (p1, p2) = match (parent1, parent2) {
        (Some(p1), Some(p2)) => (p1, p2),
        _ => return false,
    };
    let declarations = |tree: &StatementTree, id: FragmentId| {
        let mut out = Vec::new();
        for &leaf in &tree.leaves_of(id) {
            out.extend(tree.get(leaf).variable_declarations.iter().cloned());
        }
        out
    };
    let declarations1 = declarations(tree1, p1);
    let declarations2 = declarations(tree2, p2);
    if declarations1.len() != declarations2.len() || declarations1.is_empty() {
        return false;
    }
    declarations1
        .iter()
        .zip(declarations2.iter())
        .all(|(d1, d2)| d1.equal_type(d2))
}

/// Lowercased name tokens shared by the two parents' single header
/// variables, split on snake and camel boundaries
fn parent_variable_token_intersection(
    tree1: &StatementTree,
    tree2: &StatementTree,
    parent1: Option<FragmentId>,
    parent2: Option<FragmentId>,
) -> usize {
    let (p1, p2) = match (parent1, parent2) {
        (Some(p1), Some(p2)) => (p1, p2),
        _ => return 0,
    };
    let header_variables = |tree: &StatementTree, id: FragmentId| -> Vec<String> {
        let mut out = Vec::new();
        for &expression in tree.expressions_of(id) {
            out.extend(tree.get(expression).variables.iter().cloned());
        }
        out
    };
    let variables1 = header_variables(tree1, p1);
    let variables2 = header_variables(tree2, p2);
    if variables1.len() != 1 || variables2.len() != 1 {
        return 0;
    }
    let tokens1 = split_name_tokens(&variables1[0]);
    let tokens2 = split_name_tokens(&variables2[0]);
    tokens1.iter().filter(|t| tokens2.contains(t)).count()
}

pub(crate) fn split_name_tokens(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in name.split(['_', '.']) {
        let mut current = String::new();
        for c in chunk.chars() {
            if c.is_uppercase() && !current.is_empty() {
                tokens.push(current.to_lowercase());
                current = String::new();
            }
            current.push(c);
        }
        if !current.is_empty() {
            tokens.push(current.to_lowercase());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_token_split_handles_snake_and_camel() {
        assert_eq!(split_name_tokens("max_line_count"), vec!["max", "line", "count"]);
        assert_eq!(split_name_tokens("maxLineCount"), vec!["max", "line", "count"]);
        assert_eq!(split_name_tokens("self.buffer"), vec!["self", "buffer"]);
    }
}
