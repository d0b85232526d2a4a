//! Composite mapping candidates and their total order
//!
//! Inner nodes carry a structural signal leaves lack: the fraction of their
//! children already mapped. The comparator leads with that score, applies
//! the doubling rule (a score at least twice the other's wins outright),
//! then falls through to textual distance and the same depth/index/location
//! tie-breaks as leaves, with extra credit for chains of identical
//! singleton-nested composites and identical siblings inside blocks.

use std::cmp::Ordering;

use crate::core::fragment::{CompositeKind, FragmentId, StatementTree};
use crate::distance::normalized_distance_ignore_case;
use crate::matching::mapping::CodeMapping;
use crate::replacement::ReplacementKind;

/// A composite-to-composite candidate with its ranking signals
#[derive(Clone, Debug)]
pub struct CompositeMapping {
    pub mapping: CodeMapping,
    pub(crate) score: f64,
    pub(crate) edit_distance: f64,
    pub(crate) identical_composite_children: usize,
    pub(crate) identical_directly_nested_children: usize,
    pub(crate) depth_diff: usize,
    pub(crate) index_diff: usize,
    pub(crate) location_sum: usize,
}

impl CompositeMapping {
    pub fn new(mapping: CodeMapping, tree1: &StatementTree, tree2: &StatementTree) -> Self {
        let fragment1 = tree1.get(mapping.fragment1);
        let fragment2 = tree2.get(mapping.fragment2);
        Self {
            score: mapping.child_matching_score(),
            edit_distance: normalized_distance_ignore_case(&mapping.text1, &mapping.text2),
            identical_composite_children: identical_composite_children(
                tree1,
                tree2,
                mapping.fragment1,
                mapping.fragment2,
            ),
            identical_directly_nested_children: identical_directly_nested_children(
                tree1,
                tree2,
                mapping.fragment1,
                mapping.fragment2,
            ),
            depth_diff: fragment1.depth.abs_diff(fragment2.depth),
            index_diff: fragment1.index.abs_diff(fragment2.index),
            location_sum: mapping.location1.start_line() + mapping.location2.start_line(),
            mapping,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

impl PartialEq for CompositeMapping {
    fn eq(&self, other: &Self) -> bool {
        self.mapping.fragment1 == other.mapping.fragment1
            && self.mapping.fragment2 == other.mapping.fragment2
    }
}

impl Eq for CompositeMapping {}

impl PartialOrd for CompositeMapping {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The extension constructor seeds the extracted side's composite with a
/// score of 0.99; a perfect 1.0 still beats it when the 0.99 carries an
/// aggregate replacement
const EXTENSION_SCORE: f64 = 0.99;

impl Ord for CompositeMapping {
    fn cmp(&self, other: &Self) -> Ordering {
        let composite1 = self.mapping.contains_kind(ReplacementKind::Composite {
            additionally_matched: 0,
        });
        let composite2 = other.mapping.contains_kind(ReplacementKind::Composite {
            additionally_matched: 0,
        });
        if self.score == 1.0 && composite2 && other.score == EXTENSION_SCORE {
            return Ordering::Less;
        }
        if other.score == 1.0 && composite1 && self.score == EXTENSION_SCORE {
            return Ordering::Greater;
        }
        let invert1 = self.mapping.contains_kind(ReplacementKind::InvertConditional);
        let invert2 = other.mapping.contains_kind(ReplacementKind::InvertConditional);
        if self.score < EXTENSION_SCORE && self.score > 0.0 && invert2 && other.score == EXTENSION_SCORE
        {
            return Ordering::Less;
        }
        if other.score < EXTENSION_SCORE && other.score > 0.0 && invert1 && self.score == EXTENSION_SCORE
        {
            return Ordering::Greater;
        }
        if self.score >= 2.0 * other.score || other.score >= 2.0 * self.score {
            return other.score.total_cmp(&self.score);
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
            return self.edit_distance.total_cmp(&other.edit_distance);
        }
        if self.identical_composite_children != other.identical_composite_children {
            return other
                .identical_composite_children
                .cmp(&self.identical_composite_children);
        }
        if self.score != other.score {
            return other.score.total_cmp(&self.score);
        }
        if self.identical_directly_nested_children != other.identical_directly_nested_children {
            return other
                .identical_directly_nested_children
                .cmp(&self.identical_directly_nested_children);
        }
        if self.depth_diff != other.depth_diff {
            return self.depth_diff.cmp(&other.depth_diff);
        }
        if self.index_diff != other.index_diff {
            return self.index_diff.cmp(&other.index_diff);
        }
        self.location_sum.cmp(&other.location_sum)
    }
}

/// Walk matching chains of first-child composites, counting identical
/// headers level by level
fn identical_composite_children(
    tree1: &StatementTree,
    tree2: &StatementTree,
    composite1: FragmentId,
    composite2: FragmentId,
) -> usize {
    let mut count = 0;
    let mut current1 = composite1;
    let mut current2 = composite2;
    loop {
        let first1 = tree1.children_of(current1).first().copied();
        let first2 = tree2.children_of(current2).first().copied();
        match (first1, first2) {
            (Some(c1), Some(c2))
                if tree1.get(c1).is_composite() && tree2.get(c2).is_composite() =>
            {
                if tree1.get(c1).text == tree2.get(c2).text {
                    count += 1;
                }
                current1 = c1;
                current2 = c2;
            }
            _ => break,
        }
    }
    count
}

/// Identical sibling statements inside matching block-like composites
fn identical_directly_nested_children(
    tree1: &StatementTree,
    tree2: &StatementTree,
    composite1: FragmentId,
    composite2: FragmentId,
) -> usize {
    let block_like = |kind: Option<CompositeKind>| {
        matches!(
            kind,
            Some(CompositeKind::Block) | Some(CompositeKind::Unsafe) | Some(CompositeKind::Labeled)
        )
    };
    let kind1 = tree1.get(composite1).composite_kind();
    let kind2 = tree2.get(composite2).composite_kind();
    let (target1, target2) = if block_like(kind1) && block_like(kind2) {
        (composite1, composite2)
    } else {
        let children1 = tree1.children_of(composite1);
        let children2 = tree2.children_of(composite2);
        if children1.len() == 1
            && children2.len() == 1
            && tree1.get(children1[0]).is_block()
            && tree2.get(children2[0]).is_block()
        {
            (children1[0], children2[0])
        } else {
            return 0;
        }
    };
    let mut count = 0;
    for &child1 in tree1.children_of(target1) {
        for &child2 in tree2.children_of(target2) {
            if tree1.get(child1).text == tree2.get(child2).text {
                count += 1;
            }
        }
    }
    count
}
