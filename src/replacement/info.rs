//! Working state threaded through replacement detection
//!
//! Holds the two argumentized texts, the raw edit distance between them
//! (kept current as substitutions land on side 1), and the replacement set
//! accumulated so far. Insertion order is preserved; a duplicate
//! `(before, after)` pair is dropped.

use crate::distance::edit_distance;
use crate::replacement::{Replacement, ReplacementKind};

#[derive(Clone, Debug)]
pub struct ReplacementInfo {
    argumentized_string1: String,
    argumentized_string2: String,
    raw_distance: usize,
    replacements: Vec<Replacement>,
}

impl ReplacementInfo {
    pub fn new(argumentized_string1: String, argumentized_string2: String) -> Self {
        let raw_distance = edit_distance(&argumentized_string1, &argumentized_string2);
        Self {
            argumentized_string1,
            argumentized_string2,
            raw_distance,
            replacements: Vec::new(),
        }
    }

    pub fn argumentized_string1(&self) -> &str {
        &self.argumentized_string1
    }

    pub fn argumentized_string2(&self) -> &str {
        &self.argumentized_string2
    }

    pub fn raw_distance(&self) -> usize {
        self.raw_distance
    }

    /// Replace side 1's working text after a substitution landed, keeping
    /// the raw distance in sync
    pub fn set_argumentized_string1(&mut self, text: String) {
        self.argumentized_string1 = text;
        self.raw_distance = edit_distance(&self.argumentized_string1, &self.argumentized_string2);
    }

    pub fn add_replacement(&mut self, replacement: Replacement) {
        if !self.replacements.contains(&replacement) {
            self.replacements.push(replacement);
        }
    }

    pub fn remove_replacement(&mut self, replacement: &Replacement) {
        self.replacements.retain(|r| r != replacement);
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    pub fn into_replacements(self) -> Vec<Replacement> {
        self.replacements
    }

    pub fn replacements_of_kind(&self, kind: ReplacementKind) -> Vec<&Replacement> {
        self.replacements
            .iter()
            .filter(|r| r.kind().same_kind(&kind))
            .collect()
    }

    pub fn contains_kind(&self, kind: ReplacementKind) -> bool {
        self.replacements.iter().any(|r| r.kind().same_kind(&kind))
    }

    /// Texts equal once every recorded replacement is counted
    pub fn texts_equal(&self) -> bool {
        self.argumentized_string1 == self.argumentized_string2
    }
}
