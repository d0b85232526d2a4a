//! Accepted fragment pairings
//!
//! A mapping pairs one fragment of tree 1 with one fragment of tree 2,
//! scoped to the operation pair being compared, and owns the replacement
//! set explaining how the two texts differ after argument substitution.

use serde::Serialize;

use crate::core::fragment::FragmentId;
use crate::core::location::SourceLocation;
use crate::replacement::{Replacement, ReplacementKind};

/// Leaf-to-leaf or composite-to-composite
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum MappingKind {
    Leaf,
    Composite {
        /// Fraction of the composite's children that are themselves mapped
        child_matching_score: f64,
    },
}

/// An accepted pairing between one fragment of each tree
#[derive(Clone, Debug, Serialize)]
pub struct CodeMapping {
    pub fragment1: FragmentId,
    pub fragment2: FragmentId,
    pub kind: MappingKind,
    pub text1: String,
    pub text2: String,
    pub argumentized1: String,
    pub argumentized2: String,
    pub location1: SourceLocation,
    pub location2: SourceLocation,
    replacements: Vec<Replacement>,
    pub identical_with_extracted_variable: bool,
    pub identical_with_inlined_variable: bool,
}

const KEYWORD_STATEMENTS: &[&str] = &["return;", "break;", "continue;", "return None;"];

impl CodeMapping {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        fragment1: FragmentId,
        fragment2: FragmentId,
        kind: MappingKind,
        text1: String,
        text2: String,
        argumentized1: String,
        argumentized2: String,
        location1: SourceLocation,
        location2: SourceLocation,
    ) -> Self {
        Self {
            fragment1,
            fragment2,
            kind,
            text1,
            text2,
            argumentized1,
            argumentized2,
            location1,
            location2,
            replacements: Vec::new(),
            identical_with_extracted_variable: false,
            identical_with_inlined_variable: false,
        }
    }

    pub fn add_replacement(&mut self, replacement: Replacement) {
        if !self.replacements.contains(&replacement) {
            self.replacements.push(replacement);
        }
    }

    pub fn add_replacements(&mut self, replacements: impl IntoIterator<Item = Replacement>) {
        for replacement in replacements {
            self.add_replacement(replacement);
        }
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    pub fn replacement_kinds(&self) -> Vec<ReplacementKind> {
        let mut kinds: Vec<ReplacementKind> = Vec::new();
        for replacement in &self.replacements {
            if !kinds.iter().any(|k| k.same_kind(&replacement.kind())) {
                kinds.push(replacement.kind());
            }
        }
        kinds
    }

    pub fn contains_kind(&self, kind: ReplacementKind) -> bool {
        self.replacements.iter().any(|r| r.kind().same_kind(&kind))
    }

    pub fn composite_replacement(&self) -> Option<&Replacement> {
        self.replacements.iter().find(|r| r.is_composite())
    }

    /// Replacements shared with another mapping, by `(before, after)`
    pub fn common_replacements(&self, other: &CodeMapping) -> Vec<&Replacement> {
        self.replacements
            .iter()
            .filter(|r| other.replacements.contains(r))
            .collect()
    }

    fn is_keyword(&self) -> bool {
        KEYWORD_STATEMENTS
            .iter()
            .any(|k| self.text1.starts_with(k))
    }

    fn contains_identical_composite_replacement(&self) -> bool {
        self.replacements
            .iter()
            .any(|r| r.is_composite() && r.before() == r.after())
    }

    /// The pairing is exact: argumentized texts agree and the statement is
    /// not a bare control-flow keyword
    pub fn is_exact(&self) -> bool {
        (self.argumentized1 == self.argumentized2
            || self.text1 == self.text2
            || self.contains_identical_composite_replacement())
            && !self.is_keyword()
    }

    pub fn child_matching_score(&self) -> f64 {
        match self.kind {
            MappingKind::Composite {
                child_matching_score,
            } => child_matching_score,
            MappingKind::Leaf => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::location::SourcePos;

    fn mapping(text1: &str, text2: &str) -> CodeMapping {
        let location = SourceLocation::new(SourcePos::new(1, 0), SourcePos::new(1, 0));
        CodeMapping::new(
            FragmentId(0),
            FragmentId(0),
            MappingKind::Leaf,
            text1.to_string(),
            text2.to_string(),
            text1.to_string(),
            text2.to_string(),
            location,
            location,
        )
    }

    #[test]
    fn exactness_requires_identical_argumentized_text() {
        assert!(mapping("x = x + 1;\n", "x = x + 1;\n").is_exact());
        assert!(!mapping("x = x + 1;\n", "x = x + 2;\n").is_exact());
    }

    #[test]
    fn keyword_statements_are_never_exact() {
        assert!(!mapping("return;\n", "return;\n").is_exact());
        assert!(!mapping("break;\n", "break;\n").is_exact());
        assert!(!mapping("continue;\n", "continue;\n").is_exact());
        assert!(!mapping("return None;\n", "return None;\n").is_exact());
    }

    #[test]
    fn duplicate_replacements_are_dropped() {
        let mut m = mapping("a;\n", "b;\n");
        m.add_replacement(Replacement::new("a", "b", ReplacementKind::VariableName));
        m.add_replacement(Replacement::new("a", "b", ReplacementKind::VariableName));
        assert_eq!(m.replacements().len(), 1);
    }
}
