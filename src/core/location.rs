//! Source positions and lexical scopes
//!
//! Positions come from `proc-macro2` span locations (line/column, 1-based
//! lines). A `VariableScope` is the lexical range in which a declaration is
//! visible; `subsumes` is the containment predicate the type-change detector
//! uses to test whether a reference lies inside a declaration's scope.

use serde::{Deserialize, Serialize};

/// A single point in the source text
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
}

impl SourcePos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl From<proc_macro2::LineColumn> for SourcePos {
    fn from(lc: proc_macro2::LineColumn) -> Self {
        Self {
            line: lc.line,
            column: lc.column,
        }
    }
}

/// The source range covered by a fragment or expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: SourcePos,
    pub end: SourcePos,
}

impl SourceLocation {
    pub fn new(start: SourcePos, end: SourcePos) -> Self {
        Self { start, end }
    }

    /// Location covering a spanned syntax node
    pub fn of<T: syn::spanned::Spanned>(node: &T) -> Self {
        let span = node.span();
        Self {
            start: span.start().into(),
            end: span.end().into(),
        }
    }

    pub fn start_line(&self) -> usize {
        self.start.line
    }

    /// True when `other` lies entirely within this range
    pub fn contains(&self, other: &SourceLocation) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Lexical range in which a variable declaration is visible
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableScope {
    pub start: SourcePos,
    pub end: SourcePos,
}

impl VariableScope {
    pub fn new(start: SourcePos, end: SourcePos) -> Self {
        Self { start, end }
    }

    /// Containment predicate: does a reference at `location` fall inside
    /// this scope?
    pub fn subsumes(&self, location: &SourceLocation) -> bool {
        self.start <= location.start && location.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(sl: usize, sc: usize, el: usize, ec: usize) -> SourceLocation {
        SourceLocation::new(SourcePos::new(sl, sc), SourcePos::new(el, ec))
    }

    #[test]
    fn scope_subsumes_inner_reference() {
        let scope = VariableScope::new(SourcePos::new(2, 4), SourcePos::new(10, 0));
        assert!(scope.subsumes(&loc(3, 0, 3, 12)));
        assert!(scope.subsumes(&loc(2, 4, 10, 0)));
    }

    #[test]
    fn scope_rejects_reference_before_declaration() {
        let scope = VariableScope::new(SourcePos::new(5, 0), SourcePos::new(9, 0));
        assert!(!scope.subsumes(&loc(4, 0, 4, 8)));
        assert!(!scope.subsumes(&loc(8, 0, 11, 0)));
    }
}
