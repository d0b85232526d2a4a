//! Variable declarations and their scopes

use serde::{Deserialize, Serialize};

use crate::core::location::{SourceLocation, VariableScope};

/// A `let` binding extracted from a statement
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    /// Rendered type annotation, when present
    pub type_annotation: Option<String>,
    /// Rendered initializer expression, when present
    pub initializer: Option<String>,
    pub is_mut: bool,
    /// Lexical range in which the binding is visible
    pub scope: VariableScope,
    /// Location of the declaring statement
    pub location: SourceLocation,
}

impl VariableDeclaration {
    /// Same declared type on both sides (both unannotated counts as equal)
    pub fn equal_type(&self, other: &VariableDeclaration) -> bool {
        self.type_annotation == other.type_annotation
    }
}
