//! Operations: the signature + decomposed-body container the mapper works on

use serde::{Deserialize, Serialize};

use crate::core::fragment::StatementTree;
use crate::core::variable::VariableDeclaration;

/// One formal parameter of an operation
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<String>,
}

/// A function or method with its decomposed body. The mapper consumes two
/// of these; it never parses source text itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: StatementTree,
}

impl Operation {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>, body: StatementTree) -> Self {
        Self {
            name: name.into(),
            parameters,
            body,
        }
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Resolve a name against the whole body, falling back to parameters.
    /// Parameters carry no initializer and scope over the entire body.
    pub fn search_variable_declaration(&self, name: &str) -> Option<VariableDeclaration> {
        if let Some(root) = self.body.root() {
            for leaf in self.body.leaves_of(root) {
                if let Some(declaration) = self.body.get(leaf).variable_declaration(name) {
                    return Some(declaration.clone());
                }
            }
        }
        None
    }
}
