//! Call expressions referenced by fragments
//!
//! The original design used a deep class hierarchy for calls; here the three
//! call shapes are a closed tagged variant, with behavior as plain methods
//! dispatching on the tag.

use serde::{Deserialize, Serialize};

use crate::core::location::SourceLocation;

/// The three shapes a call can take
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    /// `receiver.method(args)` or `free_function(args)`
    Invocation,
    /// `Type::new(args)` or a struct literal `Type { .. }`
    Creation,
    /// A path to a function passed as an argument, e.g. `Self::helper`
    MethodRef,
}

/// A call expression extracted from a fragment
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallExpr {
    pub kind: CallKind,
    /// Method or function name (last path segment), or the created type name
    pub name: String,
    /// Rendered receiver expression, if any
    pub receiver: Option<String>,
    /// Rendered argument expressions, in order
    pub arguments: Vec<String>,
    /// Full rendered text of the call
    pub text: String,
    pub location: SourceLocation,
}

impl CallExpr {
    pub fn is_invocation(&self) -> bool {
        self.kind == CallKind::Invocation
    }

    pub fn is_creation(&self) -> bool {
        self.kind == CallKind::Creation
    }

    /// Same callee name on both sides
    pub fn identical_name(&self, other: &CallExpr) -> bool {
        self.name == other.name
    }

    /// Same receiver text on both sides (both absent counts as identical)
    pub fn identical_receiver(&self, other: &CallExpr) -> bool {
        self.receiver == other.receiver
    }

    /// Same argument list on both sides
    pub fn equal_arguments(&self, other: &CallExpr) -> bool {
        self.arguments == other.arguments
    }

    /// Receivers compatible for a call-replacement: identical, or one side
    /// has no receiver, or one receiver is a prefix path of the other.
    pub fn compatible_receiver(&self, other: &CallExpr) -> bool {
        match (&self.receiver, &other.receiver) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => {
                a == b || a.starts_with(b.as_str()) || b.starts_with(a.as_str())
            }
        }
    }

    /// Arguments common to both calls, in this call's order
    pub fn argument_intersection(&self, other: &CallExpr) -> Vec<String> {
        self.arguments
            .iter()
            .filter(|a| other.arguments.contains(a))
            .cloned()
            .collect()
    }

    /// True when the two argument lists hold the same elements in a
    /// different order (the `f(a, b)` vs `f(b, a)` shape)
    pub fn swapped_arguments(&self, other: &CallExpr) -> bool {
        if self.arguments.len() != other.arguments.len() || self.arguments.len() < 2 {
            return false;
        }
        if self.arguments == other.arguments {
            return false;
        }
        let mut sorted1 = self.arguments.clone();
        let mut sorted2 = other.arguments.clone();
        sorted1.sort();
        sorted2.sort();
        sorted1 == sorted2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::location::SourcePos;

    fn call(name: &str, args: &[&str]) -> CallExpr {
        CallExpr {
            kind: CallKind::Invocation,
            name: name.to_string(),
            receiver: None,
            arguments: args.iter().map(|s| s.to_string()).collect(),
            text: format!("{}({})", name, args.join(", ")),
            location: SourceLocation::new(SourcePos::new(1, 0), SourcePos::new(1, 0)),
        }
    }

    #[test]
    fn swapped_arguments_detects_reorder() {
        assert!(call("f", &["a", "b"]).swapped_arguments(&call("f", &["b", "a"])));
        assert!(!call("f", &["a", "b"]).swapped_arguments(&call("f", &["a", "b"])));
        assert!(!call("f", &["a", "b"]).swapped_arguments(&call("f", &["a", "c"])));
        assert!(!call("f", &["a"]).swapped_arguments(&call("f", &["a"])));
    }
}
