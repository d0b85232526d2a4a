// Export modules for library usage
pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod distance;
pub mod matching;
pub mod output;
pub mod replacement;
pub mod tree;

// Re-export commonly used types
pub use crate::core::{
    CallExpr, CallKind, CodeFragment, CompositeKind, Error, ExpressionRole, FragmentId,
    FragmentKind, Operation, Parameter, Result, SourceLocation, SourcePos, StatementTree,
    VariableDeclaration, VariableScope,
};

pub use crate::matching::{BodyMapper, CodeMapping, CompositeMapping, LeafMapping, MappingKind};

pub use crate::replacement::{Direction, Replacement, ReplacementKind};

pub use crate::analysis::{diff_operations, diff_sources};

pub use crate::tree::{decompose, operation_from_impl_item_fn, operation_from_item_fn, parse_operations};

pub use crate::distance::{edit_distance, normalized_distance, normalized_distance_ignore_case};
