pub mod call;
pub mod errors;
pub mod fragment;
pub mod location;
pub mod operation;
pub mod variable;

pub use call::{CallExpr, CallKind};
pub use errors::{Error, Result};
pub use fragment::{
    CodeFragment, CompositeKind, ExpressionRole, FragmentId, FragmentKind, StatementTree,
};
pub use location::{SourceLocation, SourcePos, VariableScope};
pub use operation::{Operation, Parameter};
pub use variable::VariableDeclaration;
