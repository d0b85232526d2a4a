//! Fragment tree data model
//!
//! A method body decomposes into a tree of code fragments: leaves are
//! non-composite statements, composites are control-flow constructs, and
//! expressions are sub-expressions owned by a composite (an `if` condition,
//! a `match` scrutinee). The tree is stored as an arena of fragment records
//! indexed by `FragmentId`; the parent link is a non-owning handle into the
//! same arena, children are owned by index order. Depth and index are
//! assigned exactly once, at construction time, by the tree builder.

use serde::{Deserialize, Serialize};

use crate::core::call::{CallExpr, CallKind};
use crate::core::location::SourceLocation;
use crate::core::variable::VariableDeclaration;

/// Handle to a fragment record in a `StatementTree` arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId(pub usize);

/// Control-flow constructs that form inner nodes of the tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositeKind {
    Block,
    If,
    While,
    Loop,
    ForLoop,
    Match,
    MatchArm,
    Unsafe,
    Labeled,
}

/// Role an owned expression plays inside its composite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionRole {
    Condition,
    Scrutinee,
    ForPattern,
    ForIterator,
    ArmPattern,
    ArmGuard,
}

/// Closed variant over the three fragment families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentKind {
    Leaf,
    Composite(CompositeKind),
    Expression(ExpressionRole),
}

/// A node of the decomposed statement/expression tree
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeFragment {
    pub id: FragmentId,
    pub kind: FragmentKind,
    pub parent: Option<FragmentId>,
    /// Child statements, in source order (composites only)
    pub children: Vec<FragmentId>,
    /// Owned expressions, in source order (composites only)
    pub expressions: Vec<FragmentId>,
    /// Nesting level; the root block is 0
    pub depth: usize,
    /// Sibling order within the parent at insertion time
    pub index: usize,
    /// Normalized source text; composite text is the construct header
    pub text: String,
    pub location: SourceLocation,

    pub variables: Vec<String>,
    pub method_invocations: Vec<CallExpr>,
    pub creations: Vec<CallExpr>,
    pub types: Vec<String>,
    pub string_literals: Vec<String>,
    pub number_literals: Vec<String>,
    pub bool_literals: Vec<String>,
    pub null_literals: Vec<String>,
    pub infix_operators: Vec<String>,
    pub infix_expressions: Vec<String>,
    pub prefix_expressions: Vec<String>,
    pub array_accesses: Vec<String>,
    pub casts: Vec<String>,
    /// Argument texts of every call in the fragment
    pub arguments: Vec<String>,
    pub variable_declarations: Vec<VariableDeclaration>,
    pub lambdas: Vec<String>,
}

impl CodeFragment {
    pub(crate) fn new(
        id: FragmentId,
        kind: FragmentKind,
        parent: Option<FragmentId>,
        depth: usize,
        index: usize,
        text: String,
        location: SourceLocation,
    ) -> Self {
        Self {
            id,
            kind,
            parent,
            children: Vec::new(),
            expressions: Vec::new(),
            depth,
            index,
            text,
            location,
            variables: Vec::new(),
            method_invocations: Vec::new(),
            creations: Vec::new(),
            types: Vec::new(),
            string_literals: Vec::new(),
            number_literals: Vec::new(),
            bool_literals: Vec::new(),
            null_literals: Vec::new(),
            infix_operators: Vec::new(),
            infix_expressions: Vec::new(),
            prefix_expressions: Vec::new(),
            array_accesses: Vec::new(),
            casts: Vec::new(),
            arguments: Vec::new(),
            variable_declarations: Vec::new(),
            lambdas: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == FragmentKind::Leaf
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, FragmentKind::Composite(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self.kind, FragmentKind::Expression(_))
    }

    pub fn composite_kind(&self) -> Option<CompositeKind> {
        match self.kind {
            FragmentKind::Composite(k) => Some(k),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        self.kind == FragmentKind::Composite(CompositeKind::Block)
    }

    /// A leaf that declares at least one variable (`let` statement)
    pub fn is_variable_declaration_statement(&self) -> bool {
        self.is_leaf() && !self.variable_declarations.is_empty()
    }

    /// The statement text with the statement wrapper stripped: trailing
    /// terminator, leading `return`, and the `let <pat> =` head of a
    /// declaration. Used to test whether a single call covers the fragment.
    pub fn main_expression_text(&self) -> String {
        let mut s = self.text.trim_end().trim_end_matches(';').trim();
        if let Some(rest) = s.strip_prefix("return ") {
            s = rest.trim();
        }
        if s.starts_with("let ") {
            if let Some(eq) = s.find('=') {
                s = s[eq + 1..].trim();
            }
        }
        s.to_string()
    }

    /// The invocation whose text covers the entire statement, if any
    pub fn invocation_covering_entire_fragment(&self) -> Option<&CallExpr> {
        let main = self.main_expression_text();
        self.method_invocations
            .iter()
            .find(|c| c.kind == CallKind::Invocation && c.text == main)
    }

    /// The creation whose text covers the entire statement, if any
    pub fn creation_covering_entire_fragment(&self) -> Option<&CallExpr> {
        let main = self.main_expression_text();
        self.creations.iter().find(|c| c.text == main)
    }

    /// Declaration of `name` made by this fragment itself
    pub fn variable_declaration(&self, name: &str) -> Option<&VariableDeclaration> {
        self.variable_declarations.iter().find(|d| d.name == name)
    }
}

/// Arena holding one decomposed method body
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatementTree {
    fragments: Vec<CodeFragment>,
    root: Option<FragmentId>,
}

impl StatementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(
        &mut self,
        kind: FragmentKind,
        parent: Option<FragmentId>,
        depth: usize,
        index: usize,
        text: String,
        location: SourceLocation,
    ) -> FragmentId {
        let id = FragmentId(self.fragments.len());
        self.fragments
            .push(CodeFragment::new(id, kind, parent, depth, index, text, location));
        id
    }

    pub(crate) fn set_root(&mut self, id: FragmentId) {
        self.root = Some(id);
    }

    pub(crate) fn get_mut(&mut self, id: FragmentId) -> &mut CodeFragment {
        &mut self.fragments[id.0]
    }

    pub fn root(&self) -> Option<FragmentId> {
        self.root
    }

    pub fn get(&self, id: FragmentId) -> &CodeFragment {
        &self.fragments[id.0]
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> impl Iterator<Item = &CodeFragment> {
        self.fragments.iter()
    }

    /// All leaf fragments, in source order
    pub fn leaves(&self) -> Vec<FragmentId> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_leaves(root, &mut out);
        }
        out
    }

    fn collect_leaves(&self, id: FragmentId, out: &mut Vec<FragmentId>) {
        let fragment = self.get(id);
        if fragment.is_leaf() {
            out.push(id);
        }
        for &child in &fragment.children {
            self.collect_leaves(child, out);
        }
    }

    /// All composite fragments, post-order, root last
    pub fn inner_nodes(&self) -> Vec<FragmentId> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_inner_nodes(root, &mut out);
        }
        out
    }

    fn collect_inner_nodes(&self, id: FragmentId, out: &mut Vec<FragmentId>) {
        let fragment = self.get(id);
        for &child in &fragment.children {
            self.collect_inner_nodes(child, out);
        }
        if fragment.is_composite() {
            out.push(id);
        }
    }

    /// Leaf descendants of one composite
    pub fn leaves_of(&self, id: FragmentId) -> Vec<FragmentId> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out);
        out
    }

    /// Direct child statements of one composite
    pub fn children_of(&self, id: FragmentId) -> &[FragmentId] {
        &self.get(id).children
    }

    /// Owned expressions of one composite
    pub fn expressions_of(&self, id: FragmentId) -> &[FragmentId] {
        &self.get(id).expressions
    }

    /// Nearest enclosing composite that is not a bare block
    pub fn parent_skipping_blocks(&self, id: FragmentId) -> Option<FragmentId> {
        let mut current = self.get(id).parent;
        while let Some(pid) = current {
            let parent = self.get(pid);
            if !parent.is_block() {
                return Some(pid);
            }
            current = parent.parent;
        }
        None
    }

    /// Resolve `name` against this fragment's declarations, then upward
    /// through enclosing composites
    pub fn search_variable_declaration(
        &self,
        id: FragmentId,
        name: &str,
    ) -> Option<&VariableDeclaration> {
        let mut current = Some(id);
        while let Some(cid) = current {
            let fragment = self.get(cid);
            if let Some(declaration) = fragment.variable_declaration(name) {
                return Some(declaration);
            }
            // siblings declared earlier in the same parent are visible too
            if let Some(pid) = fragment.parent {
                for &sibling in &self.get(pid).children {
                    if sibling == cid {
                        break;
                    }
                    if let Some(declaration) = self.get(sibling).variable_declaration(name) {
                        return Some(declaration);
                    }
                }
            }
            current = fragment.parent;
        }
        None
    }
}
