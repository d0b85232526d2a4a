//! Fragment tree construction
//!
//! Walks a parsed `syn::Block` and produces the `StatementTree`: one
//! composite per control-flow construct, one leaf per non-composite
//! statement, and owned `Expression` fragments for conditions, scrutinees,
//! and loop headers. Depth and index are assigned here, exactly once; a
//! child's depth is its parent's depth plus one, its index is its position
//! in the parent's statement list at insertion time. Owned expressions keep
//! the depth and index of their owning composite.

use crate::core::fragment::{
    CompositeKind, ExpressionRole, FragmentId, FragmentKind, StatementTree,
};
use crate::core::location::{SourceLocation, SourcePos, VariableScope};
use crate::core::operation::{Operation, Parameter};
use crate::core::variable::VariableDeclaration;
use crate::tree::collector::Collector;
use crate::tree::stringify::{render, statement_text};

/// Decompose a parsed method body into its fragment tree
pub fn decompose(block: &syn::Block) -> StatementTree {
    let mut tree = StatementTree::new();
    let root = tree.alloc(
        FragmentKind::Composite(CompositeKind::Block),
        None,
        0,
        0,
        "{".to_string(),
        SourceLocation::of(block),
    );
    tree.set_root(root);
    let block_end: SourcePos = SourceLocation::of(block).end;
    for stmt in &block.stmts {
        build_statement(&mut tree, stmt, root, block_end);
    }
    aggregate_composite_sets(&mut tree);
    tree
}

/// Composites expose the derived sets of their owned expressions, so the
/// replacement classifier can work on headers the same way it works on
/// leaves
fn aggregate_composite_sets(tree: &mut StatementTree) {
    let composite_ids: Vec<FragmentId> = tree
        .fragments()
        .filter(|f| f.is_composite() && !f.expressions.is_empty())
        .map(|f| f.id)
        .collect();
    for id in composite_ids {
        let mut aggregate = Collector::default();
        for &expression in &tree.get(id).expressions.clone() {
            let source = tree.get(expression);
            aggregate.variables.extend(source.variables.iter().cloned());
            aggregate
                .method_invocations
                .extend(source.method_invocations.iter().cloned());
            aggregate.creations.extend(source.creations.iter().cloned());
            aggregate.types.extend(source.types.iter().cloned());
            aggregate
                .string_literals
                .extend(source.string_literals.iter().cloned());
            aggregate
                .number_literals
                .extend(source.number_literals.iter().cloned());
            aggregate
                .bool_literals
                .extend(source.bool_literals.iter().cloned());
            aggregate
                .null_literals
                .extend(source.null_literals.iter().cloned());
            aggregate
                .infix_operators
                .extend(source.infix_operators.iter().cloned());
            aggregate
                .infix_expressions
                .extend(source.infix_expressions.iter().cloned());
            aggregate
                .prefix_expressions
                .extend(source.prefix_expressions.iter().cloned());
            aggregate
                .array_accesses
                .extend(source.array_accesses.iter().cloned());
            aggregate.casts.extend(source.casts.iter().cloned());
            aggregate.arguments.extend(source.arguments.iter().cloned());
            aggregate.lambdas.extend(source.lambdas.iter().cloned());
        }
        aggregate.fill(tree.get_mut(id));
    }
}

/// Build an `Operation` from a free function item
pub fn operation_from_item_fn(item: &syn::ItemFn) -> Operation {
    Operation::new(
        item.sig.ident.to_string(),
        parameters_of(&item.sig),
        decompose(&item.block),
    )
}

/// Build an `Operation` from an impl-block method
pub fn operation_from_impl_item_fn(owner: &str, item: &syn::ImplItemFn) -> Operation {
    let name = if owner.is_empty() {
        item.sig.ident.to_string()
    } else {
        format!("{}::{}", owner, item.sig.ident)
    };
    Operation::new(name, parameters_of(&item.sig), decompose(&item.block))
}

fn parameters_of(sig: &syn::Signature) -> Vec<Parameter> {
    sig.inputs
        .iter()
        .filter_map(|input| match input {
            syn::FnArg::Typed(pat_type) => match &*pat_type.pat {
                syn::Pat::Ident(ident) => Some(Parameter {
                    name: ident.ident.to_string(),
                    type_annotation: Some(render(&*pat_type.ty)),
                }),
                _ => None,
            },
            syn::FnArg::Receiver(_) => Some(Parameter {
                name: "self".to_string(),
                type_annotation: None,
            }),
        })
        .collect()
}

fn next_index(tree: &StatementTree, parent: FragmentId) -> usize {
    tree.get(parent).children.len()
}

fn attach_child(tree: &mut StatementTree, parent: FragmentId, child: FragmentId) {
    tree.get_mut(parent).children.push(child);
}

fn attach_expression(
    tree: &mut StatementTree,
    owner: FragmentId,
    role: ExpressionRole,
    text: String,
    location: SourceLocation,
    collector: Collector,
) {
    let (depth, index) = {
        let fragment = tree.get(owner);
        (fragment.depth, fragment.index)
    };
    let id = tree.alloc(
        FragmentKind::Expression(role),
        Some(owner),
        depth,
        index,
        text,
        location,
    );
    collector.fill(tree.get_mut(id));
    tree.get_mut(owner).expressions.push(id);
}

fn alloc_composite(
    tree: &mut StatementTree,
    kind: CompositeKind,
    parent: FragmentId,
    text: String,
    location: SourceLocation,
) -> FragmentId {
    let depth = tree.get(parent).depth + 1;
    let index = next_index(tree, parent);
    let id = tree.alloc(
        FragmentKind::Composite(kind),
        Some(parent),
        depth,
        index,
        text,
        location,
    );
    attach_child(tree, parent, id);
    id
}

fn alloc_leaf(
    tree: &mut StatementTree,
    parent: FragmentId,
    text: String,
    location: SourceLocation,
    collector: Collector,
) -> FragmentId {
    let depth = tree.get(parent).depth + 1;
    let index = next_index(tree, parent);
    let id = tree.alloc(FragmentKind::Leaf, Some(parent), depth, index, text, location);
    collector.fill(tree.get_mut(id));
    attach_child(tree, parent, id);
    id
}

fn build_block_composite(
    tree: &mut StatementTree,
    block: &syn::Block,
    parent: FragmentId,
) -> FragmentId {
    let id = alloc_composite(
        tree,
        CompositeKind::Block,
        parent,
        "{".to_string(),
        SourceLocation::of(block),
    );
    let block_end = SourceLocation::of(block).end;
    for stmt in &block.stmts {
        build_statement(tree, stmt, id, block_end);
    }
    id
}

fn build_statement(
    tree: &mut StatementTree,
    stmt: &syn::Stmt,
    parent: FragmentId,
    scope_end: SourcePos,
) {
    match stmt {
        syn::Stmt::Local(local) => build_local(tree, local, parent, scope_end),
        syn::Stmt::Macro(mac) => {
            let text = statement_text(&render(mac), true);
            alloc_leaf(
                tree,
                parent,
                text,
                SourceLocation::of(mac),
                Collector::collect_macro_stmt(mac),
            );
        }
        syn::Stmt::Item(item) => {
            // nested items are opaque leaves; their insides are not matched
            let text = statement_text(&render(item), false);
            alloc_leaf(
                tree,
                parent,
                text,
                SourceLocation::of(item),
                Collector::default(),
            );
        }
        syn::Stmt::Expr(expr, semi) => build_expr_statement(tree, expr, semi.is_some(), parent),
    }
}

fn build_local(
    tree: &mut StatementTree,
    local: &syn::Local,
    parent: FragmentId,
    scope_end: SourcePos,
) {
    let location = SourceLocation::of(local);
    let text = statement_text(&render(local), true);
    let id = alloc_leaf(tree, parent, text, location, Collector::collect_local(local));

    let initializer = local.init.as_ref().map(|init| render(&*init.expr));
    let mut declarations = Vec::new();
    pattern_declarations(
        &local.pat,
        None,
        &initializer,
        location,
        scope_end,
        &mut declarations,
    );
    tree.get_mut(id).variable_declarations = declarations;
}

fn pattern_declarations(
    pat: &syn::Pat,
    type_annotation: Option<String>,
    initializer: &Option<String>,
    location: SourceLocation,
    scope_end: SourcePos,
    out: &mut Vec<VariableDeclaration>,
) {
    match pat {
        syn::Pat::Ident(ident) => {
            out.push(VariableDeclaration {
                name: ident.ident.to_string(),
                type_annotation,
                initializer: initializer.clone(),
                is_mut: ident.mutability.is_some(),
                scope: VariableScope::new(location.start, scope_end),
                location,
            });
        }
        syn::Pat::Type(pat_type) => {
            pattern_declarations(
                &pat_type.pat,
                Some(render(&*pat_type.ty)),
                initializer,
                location,
                scope_end,
                out,
            );
        }
        syn::Pat::Tuple(tuple) => {
            for element in &tuple.elems {
                pattern_declarations(element, None, initializer, location, scope_end, out);
            }
        }
        syn::Pat::TupleStruct(tuple_struct) => {
            for element in &tuple_struct.elems {
                pattern_declarations(element, None, initializer, location, scope_end, out);
            }
        }
        syn::Pat::Reference(reference) => {
            pattern_declarations(&reference.pat, None, initializer, location, scope_end, out);
        }
        _ => {}
    }
}

fn build_expr_statement(
    tree: &mut StatementTree,
    expr: &syn::Expr,
    has_semicolon: bool,
    parent: FragmentId,
) {
    match expr {
        syn::Expr::If(expr_if) => build_if(tree, expr_if, parent),
        syn::Expr::While(expr_while) => {
            let condition_text = render(&*expr_while.cond);
            let id = alloc_composite(
                tree,
                CompositeKind::While,
                parent,
                format!("while {}", condition_text),
                SourceLocation::of(expr_while),
            );
            attach_expression(
                tree,
                id,
                ExpressionRole::Condition,
                condition_text,
                SourceLocation::of(&*expr_while.cond),
                Collector::collect_expr(&expr_while.cond),
            );
            build_block_composite(tree, &expr_while.body, id);
        }
        syn::Expr::ForLoop(expr_for) => {
            let pattern_text = render(&*expr_for.pat);
            let iterator_text = render(&*expr_for.expr);
            let id = alloc_composite(
                tree,
                CompositeKind::ForLoop,
                parent,
                format!("for {} in {}", pattern_text, iterator_text),
                SourceLocation::of(expr_for),
            );
            attach_expression(
                tree,
                id,
                ExpressionRole::ForPattern,
                pattern_text,
                SourceLocation::of(&*expr_for.pat),
                Collector::collect_pat(&expr_for.pat),
            );
            attach_expression(
                tree,
                id,
                ExpressionRole::ForIterator,
                iterator_text,
                SourceLocation::of(&*expr_for.expr),
                Collector::collect_expr(&expr_for.expr),
            );
            build_block_composite(tree, &expr_for.body, id);
        }
        syn::Expr::Loop(expr_loop) => {
            let id = alloc_composite(
                tree,
                CompositeKind::Loop,
                parent,
                "loop".to_string(),
                SourceLocation::of(expr_loop),
            );
            build_block_composite(tree, &expr_loop.body, id);
        }
        syn::Expr::Match(expr_match) => build_match(tree, expr_match, parent),
        syn::Expr::Unsafe(expr_unsafe) => {
            let id = alloc_composite(
                tree,
                CompositeKind::Unsafe,
                parent,
                "unsafe".to_string(),
                SourceLocation::of(expr_unsafe),
            );
            build_block_composite(tree, &expr_unsafe.block, id);
        }
        syn::Expr::Block(expr_block) => {
            if let Some(label) = &expr_block.label {
                let id = alloc_composite(
                    tree,
                    CompositeKind::Labeled,
                    parent,
                    format!("{}: {{", render(&label.name)),
                    SourceLocation::of(expr_block),
                );
                build_block_composite(tree, &expr_block.block, id);
            } else {
                build_block_composite(tree, &expr_block.block, parent);
            }
        }
        _ => {
            let text = statement_text(&render(expr), has_semicolon);
            alloc_leaf(
                tree,
                parent,
                text,
                SourceLocation::of(expr),
                Collector::collect_expr(expr),
            );
        }
    }
}

fn build_if(tree: &mut StatementTree, expr_if: &syn::ExprIf, parent: FragmentId) {
    let condition_text = render(&*expr_if.cond);
    let id = alloc_composite(
        tree,
        CompositeKind::If,
        parent,
        format!("if {}", condition_text),
        SourceLocation::of(expr_if),
    );
    attach_expression(
        tree,
        id,
        ExpressionRole::Condition,
        condition_text,
        SourceLocation::of(&*expr_if.cond),
        Collector::collect_expr(&expr_if.cond),
    );
    build_block_composite(tree, &expr_if.then_branch, id);
    if let Some((_, else_expr)) = &expr_if.else_branch {
        match &**else_expr {
            syn::Expr::If(nested) => build_if(tree, nested, id),
            syn::Expr::Block(block) => {
                build_block_composite(tree, &block.block, id);
            }
            other => build_expr_statement(tree, other, false, id),
        }
    }
}

fn build_match(tree: &mut StatementTree, expr_match: &syn::ExprMatch, parent: FragmentId) {
    let scrutinee_text = render(&*expr_match.expr);
    let id = alloc_composite(
        tree,
        CompositeKind::Match,
        parent,
        format!("match {}", scrutinee_text),
        SourceLocation::of(expr_match),
    );
    attach_expression(
        tree,
        id,
        ExpressionRole::Scrutinee,
        scrutinee_text,
        SourceLocation::of(&*expr_match.expr),
        Collector::collect_expr(&expr_match.expr),
    );
    for arm in &expr_match.arms {
        let pattern_text = render(&arm.pat);
        let header = match &arm.guard {
            Some((_, guard)) => format!("{} if {} =>", pattern_text, render(&**guard)),
            None => format!("{} =>", pattern_text),
        };
        let arm_id = alloc_composite(
            tree,
            CompositeKind::MatchArm,
            id,
            header,
            SourceLocation::of(arm),
        );
        attach_expression(
            tree,
            arm_id,
            ExpressionRole::ArmPattern,
            pattern_text,
            SourceLocation::of(&arm.pat),
            Collector::collect_pat(&arm.pat),
        );
        if let Some((_, guard)) = &arm.guard {
            attach_expression(
                tree,
                arm_id,
                ExpressionRole::ArmGuard,
                render(&**guard),
                SourceLocation::of(&**guard),
                Collector::collect_expr(guard),
            );
        }
        match &*arm.body {
            syn::Expr::Block(block) => {
                build_block_composite(tree, &block.block, arm_id);
            }
            other => build_expr_statement(tree, other, true, arm_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fragment::FragmentKind;

    fn tree_of(body: &str) -> StatementTree {
        let block: syn::Block = syn::parse_str(&format!("{{ {} }}", body)).unwrap();
        decompose(&block)
    }

    #[test]
    fn leaves_are_flat_statements() {
        let tree = tree_of("let a = foo(); a += 1; return a;");
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(tree.get(leaves[0]).text, "let a = foo();\n");
        assert_eq!(tree.get(leaves[1]).text, "a += 1;\n");
        assert_eq!(tree.get(leaves[2]).text, "return a;\n");
    }

    #[test]
    fn depth_and_index_follow_nesting() {
        let tree = tree_of("if ready { go(); } done();");
        let leaves = tree.leaves();
        let go = tree.get(leaves[0]);
        let done = tree.get(leaves[1]);
        // root block = 0, if = 1, then-block = 2, leaf = 3
        assert_eq!(go.depth, 3);
        assert_eq!(go.index, 0);
        assert_eq!(done.depth, 1);
        assert_eq!(done.index, 1);
    }

    #[test]
    fn inner_nodes_are_post_order_with_root_last() {
        let tree = tree_of("while x < 10 { x += 1; }");
        let inner = tree.inner_nodes();
        let kinds: Vec<_> = inner
            .iter()
            .map(|&id| tree.get(id).composite_kind().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![CompositeKind::Block, CompositeKind::While, CompositeKind::Block]
        );
        assert_eq!(inner.last().copied(), tree.root());
    }

    #[test]
    fn composite_header_owns_condition_expression() {
        let tree = tree_of("if count > limit { trim(); }");
        let inner = tree.inner_nodes();
        let if_id = inner
            .iter()
            .find(|&&id| tree.get(id).composite_kind() == Some(CompositeKind::If))
            .copied()
            .unwrap();
        let if_fragment = tree.get(if_id);
        assert_eq!(if_fragment.text, "if count > limit");
        assert_eq!(if_fragment.expressions.len(), 1);
        let condition = tree.get(if_fragment.expressions[0]);
        assert!(matches!(condition.kind, FragmentKind::Expression(_)));
        assert_eq!(condition.text, "count > limit");
        assert_eq!(condition.depth, if_fragment.depth);
        assert_eq!(condition.index, if_fragment.index);
        assert_eq!(condition.variables, vec!["count", "limit"]);
    }

    #[test]
    fn let_statement_records_declaration_and_scope() {
        let tree = tree_of("let mut total: u64 = 0; total += 1;");
        let leaves = tree.leaves();
        let declaration_stmt = tree.get(leaves[0]);
        assert!(declaration_stmt.is_variable_declaration_statement());
        let declaration = &declaration_stmt.variable_declarations[0];
        assert_eq!(declaration.name, "total");
        assert!(declaration.is_mut);
        assert_eq!(declaration.type_annotation.as_deref(), Some("u64"));
        assert_eq!(declaration.initializer.as_deref(), Some("0"));
        let use_site = tree.get(leaves[1]);
        assert!(declaration.scope.subsumes(&use_site.location));
    }

    #[test]
    fn match_decomposes_into_arm_composites() {
        let tree = tree_of("match state { Idle => wait(), Busy => { poll(); } }");
        let arms: Vec<_> = tree
            .inner_nodes()
            .into_iter()
            .filter(|&id| tree.get(id).composite_kind() == Some(CompositeKind::MatchArm))
            .collect();
        assert_eq!(arms.len(), 2);
        assert_eq!(tree.get(arms[0]).text, "Idle =>");
        let leaves = tree.leaves_of(arms[0]);
        assert_eq!(tree.get(leaves[0]).text, "wait();\n");
    }

    #[test]
    fn covering_invocation_detected_for_call_statements() {
        let tree = tree_of("let a = foo(); bar(a); return baz();");
        let leaves = tree.leaves();
        assert!(tree
            .get(leaves[0])
            .invocation_covering_entire_fragment()
            .is_some());
        assert!(tree
            .get(leaves[1])
            .invocation_covering_entire_fragment()
            .is_some());
        assert!(tree
            .get(leaves[2])
            .invocation_covering_entire_fragment()
            .is_some());
    }
}
