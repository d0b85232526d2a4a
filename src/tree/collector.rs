//! Name-collecting visitor
//!
//! Walks one statement or expression and extracts the derived sets the
//! matching heuristics consume: variable references, call expressions,
//! literals, operators, casts, and argument texts. A sub-expression the
//! visitor cannot classify simply contributes nothing; extraction never
//! fails a fragment.

use syn::parse::Parser;
use syn::visit::{self, Visit};

use crate::core::call::{CallExpr, CallKind};
use crate::core::fragment::CodeFragment;
use crate::core::location::SourceLocation;
use crate::tree::stringify::render;

#[derive(Default)]
pub struct Collector {
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
    pub arguments: Vec<String>,
    pub lambdas: Vec<String>,
}

impl Collector {
    pub fn collect_expr(expr: &syn::Expr) -> Self {
        let mut collector = Self::default();
        collector.visit_expr(expr);
        collector
    }

    pub fn collect_local(local: &syn::Local) -> Self {
        let mut collector = Self::default();
        collector.visit_local(local);
        collector
    }

    pub fn collect_macro_stmt(mac: &syn::StmtMacro) -> Self {
        let mut collector = Self::default();
        collector.record_macro(&mac.mac);
        collector
    }

    pub fn collect_pat(pat: &syn::Pat) -> Self {
        let mut collector = Self::default();
        collector.visit_pat(pat);
        collector
    }

    /// Move the collected sets into a fragment record
    pub fn fill(self, fragment: &mut CodeFragment) {
        fragment.variables = dedup_preserving_order(self.variables);
        fragment.method_invocations = self.method_invocations;
        fragment.creations = self.creations;
        fragment.types = dedup_preserving_order(self.types);
        fragment.string_literals = self.string_literals;
        fragment.number_literals = self.number_literals;
        fragment.bool_literals = self.bool_literals;
        fragment.null_literals = self.null_literals;
        fragment.infix_operators = self.infix_operators;
        fragment.infix_expressions = self.infix_expressions;
        fragment.prefix_expressions = self.prefix_expressions;
        fragment.array_accesses = self.array_accesses;
        fragment.casts = self.casts;
        fragment.arguments = self.arguments;
        fragment.lambdas = self.lambdas;
    }

    /// Only composite argument expressions are kept; a bare identifier or
    /// literal argument is already covered by the variable and literal sets
    fn record_call_arguments(&mut self, args: &[String]) {
        for arg in args {
            let simple = arg.chars().all(|c| c.is_alphanumeric() || c == '_')
                || arg.starts_with('"')
                || arg.starts_with('\'');
            if !simple {
                self.arguments.push(arg.clone());
            }
        }
    }

    /// A multi-segment path in argument position is a method reference
    fn record_method_refs(&mut self, args: &syn::punctuated::Punctuated<syn::Expr, syn::Token![,]>) {
        for arg in args {
            if let syn::Expr::Path(path) = arg {
                if path.path.segments.len() >= 2 {
                    if let Some(last) = path.path.segments.last() {
                        let name = last.ident.to_string();
                        if starts_lowercase(&name) {
                            self.method_invocations.push(CallExpr {
                                kind: CallKind::MethodRef,
                                name,
                                receiver: None,
                                arguments: Vec::new(),
                                text: render(path),
                                location: SourceLocation::of(path),
                            });
                        }
                    }
                }
            }
        }
    }

    fn record_macro(&mut self, mac: &syn::Macro) {
        let name = mac
            .path
            .segments
            .last()
            .map(|s| format!("{}!", s.ident))
            .unwrap_or_else(|| "!".to_string());
        let parser =
            syn::punctuated::Punctuated::<syn::Expr, syn::Token![,]>::parse_terminated;
        let parsed = parser.parse2(mac.tokens.clone()).ok();
        let mut arguments = Vec::new();
        if let Some(args) = &parsed {
            for arg in args {
                arguments.push(render(arg));
                self.visit_expr(arg);
            }
            self.record_call_arguments(&arguments);
        }
        self.method_invocations.push(CallExpr {
            kind: CallKind::Invocation,
            name,
            receiver: None,
            arguments,
            text: render(mac),
            location: SourceLocation::of(mac),
        });
    }
}

fn starts_lowercase(s: &str) -> bool {
    s.chars()
        .next()
        .map(|c| c.is_lowercase() || c == '_')
        .unwrap_or(false)
}

fn starts_uppercase(s: &str) -> bool {
    s.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

impl<'ast> Visit<'ast> for Collector {
    fn visit_expr_path(&mut self, node: &'ast syn::ExprPath) {
        let segments = &node.path.segments;
        if segments.len() == 1 {
            let name = segments[0].ident.to_string();
            if name == "None" {
                self.null_literals.push(name);
            } else if name == "self" {
                // bare receiver, only meaningful in field accesses
            } else if starts_lowercase(&name) {
                self.variables.push(name);
            } else {
                // enum variant or unit struct used as a value
                self.types.push(name);
            }
        } else if let Some(last) = segments.last() {
            let name = last.ident.to_string();
            if name == "None" {
                self.null_literals.push(render(node));
            }
        }
        visit::visit_expr_path(self, node);
    }

    fn visit_expr_field(&mut self, node: &'ast syn::ExprField) {
        self.variables.push(render(node));
        visit::visit_expr_field(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        let arguments: Vec<String> = node.args.iter().map(render).collect();
        self.record_call_arguments(&arguments);
        self.method_invocations.push(CallExpr {
            kind: CallKind::Invocation,
            name: node.method.to_string(),
            receiver: Some(render(&*node.receiver)),
            arguments,
            text: render(node),
            location: SourceLocation::of(node),
        });
        self.record_method_refs(&node.args);
        visit::visit_expr_method_call(self, node);
    }

    fn visit_expr_call(&mut self, node: &'ast syn::ExprCall) {
        let arguments: Vec<String> = node.args.iter().map(render).collect();
        self.record_call_arguments(&arguments);
        if let syn::Expr::Path(path) = &*node.func {
            let segments = &path.path.segments;
            if let Some(last) = segments.last() {
                let last_name = last.ident.to_string();
                let constructor = starts_uppercase(&last_name)
                    || (last_name == "new" && segments.len() >= 2)
                    || (last_name == "default" && segments.len() >= 2);
                let receiver = if segments.len() >= 2 {
                    let prefix: Vec<String> = segments
                        .iter()
                        .take(segments.len() - 1)
                        .map(|s| s.ident.to_string())
                        .collect();
                    Some(prefix.join("::"))
                } else {
                    None
                };
                let call = CallExpr {
                    kind: if constructor {
                        CallKind::Creation
                    } else {
                        CallKind::Invocation
                    },
                    name: last_name,
                    receiver: receiver.clone(),
                    arguments,
                    text: render(node),
                    location: SourceLocation::of(node),
                };
                if constructor {
                    if let Some(r) = receiver {
                        self.types.push(r);
                    }
                    self.creations.push(call);
                } else {
                    self.method_invocations.push(call);
                }
            }
        }
        self.record_method_refs(&node.args);
        visit::visit_expr_call(self, node);
    }

    fn visit_expr_struct(&mut self, node: &'ast syn::ExprStruct) {
        let arguments: Vec<String> = node
            .fields
            .iter()
            .map(|f| render(&f.expr))
            .collect();
        self.record_call_arguments(&arguments);
        let name = render(&node.path);
        self.types.push(name.clone());
        self.creations.push(CallExpr {
            kind: CallKind::Creation,
            name,
            receiver: None,
            arguments,
            text: render(node),
            location: SourceLocation::of(node),
        });
        visit::visit_expr_struct(self, node);
    }

    fn visit_expr_lit(&mut self, node: &'ast syn::ExprLit) {
        match &node.lit {
            syn::Lit::Str(_) | syn::Lit::ByteStr(_) | syn::Lit::Char(_) => {
                self.string_literals.push(render(node));
            }
            syn::Lit::Int(_) | syn::Lit::Float(_) | syn::Lit::Byte(_) => {
                self.number_literals.push(render(node));
            }
            syn::Lit::Bool(b) => {
                self.bool_literals.push(b.value.to_string());
            }
            _ => {}
        }
        visit::visit_expr_lit(self, node);
    }

    fn visit_expr_binary(&mut self, node: &'ast syn::ExprBinary) {
        self.infix_operators.push(render(&node.op));
        self.infix_expressions.push(render(node));
        visit::visit_expr_binary(self, node);
    }

    fn visit_expr_unary(&mut self, node: &'ast syn::ExprUnary) {
        self.prefix_expressions.push(render(node));
        visit::visit_expr_unary(self, node);
    }

    fn visit_expr_index(&mut self, node: &'ast syn::ExprIndex) {
        self.array_accesses.push(render(node));
        visit::visit_expr_index(self, node);
    }

    fn visit_expr_cast(&mut self, node: &'ast syn::ExprCast) {
        self.casts.push(render(node));
        self.types.push(render(&*node.ty));
        visit::visit_expr_cast(self, node);
    }

    fn visit_expr_closure(&mut self, node: &'ast syn::ExprClosure) {
        self.lambdas.push(render(node));
        visit::visit_expr_closure(self, node);
    }

    fn visit_expr_macro(&mut self, node: &'ast syn::ExprMacro) {
        self.record_macro(&node.mac);
    }

    fn visit_local(&mut self, node: &'ast syn::Local) {
        if let syn::Pat::Type(pat_type) = &node.pat {
            self.types.push(render(&*pat_type.ty));
        }
        self.visit_pat(&node.pat);
        if let Some(init) = &node.init {
            self.visit_expr(&init.expr);
        }
    }

    fn visit_pat_ident(&mut self, node: &'ast syn::PatIdent) {
        // patterns bind rather than reference, but the bound name is still a
        // variable occurrence for textual matching purposes
        self.variables.push(node.ident.to_string());
        visit::visit_pat_ident(self, node);
    }
}
