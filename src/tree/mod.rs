//! Parsing front-end adapter: `syn` items in, fragment trees out

pub mod builder;
pub mod collector;
pub mod stringify;

pub use builder::{decompose, operation_from_impl_item_fn, operation_from_item_fn};

use std::path::Path;

use crate::core::errors::{Error, Result};
use crate::core::operation::Operation;

/// Parse a source file and build an operation per function found, both
/// free functions and impl-block methods
pub fn parse_operations(source: &str, file: &Path) -> Result<Vec<Operation>> {
    let parsed: syn::File =
        syn::parse_file(source).map_err(|e| Error::parse(file, e.to_string()))?;
    let mut operations = Vec::new();
    collect_operations(&parsed.items, &mut operations);
    Ok(operations)
}

fn collect_operations(items: &[syn::Item], out: &mut Vec<Operation>) {
    for item in items {
        match item {
            syn::Item::Fn(item_fn) => out.push(operation_from_item_fn(item_fn)),
            syn::Item::Impl(item_impl) => {
                let owner = impl_type_name(item_impl);
                for impl_item in &item_impl.items {
                    if let syn::ImplItem::Fn(method) = impl_item {
                        out.push(operation_from_impl_item_fn(&owner, method));
                    }
                }
            }
            syn::Item::Mod(item_mod) => {
                if let Some((_, nested)) = &item_mod.content {
                    collect_operations(nested, out);
                }
            }
            _ => {}
        }
    }
}

fn impl_type_name(item_impl: &syn::ItemImpl) -> String {
    if let syn::Type::Path(type_path) = &*item_impl.self_ty {
        type_path
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .unwrap_or_default()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::path::PathBuf;

    #[test]
    fn parses_free_functions_and_methods() {
        let source = indoc! {"
            fn alpha() { let a = 1; }

            struct Counter;

            impl Counter {
                fn bump(&mut self) { self.count += 1; }
            }

            mod inner {
                fn beta() { return; }
            }
        "};
        let operations = parse_operations(source, &PathBuf::from("test.rs")).unwrap();
        let names: Vec<&str> = operations.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Counter::bump", "beta"]);
    }

    #[test]
    fn parse_failure_reports_file() {
        let result = parse_operations("fn broken(", &PathBuf::from("bad.rs"));
        assert!(result.is_err());
    }
}
