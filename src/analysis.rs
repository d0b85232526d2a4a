//! High-level driver: pair functions across two sources and map each pair
//!
//! Each function pair gets its own `BodyMapper`; mappers share no state, so
//! pairs run in parallel.

use std::path::Path;

use rayon::prelude::*;

use crate::config::DiffConfig;
use crate::core::errors::Result;
use crate::core::operation::Operation;
use crate::matching::BodyMapper;
use crate::output::{DiffReport, FunctionDiff};
use crate::tree::parse_operations;

/// Diff two parsed source texts
pub fn diff_sources(
    before_source: &str,
    after_source: &str,
    before_path: &Path,
    after_path: &Path,
    config: &DiffConfig,
) -> Result<DiffReport> {
    let before_operations = parse_operations(before_source, before_path)?;
    let after_operations = parse_operations(after_source, after_path)?;
    Ok(diff_operations(before_operations, after_operations, config))
}

/// Pair operations by name and map every pair
pub fn diff_operations(
    before_operations: Vec<Operation>,
    after_operations: Vec<Operation>,
    config: &DiffConfig,
) -> DiffReport {
    let keep = |name: &str| {
        config
            .function_filter
            .as_deref()
            .map_or(true, |filter| name.contains(filter))
    };
    let pairs: Vec<(Operation, Operation)> = before_operations
        .iter()
        .filter(|before| keep(&before.name))
        .filter_map(|before| {
            after_operations
                .iter()
                .find(|after| after.name == before.name)
                .map(|after| (before.clone(), after.clone()))
        })
        .collect();
    let removed_functions: Vec<String> = before_operations
        .iter()
        .filter(|before| keep(&before.name))
        .filter(|before| !after_operations.iter().any(|a| a.name == before.name))
        .map(|o| o.name.clone())
        .collect();
    let added_functions: Vec<String> = after_operations
        .iter()
        .filter(|after| keep(&after.name))
        .filter(|after| !before_operations.iter().any(|b| b.name == after.name))
        .map(|o| o.name.clone())
        .collect();

    log::info!(
        "diffing {} function pair(s), {} removed, {} added",
        pairs.len(),
        removed_functions.len(),
        added_functions.len()
    );

    let mut functions: Vec<FunctionDiff> = pairs
        .into_par_iter()
        .map(|(before, after)| {
            let mapper = if config.fuzzy_matching {
                BodyMapper::new(before, after)
            } else {
                BodyMapper::new_without_fuzzy(before, after)
            };
            FunctionDiff::from_mapper(&mapper)
        })
        .collect();
    if config.skip_identical {
        functions.retain(|f| f.has_differences());
    }
    DiffReport {
        functions,
        removed_functions,
        added_functions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::path::PathBuf;

    #[test]
    fn pairs_functions_by_name() {
        let before = indoc! {"
            fn kept() { let a = 1; }
            fn dropped() { let b = 2; }
        "};
        let after = indoc! {"
            fn kept() { let a = 1; }
            fn fresh() { let c = 3; }
        "};
        let report = diff_sources(
            before,
            after,
            &PathBuf::from("before.rs"),
            &PathBuf::from("after.rs"),
            &DiffConfig::default(),
        )
        .unwrap();
        assert_eq!(report.functions.len(), 1);
        assert_eq!(report.functions[0].function, "kept");
        assert_eq!(report.removed_functions, vec!["dropped".to_string()]);
        assert_eq!(report.added_functions, vec!["fresh".to_string()]);
    }

    #[test]
    fn skip_identical_drops_clean_pairs() {
        let source = "fn same() { work(); }\n";
        let config = DiffConfig {
            skip_identical: true,
            ..DiffConfig::default()
        };
        let report = diff_sources(
            source,
            source,
            &PathBuf::from("a.rs"),
            &PathBuf::from("b.rs"),
            &config,
        )
        .unwrap();
        assert!(report.functions.is_empty());
    }
}
