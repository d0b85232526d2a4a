//! File-level driver behavior: config loading and whole-file diffing

use indoc::indoc;
use std::fs;
use std::io::Write;

use diffmap::config::DiffConfig;

#[test]
fn config_loads_from_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "fuzzy_matching = false").unwrap();
    writeln!(file, "skip_identical = true").unwrap();
    writeln!(file, "function_filter = \"resolve\"").unwrap();
    let config = DiffConfig::load(file.path()).unwrap();
    assert!(!config.fuzzy_matching);
    assert!(config.skip_identical);
    assert_eq!(config.function_filter.as_deref(), Some("resolve"));
}

#[test]
fn config_load_rejects_malformed_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "fuzzy_matching = maybe").unwrap();
    assert!(DiffConfig::load(file.path()).is_err());
}

#[test]
fn diffs_source_files_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let before_path = dir.path().join("before.rs");
    let after_path = dir.path().join("after.rs");
    fs::write(
        &before_path,
        indoc! {"
            fn resolve(input: Request) {
                let parsed = parse(input);
                dispatch(parsed);
            }
        "},
    )
    .unwrap();
    fs::write(
        &after_path,
        indoc! {"
            fn resolve(input: Request) {
                let decoded = parse(input);
                dispatch(decoded);
            }
        "},
    )
    .unwrap();

    let before_source = fs::read_to_string(&before_path).unwrap();
    let after_source = fs::read_to_string(&after_path).unwrap();
    let report = diffmap::diff_sources(
        &before_source,
        &after_source,
        &before_path,
        &after_path,
        &DiffConfig::default(),
    )
    .unwrap();

    assert_eq!(report.functions.len(), 1);
    let function = &report.functions[0];
    assert_eq!(function.function, "resolve");
    assert!(function.added_statements.is_empty());
    assert!(function.deleted_statements.is_empty());
    // both statements map, each explained by the parsed -> decoded rename
    let renames: Vec<_> = function
        .mappings
        .iter()
        .flat_map(|m| m.replacements.iter())
        .filter(|r| r.before == "parsed" && r.after == "decoded")
        .collect();
    assert!(!renames.is_empty());
}

#[test]
fn json_report_serializes() {
    let report = diffmap::diff_sources(
        "fn go() { step(); }\n",
        "fn go() { step(); leap(); }\n",
        std::path::Path::new("a.rs"),
        std::path::Path::new("b.rs"),
        &DiffConfig::default(),
    )
    .unwrap();
    let mut buffer = Vec::new();
    diffmap::output::write_json(&report, &mut buffer).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(parsed["functions"][0]["function"], "go");
    assert_eq!(parsed["functions"][0]["added_statements"][0], "leap();");
}
