//! Incremental mapper extension: extract-method and inline-method shapes

use indoc::indoc;
use std::collections::BTreeMap;
use std::path::PathBuf;

use diffmap::{BodyMapper, MappingKind, Operation};

fn operation(source: &str) -> Operation {
    let operations =
        diffmap::parse_operations(source, &PathBuf::from("test.rs")).expect("valid source");
    operations.into_iter().next().expect("one function")
}

#[test]
fn extracted_method_body_consumes_parent_leftovers() {
    let before = indoc! {"
        fn handle() {
            let data = load();
            let total = sum_of_weights(data);
            emit_summary_record(total);
        }
    "};
    let after = indoc! {"
        fn handle() {
            let data = load();
            process(data);
        }
    "};
    let extracted = indoc! {"
        fn process(data: Payload) {
            let total = sum_of_weights(data);
            emit_summary_record(total);
        }
    "};
    let parent = BodyMapper::new(operation(before), operation(after));
    assert_eq!(parent.non_mapped_leaves_t1().len(), 2);

    let extension = BodyMapper::from_parent_with_added(
        &parent,
        operation(extracted),
        BTreeMap::new(),
    );
    let leaf_mappings: Vec<_> = extension
        .mappings()
        .iter()
        .filter(|m| matches!(m.kind, MappingKind::Leaf))
        .collect();
    assert_eq!(leaf_mappings.len(), 2);
    assert!(extension.non_mapped_leaves_t1().is_empty());
    assert!(leaf_mappings.iter().all(|m| m.is_exact()));
}

#[test]
fn inlined_method_body_consumes_parent_leftovers() {
    let before = indoc! {"
        fn handle() {
            let data = load();
            finish(data);
        }
    "};
    let after = indoc! {"
        fn handle() {
            let data = load();
            let total = sum_of_weights(data);
            emit_summary_record(total);
        }
    "};
    let inlined = indoc! {"
        fn finish(data: Payload) {
            let total = sum_of_weights(data);
            emit_summary_record(total);
        }
    "};
    let parent = BodyMapper::new(operation(before), operation(after));
    assert_eq!(parent.non_mapped_leaves_t2().len(), 2);

    let extension = BodyMapper::from_parent_with_removed(
        &parent,
        operation(inlined),
        BTreeMap::new(),
    );
    let leaf_mappings: Vec<_> = extension
        .mappings()
        .iter()
        .filter(|m| matches!(m.kind, MappingKind::Leaf))
        .collect();
    assert_eq!(leaf_mappings.len(), 2);
    assert!(extension.non_mapped_leaves_t2().is_empty());
}

#[test]
fn parameter_to_argument_map_bridges_renamed_bindings() {
    let before = indoc! {"
        fn render() {
            paint_shape_outline(current_canvas, shape);
        }
    "};
    let extracted = indoc! {"
        fn draw(canvas: Canvas) {
            paint_shape_outline(canvas, shape);
        }
    "};
    let after = indoc! {"
        fn render() {
            render_component(current_canvas);
        }
    "};
    let parent = BodyMapper::new(operation(before), operation(after));
    assert_eq!(parent.non_mapped_leaves_t1().len(), 1);

    let mut parameter_to_argument = BTreeMap::new();
    parameter_to_argument.insert("canvas".to_string(), "current_canvas".to_string());
    let extension = BodyMapper::from_parent_with_added(
        &parent,
        operation(extracted),
        parameter_to_argument,
    );
    let leaf_mappings: Vec<_> = extension
        .mappings()
        .iter()
        .filter(|m| matches!(m.kind, MappingKind::Leaf))
        .collect();
    assert_eq!(leaf_mappings.len(), 1);
    // identical after substituting the formal parameter with the call
    // argument, so the mapping is exact with no replacements
    assert!(leaf_mappings[0].is_exact());
}
