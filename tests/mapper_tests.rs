use indoc::indoc;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

use diffmap::{BodyMapper, MappingKind, Operation, ReplacementKind};

fn operation(source: &str) -> Operation {
    let operations =
        diffmap::parse_operations(source, &PathBuf::from("test.rs")).expect("valid source");
    operations.into_iter().next().expect("one function")
}

fn mapper(before: &str, after: &str) -> BodyMapper {
    BodyMapper::new(operation(before), operation(after))
}

fn leaf_mappings(mapper: &BodyMapper) -> Vec<&diffmap::CodeMapping> {
    mapper
        .mappings()
        .iter()
        .filter(|m| matches!(m.kind, MappingKind::Leaf))
        .collect()
}

#[test]
fn identical_statement_maps_exactly_with_zero_replacements() {
    let before = indoc! {"
        fn update() {
            x = x + 1;
        }
    "};
    let after = indoc! {"
        fn update() {
            x = x + 1;
        }
    "};
    let mapper = mapper(before, after);
    let leaves = leaf_mappings(&mapper);
    assert_eq!(leaves.len(), 1);
    let mapping = leaves[0];
    assert_eq!(mapping.text1, "x = x + 1;\n");
    assert_eq!(mapping.text2, "x = x + 1;\n");
    assert!(mapping.replacements().is_empty());
    assert!(mapping.is_exact());
    assert_eq!(mapper.exact_matches(), 1);
}

#[test]
fn rename_maps_with_exactly_one_variable_name_replacement() {
    let before = indoc! {"
        fn build() {
            let a = foo();
        }
    "};
    let after = indoc! {"
        fn build() {
            let b = foo();
        }
    "};
    let mapper = mapper(before, after);
    let leaves = leaf_mappings(&mapper);
    assert_eq!(leaves.len(), 1);
    let replacements = leaves[0].replacements();
    assert_eq!(replacements.len(), 1);
    assert_eq!(replacements[0].before(), "a");
    assert_eq!(replacements[0].after(), "b");
    assert!(replacements[0]
        .kind()
        .same_kind(&ReplacementKind::VariableName));
}

#[test]
fn moved_statement_matches_across_depths() {
    let before = indoc! {"
        fn run() {
            x = x + 1;
        }
    "};
    let after = indoc! {"
        fn run() {
            for i in 0..n {
                x = x + 1;
            }
        }
    "};
    let mapper = mapper(before, after);
    let leaves = leaf_mappings(&mapper);
    let moved = leaves
        .iter()
        .find(|m| m.text1 == "x = x + 1;\n")
        .expect("moved statement is mapped");
    let depth1 = mapper.operation1().body.get(moved.fragment1).depth;
    let depth2 = mapper.operation2().body.get(moved.fragment2).depth;
    assert_ne!(depth1, depth2);
    assert!(moved.replacements().is_empty());
}

#[test]
fn unmatched_addition_lands_in_non_mapped_leaves_t2() {
    let before = indoc! {"
        fn run() {
            first();
            second();
        }
    "};
    let after = indoc! {"
        fn run() {
            first();
            second();
            completely_unrelated_logging_call(session, request_context);
        }
    "};
    let mapper = mapper(before, after);
    assert_eq!(mapper.non_mapped_leaves_t2().len(), 1);
    let added = mapper.non_mapped_leaves_t2()[0];
    assert_eq!(
        mapper.operation2().body.get(added).text,
        "completely_unrelated_logging_call(session, request_context);\n"
    );
    assert!(mapper
        .mappings()
        .iter()
        .all(|m| m.fragment2 != added));
    assert!(mapper.non_mapped_leaves_t1().is_empty());
}

#[test]
fn no_fragment_is_mapped_twice_and_partition_holds() {
    let before = indoc! {"
        fn work() {
            let total = 0;
            for item in items {
                total += weight(item);
            }
            if total > limit {
                trim(total);
            }
            store(total);
        }
    "};
    let after = indoc! {"
        fn work() {
            let total = 0;
            for item in items {
                total += weight(item);
                audit(item);
            }
            if total > limit {
                trim(total);
            }
            publish(total);
        }
    "};
    let mapper = mapper(before, after);

    let mut seen1 = std::collections::HashSet::new();
    let mut seen2 = std::collections::HashSet::new();
    for mapping in mapper.mappings() {
        assert!(seen1.insert(mapping.fragment1), "fragment1 mapped twice");
        assert!(seen2.insert(mapping.fragment2), "fragment2 mapped twice");
    }

    for leaf in mapper.operation1().body.leaves() {
        let mapped = seen1.contains(&leaf);
        let leftover = mapper.non_mapped_leaves_t1().contains(&leaf);
        assert!(
            mapped != leftover,
            "leaf must be mapped or leftover, exactly one"
        );
    }
    for leaf in mapper.operation2().body.leaves() {
        let mapped = seen2.contains(&leaf);
        let leftover = mapper.non_mapped_leaves_t2().contains(&leaf);
        assert!(mapped != leftover);
    }
    for inner in mapper.operation1().body.inner_nodes() {
        let mapped = seen1.contains(&inner);
        let leftover = mapper.non_mapped_inner_nodes_t1().contains(&inner);
        assert!(mapped != leftover);
    }
    for inner in mapper.operation2().body.inner_nodes() {
        let mapped = seen2.contains(&inner);
        let leftover = mapper.non_mapped_inner_nodes_t2().contains(&inner);
        assert!(mapped != leftover);
    }
}

#[test]
fn mapper_is_deterministic() {
    let before = indoc! {"
        fn tick() {
            let mut count = 0;
            if ready {
                count += step;
            } else {
                count -= step;
            }
            report(count);
        }
    "};
    let after = indoc! {"
        fn tick() {
            let mut total = 0;
            if ready {
                total += step;
            } else {
                total -= step;
            }
            report(total);
            flush();
        }
    "};
    let first = mapper(before, after);
    let second = mapper(before, after);

    let shape = |m: &BodyMapper| {
        let mappings: Vec<(usize, usize, Vec<(String, String)>)> = m
            .mappings()
            .iter()
            .map(|mapping| {
                (
                    mapping.fragment1.0,
                    mapping.fragment2.0,
                    mapping
                        .replacements()
                        .iter()
                        .map(|r| (r.before().to_string(), r.after().to_string()))
                        .collect(),
                )
            })
            .collect();
        let leftovers = (
            m.non_mapped_leaves_t1().to_vec(),
            m.non_mapped_leaves_t2().to_vec(),
            m.non_mapped_inner_nodes_t1().to_vec(),
            m.non_mapped_inner_nodes_t2().to_vec(),
        );
        (mappings, leftovers)
    };
    assert_eq!(shape(&first), shape(&second));
}

#[test]
fn keyword_statements_are_not_exact_matches() {
    let before = indoc! {"
        fn bail() {
            if failed {
                return;
            }
            proceed();
        }
    "};
    let after = indoc! {"
        fn bail() {
            if failed {
                return;
            }
            proceed();
        }
    "};
    let mapper = mapper(before, after);
    let return_mapping = leaf_mappings(&mapper)
        .into_iter()
        .find(|m| m.text1 == "return;\n")
        .expect("return statement is mapped");
    assert!(!return_mapping.is_exact());
    // proceed() still counts
    assert_eq!(mapper.exact_matches(), 1);
}

#[test]
fn composite_mapping_carries_child_matching_score() {
    let before = indoc! {"
        fn guard() {
            if x > 0 {
                y += 1;
            }
        }
    "};
    let after = indoc! {"
        fn guard() {
            if x > 0 {
                y += 1;
                z += 1;
            }
        }
    "};
    let mapper = mapper(before, after);
    let composite = mapper
        .mappings()
        .iter()
        .find(|m| m.text1 == "if x > 0")
        .expect("if composite is mapped");
    match composite.kind {
        MappingKind::Composite {
            child_matching_score,
        } => {
            assert!(child_matching_score > 0.0);
            assert!(child_matching_score <= 1.0);
        }
        MappingKind::Leaf => panic!("expected composite mapping"),
    }
}

#[test]
fn inverted_condition_still_maps_the_composite() {
    let before = indoc! {"
        fn check() {
            if done {
                stop();
            }
        }
    "};
    let after = indoc! {"
        fn check() {
            if !done {
                stop();
            }
        }
    "};
    let mapper = mapper(before, after);
    assert!(mapper
        .mappings()
        .iter()
        .any(|m| m.text1 == "if done" && m.text2 == "if !done"));
}

#[test]
fn operator_replacements_are_only_legal_inversions() {
    let before = indoc! {"
        fn compare() {
            flag = a < b;
            other = c && d;
        }
    "};
    let after = indoc! {"
        fn compare() {
            flag = a >= b;
            other = c || d;
        }
    "};
    let mapper = mapper(before, after);
    const LEGAL: &[(&str, &str)] = &[("==", "!="), ("!=", "=="), ("&&", "||"), ("||", "&&")];
    for replacement in mapper.replacements() {
        if replacement.kind().same_kind(&ReplacementKind::InfixOperator) {
            assert!(
                LEGAL
                    .iter()
                    .any(|(a, b)| replacement.before() == *a && replacement.after() == *b),
                "illegal operator replacement {} -> {}",
                replacement.before(),
                replacement.after()
            );
        }
    }
    // the && -> || pair is explainable, so it must be mapped with the
    // operator replacement attached
    assert!(mapper
        .replacements()
        .iter()
        .any(|r| r.before() == "&&" && r.after() == "||"));
}

#[test]
fn mut_modifier_difference_is_a_typed_replacement() {
    let before = indoc! {"
        fn init() {
            let mut buffer = Vec::new();
            fill(buffer);
        }
    "};
    let after = indoc! {"
        fn init() {
            let buffer = Vec::new();
            fill(buffer);
        }
    "};
    let mapper = mapper(before, after);
    assert!(mapper
        .replacements()
        .iter()
        .any(|r| r.kind().same_kind(&ReplacementKind::MutModifier)));
}

#[test]
fn declaration_vs_return_pairs_up() {
    let before = indoc! {"
        fn compute() {
            let result = total(parts);
        }
    "};
    let after = indoc! {"
        fn compute() {
            return total(parts);
        }
    "};
    let mapper = mapper(before, after);
    assert_eq!(leaf_mappings(&mapper).len(), 1);
    assert!(mapper.non_mapped_leaves_t1().is_empty());
    assert!(mapper.non_mapped_leaves_t2().is_empty());
}
