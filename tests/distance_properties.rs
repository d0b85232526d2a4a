use proptest::prelude::*;

use diffmap::distance::{
    edit_distance, edit_distance_bounded, longest_common_substrings, normalized_distance,
    normalized_distance_ignore_case,
};

proptest! {
    #[test]
    fn normalized_distance_is_bounded(s1 in ".{0,40}", s2 in ".{0,40}") {
        let d = normalized_distance(&s1, &s2);
        prop_assert!((0.0..=1.0).contains(&d));
    }

    #[test]
    fn identical_strings_have_zero_distance(s in ".{0,40}") {
        prop_assert_eq!(normalized_distance(&s, &s), 0.0);
        prop_assert_eq!(edit_distance(&s, &s), 0);
    }

    #[test]
    fn distance_is_symmetric(s1 in ".{0,30}", s2 in ".{0,30}") {
        prop_assert_eq!(edit_distance(&s1, &s2), edit_distance(&s2, &s1));
    }

    #[test]
    fn bounded_agrees_with_unbounded(s1 in ".{0,25}", s2 in ".{0,25}") {
        let exact = edit_distance(&s1, &s2);
        prop_assert_eq!(edit_distance_bounded(&s1, &s2, exact), Some(exact));
        if exact > 0 {
            prop_assert_eq!(edit_distance_bounded(&s1, &s2, exact - 1), None);
        }
    }

    #[test]
    fn case_insensitive_never_exceeds_case_sensitive_length_bound(s1 in "[a-zA-Z ]{0,30}", s2 in "[a-zA-Z ]{0,30}") {
        let d = normalized_distance_ignore_case(&s1, &s2);
        prop_assert!((0.0..=1.0).contains(&d));
    }

    #[test]
    fn common_substrings_are_substrings_of_both(s1 in "[a-c]{1,12}", s2 in "[a-c]{1,12}") {
        for sub in longest_common_substrings(&s1, &s2) {
            prop_assert!(s1.contains(&sub));
            prop_assert!(s2.contains(&sub));
        }
    }
}

#[test]
fn disjoint_strings_of_equal_length_have_distance_one() {
    assert_eq!(normalized_distance("aaaa", "bbbb"), 1.0);
}
