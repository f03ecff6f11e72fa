use super::*;
use std::cmp::Ordering;

fn sample_terms() -> MemoryTerms {
    MemoryTerms::from_strings(["the", "The", "café", "cafe", "Café", "zebra", "apple"])
}

#[test]
fn test_fold_per_sensitivity() {
    assert_eq!(MatchSensitivity::Sensitive.fold("Café"), "Café");
    assert_eq!(MatchSensitivity::CaseInsensitive.fold("Café"), "café");
    assert_eq!(MatchSensitivity::DiacriticsInsensitive.fold("Café"), "Cafe");
    assert_eq!(MatchSensitivity::Insensitive.fold("Café"), "cafe");
}

#[test]
fn test_strip_diacritics_handles_decomposed_input() {
    // "e" followed by a combining acute accent
    assert_eq!(strip_diacritics("cafe\u{301}"), "cafe");
    assert_eq!(strip_diacritics("naïve"), "naive");
}

#[test]
fn test_index_of_and_get() {
    let terms = sample_terms();

    assert_eq!(terms.number_of_terms(), 7);
    assert_eq!(terms.index_of("The"), 1);
    assert_eq!(terms.index_of("missing"), NO_TERM);
    assert_eq!(terms.get(2), Some("café"));
    assert_eq!(terms.get(NO_TERM), None);
    assert_eq!(terms.get(99), None);
}

#[test]
fn test_ids_of_returns_all_folded_matches() {
    let terms = sample_terms();

    assert_eq!(terms.ids_of("the", MatchSensitivity::Sensitive), vec![0]);
    assert_eq!(terms.ids_of("THE", MatchSensitivity::CaseInsensitive), vec![0, 1]);
    assert_eq!(terms.ids_of("cafe", MatchSensitivity::DiacriticsInsensitive), vec![2, 3]);
    assert_eq!(terms.ids_of("CAFE", MatchSensitivity::Insensitive), vec![2, 3, 4]);
    assert!(terms.ids_of("nothing", MatchSensitivity::Insensitive).is_empty());
}

#[test]
fn test_sort_positions_share_rank_when_folded_equal() {
    let terms = sample_terms();

    let the = terms.id_to_sort_position(0, MatchSensitivity::Insensitive);
    let the_upper = terms.id_to_sort_position(1, MatchSensitivity::Insensitive);
    assert_eq!(the, the_upper);

    let sensitive_the = terms.id_to_sort_position(0, MatchSensitivity::Sensitive);
    let sensitive_upper = terms.id_to_sort_position(1, MatchSensitivity::Sensitive);
    assert_ne!(sensitive_the, sensitive_upper);
}

#[test]
fn test_sort_positions_follow_folded_order() {
    let terms = sample_terms();
    let view = TermsSensitivity::new(&terms, MatchSensitivity::Insensitive);

    // apple < cafe < the < zebra
    assert_eq!(view.compare(6, 2), Ordering::Less);
    assert_eq!(view.compare(2, 0), Ordering::Less);
    assert_eq!(view.compare(0, 5), Ordering::Less);
    assert!(view.equal(2, 4));
}

#[test]
fn test_no_term_sorts_first() {
    let terms = sample_terms();

    assert_eq!(
        terms.compare_sort_position(NO_TERM, 6, MatchSensitivity::Sensitive),
        Ordering::Less
    );
}

#[test]
fn test_terms_equal_under_sensitivity() {
    let terms = sample_terms();

    assert!(terms.terms_equal(&[0, 2], &[1, 4], MatchSensitivity::Insensitive));
    assert!(!terms.terms_equal(&[0, 2], &[1, 4], MatchSensitivity::Sensitive));
    assert!(!terms.terms_equal(&[0], &[0, 2], MatchSensitivity::Insensitive));
}

#[test]
fn test_builder_reuses_ids() {
    let mut builder = MemoryTermsBuilder::default();

    let a = builder.add("a");
    let b = builder.add("b");
    let a_again = builder.add("a");

    assert_eq!((a, b, a_again), (0, 1, 0));
    assert_eq!(builder.len(), 2);
    assert_eq!(builder.build().index_of("b"), 1);
}

#[test]
fn test_view_reports_sensitivity() {
    let terms = sample_terms();
    let view = TermsSensitivity::new(&terms, MatchSensitivity::CaseInsensitive);

    assert_eq!(view.sensitivity(), MatchSensitivity::CaseInsensitive);
    assert_eq!(view.ids_of("the"), vec![0, 1]);
    assert_eq!(view.sort_position(0), view.sort_position(1));
}
