//! Tests for position streams.

use super::filter::FilterIndex;
use super::test_support::{doc0, pairs, start_sorted, triples};
use super::*;
use crate::index::{IndexSnapshot, MemoryIndex};
use crate::nfa::{ForwardIndexAccessor, Nfa};
use crate::query::{any_token, sequence, term, Bounds, Direction, FilterOp, MatchDirection};
use crate::span::{Guarantees, Position, NO_MORE_DOCS};
use crate::terms::MatchSensitivity;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn shard(texts: &[&str]) -> Arc<dyn IndexSnapshot> {
    Arc::new(MemoryIndex::from_texts(texts))
}

fn term_stream(index: &Arc<dyn IndexSnapshot>, value: &str) -> BoxedStream {
    let postings = index
        .postings("word", value, MatchSensitivity::Sensitive)
        .expect("postings");
    Box::new(TermStream::new(postings))
}

// ========================================================================
// Term and n-gram streams
// ========================================================================

#[test]
fn test_term_stream_walks_postings() {
    // Arrange
    let index = shard(&["a b a", "c", "a"]);

    // Act
    let mut stream = term_stream(&index, "a");

    // Assert
    assert_eq!(triples(&mut stream), vec![(0, 0, 1), (0, 2, 3), (2, 0, 1)]);
}

#[test]
fn test_advance_stays_on_current_document() {
    let index = shard(&["a", "b", "a", "a"]);
    let mut stream = term_stream(&index, "a");

    assert_eq!(stream.advance(1).unwrap(), 2);
    assert_eq!(stream.advance(2).unwrap(), 2);
    assert_eq!(stream.advance(1).unwrap(), 2);
    assert_eq!(stream.next_doc().unwrap(), 3);
    assert_eq!(stream.advance(9).unwrap(), NO_MORE_DOCS);
}

#[test]
fn test_ngrams_enumerate_windows() {
    // Arrange: the closing token is never covered
    let index = shard(&["a b c"]);

    // Act
    let mut stream = NGramsStream::new(index, 1, Some(2)).unwrap();

    // Assert
    assert_eq!(
        pairs(&mut stream),
        vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)]
    );
}

#[test]
fn test_ngrams_skip_short_documents() {
    let index = shard(&["a", "a b c", "a b"]);

    let mut stream = NGramsStream::new(index, 3, Some(3)).unwrap();

    assert_eq!(triples(&mut stream), vec![(1, 0, 3)]);
}

#[test]
fn test_ngrams_reject_inverted_bounds() {
    let index = shard(&["a"]);
    assert!(NGramsStream::new(index, 3, Some(2)).is_err());
}

// ========================================================================
// Expansion
// ========================================================================

#[test]
fn test_right_expansion_clips_at_document_end() {
    // Arrange
    let index = shard(&["a b c d e"]);
    let source = term_stream(&index, "d");

    // Act
    let mut stream = ExpansionStream::new(source, index, Direction::Right, 1, Some(3)).unwrap();

    // Assert
    assert_eq!(pairs(&mut stream), vec![(3, 5)]);
}

#[test]
fn test_left_expansion_clips_at_document_start() {
    let index = shard(&["a b c d e"]);
    let source = term_stream(&index, "c");

    let mut stream = ExpansionStream::new(source, index, Direction::Left, 1, Some(3)).unwrap();

    assert_eq!(pairs(&mut stream), vec![(0, 3), (1, 3)]);
}

#[test]
fn test_unbounded_expansion_reaches_document_end() {
    let index = shard(&["a b c d"]);
    let source = term_stream(&index, "b");

    let mut stream = ExpansionStream::new(source, index, Direction::Right, 0, None).unwrap();

    assert_eq!(pairs(&mut stream), vec![(1, 2), (1, 3), (1, 4)]);
}

#[test]
fn test_expansion_raw_size_and_deduplication() {
    // Arrange: two hits sharing an end, expanded left by 0 or 1 token
    let index = shard(&["a b c d"]);
    let end_sorted = Guarantees {
        end_sorted: true,
        unique: true,
        ..Guarantees::none(1, Some(2))
    };
    let source = || doc0(&[(1, 3), (2, 3)], end_sorted);

    // Act
    let mut raw =
        ExpansionStream::new(source(), Arc::clone(&index), Direction::Left, 0, Some(1)).unwrap();
    let raw_hits = pairs(&mut raw);
    let expansion = ExpansionStream::new(source(), index, Direction::Left, 0, Some(1)).unwrap();
    let mut cleaned = opt_sort_uniq(Box::new(expansion), true, true);

    // Assert: N × (max − min + 1) before, fewer after
    assert_eq!(raw_hits.len(), 2 * 2);
    assert_eq!(pairs(&mut cleaned), vec![(0, 3), (1, 3), (2, 3)]);
}

#[test]
fn test_expansion_guarantees() {
    let index = shard(&["a b"]);

    let fixed = ExpansionStream::new(term_stream(&index, "a"), Arc::clone(&index), Direction::Left, 2, Some(2))
        .unwrap()
        .guarantees();
    assert!(fixed.start_sorted && fixed.end_sorted && fixed.unique);
    assert_eq!((fixed.length_min, fixed.length_max), (3, Some(3)));

    // Single-token sources have unique ends, so left expansions stay end-sorted
    let variable = ExpansionStream::new(term_stream(&index, "a"), Arc::clone(&index), Direction::Left, 0, Some(2))
        .unwrap()
        .guarantees();
    assert!(!variable.start_sorted);
    assert!(variable.end_sorted && variable.unique);

    let right = ExpansionStream::new(term_stream(&index, "a"), index, Direction::Right, 0, None)
        .unwrap()
        .guarantees();
    assert!(right.start_sorted && !right.end_sorted && right.unique);
    assert_eq!(right.length_max, None);
}

// ========================================================================
// Sorting wrappers
// ========================================================================

#[test]
fn test_per_document_sorted_orders_by_start_or_end() {
    let hits = [(2, 3), (0, 4), (1, 2), (0, 4)];

    let mut by_start = PerDocumentSorted::by_start(doc0(&hits, Guarantees::none(1, Some(4))), true);
    assert_eq!(pairs(&mut by_start), vec![(0, 4), (1, 2), (2, 3)]);

    let mut by_end = PerDocumentSorted::by_end(doc0(&hits, Guarantees::none(1, Some(4))), false);
    assert_eq!(pairs(&mut by_end), vec![(1, 2), (2, 3), (0, 4), (0, 4)]);
}

#[test]
fn test_unique_drops_adjacent_duplicates() {
    let sorted = Guarantees {
        start_sorted: true,
        ..Guarantees::none(1, Some(2))
    };
    let mut stream = Unique::new(doc0(&[(0, 1), (0, 1), (0, 2), (3, 4), (3, 4)], sorted));

    assert_eq!(pairs(&mut stream), vec![(0, 1), (0, 2), (3, 4)]);
    assert!(stream.guarantees().unique);
}

#[test]
fn test_opt_sort_uniq_leaves_clean_streams_alone() {
    let stream = doc0(&[(0, 1)], Guarantees::SINGLE_TOKEN);
    let wrapped = opt_sort_uniq(stream, true, true);
    assert_eq!(wrapped.guarantees(), Guarantees::SINGLE_TOKEN);
}

// ========================================================================
// Repetition
// ========================================================================

#[test]
fn test_repetition_chains_abutting_hits() {
    // Arrange: B at 1..=4 of a 10-token document
    let index = shard(&["A B B B B x x x x x"]);
    let base = term_stream(&index, "B");

    // Act
    let mut stream = RepetitionStream::new(base, 2, Some(3)).unwrap();

    // Assert
    assert_eq!(
        pairs(&mut stream),
        vec![(1, 3), (1, 4), (2, 4), (2, 5), (3, 5)]
    );
}

#[test]
fn test_repetition_rejects_bad_inputs() {
    let unsorted = || doc0(&[(0, 1)], Guarantees::none(1, Some(1)));
    assert!(RepetitionStream::new(unsorted(), 1, Some(2)).is_err());

    let sorted = || doc0(&[(0, 1)], Guarantees::SINGLE_TOKEN);
    assert!(RepetitionStream::new(sorted(), 0, Some(2)).is_err());
    assert!(matches!(
        RepetitionStream::new(sorted(), 3, Some(2)),
        Err(crate::Error::InvalidBounds { min: 3, max: 2 })
    ));
}

fn brute_force_repetition(
    base: &[(Position, Position)],
    min: u32,
    max: Option<u32>,
) -> Vec<(Position, Position)> {
    fn walk(
        base: &[(Position, Position)],
        start: Position,
        at: Position,
        k: u32,
        min: u32,
        max: Option<u32>,
        out: &mut BTreeSet<(Position, Position)>,
    ) {
        if k >= min && k > 0 {
            out.insert((start, at));
        }
        if max.is_some_and(|m| k >= m) {
            return;
        }
        for &(s, e) in base {
            if s == at && e > s {
                walk(base, start, e, k + 1, min, max, out);
            }
        }
    }

    let mut out = BTreeSet::new();
    for &(s, _) in base {
        walk(base, s, s, 0, min, max, &mut out);
    }
    out.into_iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: repetition equals exhaustive chaining of base hits.
    #[test]
    fn prop_repetition_matches_brute_force(
        raw in proptest::collection::vec((0i32..10, 1i32..3), 0..12),
        min in 1u32..3,
        extra in proptest::option::of(0u32..3),
    ) {
        let base: BTreeSet<(Position, Position)> =
            raw.into_iter().map(|(s, len)| (s, s + len)).collect();
        let base: Vec<_> = base.into_iter().collect();
        let max = extra.map(|e| min + e);

        let expected = brute_force_repetition(&base, min, max);
        let mut stream = RepetitionStream::new(doc0(&base, start_sorted(1, Some(2))), min, max)
            .expect("repetition");

        prop_assert_eq!(pairs(&mut stream), expected);
    }
}

// ========================================================================
// Or, Not, position filters
// ========================================================================

#[test]
fn test_or_unions_and_dedupes() {
    // Arrange
    let index = shard(&["a b c", "c", "b a"]);
    let streams = vec![
        term_stream(&index, "a"),
        term_stream(&index, "b"),
        term_stream(&index, "a"),
    ];

    // Act
    let mut stream = OrStream::new(streams);

    // Assert
    assert_eq!(
        triples(&mut stream),
        vec![(0, 0, 1), (0, 1, 2), (2, 0, 1), (2, 1, 2)]
    );
}

#[test]
fn test_or_advance_skips_documents() {
    let index = shard(&["a", "b", "a", "b"]);
    let mut stream = OrStream::new(vec![term_stream(&index, "a"), term_stream(&index, "b")]);

    assert_eq!(stream.advance(2).unwrap(), 2);
    assert_eq!(stream.next_doc().unwrap(), 3);
    assert_eq!(stream.next_doc().unwrap(), NO_MORE_DOCS);
}

#[test]
fn test_empty_or_matches_nothing() {
    let mut stream = OrStream::new(Vec::new());
    assert_eq!(stream.next_doc().unwrap(), NO_MORE_DOCS);
}

#[test]
fn test_not_yields_every_other_token() {
    // Arrange
    let index = shard(&["a x b x", "c d", "x"]);
    let inner = term_stream(&index, "x");

    // Act
    let mut stream = NotStream::new(inner, index).unwrap();

    // Assert: doc 2 has no token besides x
    assert_eq!(
        triples(&mut stream),
        vec![(0, 0, 1), (0, 2, 3), (1, 0, 1), (1, 1, 2)]
    );
}

#[test]
fn test_not_requires_single_token_clause() {
    let index = shard(&["a b"]);
    let inner = doc0(&[(0, 2)], start_sorted(2, Some(2)));
    assert!(NotStream::new(inner, index).is_err());
}

#[test]
fn test_position_filter_ops() {
    let producer = || doc0(&[(0, 3), (1, 2), (3, 5)], start_sorted(1, Some(3)));
    let filter = || doc0(&[(1, 2)], Guarantees::SINGLE_TOKEN);
    let run = |op: FilterOp, invert: bool| {
        let mut stream = PositionFilterStream::new(producer(), filter(), op, invert, 0, 0);
        pairs(&mut stream)
    };

    assert_eq!(run(FilterOp::Containing, false), vec![(0, 3), (1, 2)]);
    assert_eq!(run(FilterOp::Containing, true), vec![(3, 5)]);
    assert_eq!(run(FilterOp::Within, false), vec![(1, 2)]);
    assert_eq!(run(FilterOp::StartsAt, false), vec![(1, 2)]);
    assert_eq!(run(FilterOp::Matches, true), vec![(0, 3), (3, 5)]);
}

#[test]
fn test_position_filter_adjusts_window_only_for_matching() {
    // Arrange: test the window one token left of each producer hit
    let producer = doc0(&[(1, 2), (2, 3), (4, 5)], Guarantees::SINGLE_TOKEN);
    let filter = doc0(&[(1, 2)], Guarantees::SINGLE_TOKEN);

    // Act
    let mut stream =
        PositionFilterStream::new(producer, filter, FilterOp::Containing, false, -1, -1);

    // Assert: the unadjusted hit is returned
    assert_eq!(pairs(&mut stream), vec![(2, 3)]);
}

#[test]
fn test_position_filter_without_filter_hits_in_document() {
    let producer = super::test_support::vec_stream(&[(0, 0, 1), (1, 0, 1)], Guarantees::SINGLE_TOKEN);
    let filter = super::test_support::vec_stream(&[(1, 0, 1)], Guarantees::SINGLE_TOKEN);

    let mut kept = PositionFilterStream::new(producer, filter, FilterOp::Matches, true, 0, 0);

    assert_eq!(triples(&mut kept), vec![(0, 0, 1)]);
}

const ALL_FILTER_OPS: [FilterOp; 7] = [
    FilterOp::Containing,
    FilterOp::Within,
    FilterOp::StartsAt,
    FilterOp::EndsAt,
    FilterOp::Matches,
    FilterOp::ContainingAtStart,
    FilterOp::ContainingAtEnd,
];

#[test]
fn test_filter_index_without_hits_relates_nothing() {
    let mut index = FilterIndex::default();
    index.load(&[]);

    for op in ALL_FILTER_OPS {
        assert!(!index.related(op, (0, 3)), "{op}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Property: the indexed lookup agrees with testing every filter hit.
    #[test]
    fn prop_filter_index_matches_linear_scan(
        raw in proptest::collection::vec((0i32..8, 0i32..4), 0..10),
        window in (0i32..8, 0i32..5),
    ) {
        let hits: Vec<(Position, Position)> = raw.iter().map(|&(s, len)| (s, s + len)).collect();
        let window = (window.0, window.0 + window.1);
        let mut index = FilterIndex::default();
        index.load(&hits);

        for op in ALL_FILTER_OPS {
            let expected = hits.iter().any(|&hit| op.accepts(window, hit));
            prop_assert_eq!(index.related(op, window), expected, "{}", op);
        }
    }
}

// ========================================================================
// Forward-index sequences
// ========================================================================

#[test]
fn test_forward_index_sequence_forward_and_backward() {
    // Arrange
    let index = shard(&["a b c a c"]);
    let accessor = ForwardIndexAccessor::new(Arc::clone(&index));
    let gap_then_c = sequence(vec![any_token(Bounds::OPTIONAL), term("word", "c")]);
    let a_then_gap = sequence(vec![term("word", "a"), any_token(Bounds::OPTIONAL)]);
    let forward = Nfa::compile(&gap_then_c, MatchDirection::Forward, &accessor).unwrap();
    let backward = Nfa::compile(&a_then_gap, MatchDirection::Backward, &accessor).unwrap();

    // Act
    let mut after_a = FiSeqStream::new(term_stream(&index, "a"), Arc::new(forward), Arc::clone(&index));
    let mut before_c = FiSeqStream::new(term_stream(&index, "c"), Arc::new(backward), Arc::clone(&index));

    // Assert
    assert_eq!(pairs(&mut after_a), vec![(0, 3), (3, 5)]);
    assert_eq!(pairs(&mut before_c), vec![(0, 3), (3, 5)]);
    let g = after_a.guarantees();
    assert_eq!((g.length_min, g.length_max), (2, Some(3)));
}
