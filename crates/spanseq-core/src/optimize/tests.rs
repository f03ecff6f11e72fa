//! Tests for the clause combiner.

use super::*;
use crate::index::test_stats::FixedStats;
use crate::query::{
    any_token, default_value, expansion, not, position_filter, repetition, sequence, term, Bounds,
    ClauseNode, Direction, FilterOp, MatchDirection,
};
use proptest::prelude::*;
use std::sync::Arc;

fn word(value: &str) -> Clause {
    term("word", value)
}

fn small_stats() -> FixedStats {
    FixedStats::new(1_000, 10)
}

/// `a` is rare, `b` is common, the field has many unique terms.
fn skewed_stats() -> FixedStats {
    FixedStats::new(100_000, 50_000).with("a", 1).with("b", 100_000)
}

fn no_nfa_side() -> Clause {
    position_filter(word("p"), word("q"), FilterOp::Matches, false)
}

// ========================================================================
// Structural rules
// ========================================================================

#[test]
fn test_rule_priorities() {
    // Arrange
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let ctx = OptimizeContext::new(&config, &stats);
    let a = word("a");

    // Act & Assert
    let rate = |rule: Combiner, l: &Clause, r: &Clause| rule.priority(l, r, &ctx).unwrap();
    assert_eq!(rate(Combiner::Repetition, &a, &a), 2);
    assert_eq!(rate(Combiner::AnyExpansion, &a, &any_token(Bounds::ONE)), 3);
    assert_eq!(
        rate(
            Combiner::Internalisation,
            &expansion(a.clone(), Direction::Left, Bounds::ONE),
            &word("b")
        ),
        4
    );
    assert_eq!(rate(Combiner::DefaultValue, &default_value(), &any_token(Bounds::ONE)), 8);
    assert_eq!(rate(Combiner::Not, &not(word("x")), &a), 40);

    assert_eq!(rate(Combiner::Repetition, &a, &word("b")), CANNOT_COMBINE);
    assert_eq!(rate(Combiner::AnyExpansion, &a, &word("b")), CANNOT_COMBINE);
    assert_eq!(rate(Combiner::DefaultValue, &default_value(), &a), CANNOT_COMBINE);
    assert_eq!(
        rate(Combiner::Not, &not(word("x")), &repetition(a, Bounds::at_least(1))),
        CANNOT_COMBINE
    );
}

#[test]
fn test_repetition_rule_skips_gaps() {
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let ctx = OptimizeContext::new(&config, &stats);
    let gap = any_token(Bounds::ONE);

    assert_eq!(
        Combiner::Repetition.priority(&gap, &gap, &ctx).unwrap(),
        CANNOT_COMBINE
    );
}

#[test]
fn test_combine_rejected_pair_is_internal_error() {
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let ctx = OptimizeContext::new(&config, &stats);

    for rule in Combiner::ALL {
        assert!(
            matches!(
                rule.combine(&word("a"), &word("b"), &ctx),
                Err(Error::Internal(_))
            ),
            "{rule} accepted a b"
        );
    }
}

#[test]
fn test_repetition_combines_counts() {
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let ctx = OptimizeContext::new(&config, &stats);
    let a = word("a");

    let combined = Combiner::Repetition
        .combine(
            &repetition(a.clone(), Bounds::new(1, Some(2)).unwrap()),
            &repetition(a.clone(), Bounds::at_least(1)),
            &ctx,
        )
        .unwrap();

    assert_eq!(combined, repetition(a, Bounds::at_least(2)));
}

#[test]
fn test_any_expansion_combines() {
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let ctx = OptimizeContext::new(&config, &stats);
    let gap = any_token(Bounds::new(1, Some(2)).unwrap());

    assert_eq!(
        Combiner::AnyExpansion.combine(&gap, &word("a"), &ctx).unwrap(),
        expansion(word("a"), Direction::Left, Bounds::new(1, Some(2)).unwrap())
    );
    assert_eq!(
        Combiner::AnyExpansion.combine(&gap, &any_token(Bounds::ONE), &ctx).unwrap(),
        any_token(Bounds::new(2, Some(3)).unwrap())
    );
    // Gaps never expand clauses that can be empty
    assert_eq!(
        Combiner::AnyExpansion
            .priority(&gap, &repetition(word("a"), Bounds::OPTIONAL), &ctx)
            .unwrap(),
        CANNOT_COMBINE
    );
}

#[test]
fn test_internalisation_combines() {
    // Arrange
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let ctx = OptimizeContext::new(&config, &stats);
    let grow_left = expansion(word("a"), Direction::Left, Bounds::ONE);
    let grow_right = expansion(word("a"), Direction::Right, Bounds::ONE);
    let filter = position_filter(any_token(Bounds::exactly(2)), word("x"), FilterOp::Containing, true);

    // Act & Assert: the plain side joins the expanded clause
    assert_eq!(
        Combiner::Internalisation.combine(&grow_left, &word("b"), &ctx).unwrap(),
        expansion(sequence(vec![word("a"), word("b")]), Direction::Left, Bounds::ONE)
    );
    // A gap on the expanding side widens the expansion
    assert_eq!(
        Combiner::Internalisation
            .combine(&grow_right, &any_token(Bounds::exactly(2)), &ctx)
            .unwrap(),
        expansion(word("a"), Direction::Right, Bounds::exactly(3))
    );
    assert_eq!(
        Combiner::Internalisation.priority(&grow_right, &word("b"), &ctx).unwrap(),
        CANNOT_COMBINE
    );
    // Filters absorb constant-length neighbours and narrow their window
    assert_eq!(
        Combiner::Internalisation.combine(&filter, &word("b"), &ctx).unwrap(),
        Arc::new(ClauseNode::PositionFilter {
            producer: sequence(vec![any_token(Bounds::exactly(2)), word("b")]),
            filter: word("x"),
            op: FilterOp::Containing,
            invert: true,
            left_adjust: 0,
            right_adjust: -1,
        })
    );
}

#[test]
fn test_default_value_combines() {
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let ctx = OptimizeContext::new(&config, &stats);

    assert_eq!(
        Combiner::DefaultValue
            .combine(&default_value(), &default_value(), &ctx)
            .unwrap(),
        default_value()
    );
    assert_eq!(
        Combiner::DefaultValue
            .combine(&any_token(Bounds::new(2, Some(3)).unwrap()), &default_value(), &ctx)
            .unwrap(),
        any_token(Bounds::at_least(2))
    );
}

#[test]
fn test_not_combines_into_inverted_filter() {
    // Arrange
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let ctx = OptimizeContext::new(&config, &stats);
    let kept = sequence(vec![word("a"), word("b")]);
    let excluded = not(word("x"));

    // Act
    let not_first = Combiner::Not.combine(&excluded, &kept, &ctx).unwrap();
    let not_last = Combiner::Not.combine(&kept, &excluded, &ctx).unwrap();

    // Assert
    assert_eq!(
        not_first,
        Arc::new(ClauseNode::PositionFilter {
            producer: expansion(kept.clone(), Direction::Left, Bounds::ONE),
            filter: word("x"),
            op: FilterOp::Containing,
            invert: true,
            left_adjust: 0,
            right_adjust: -2,
        })
    );
    assert_eq!(
        not_last,
        Arc::new(ClauseNode::PositionFilter {
            producer: expansion(kept, Direction::Right, Bounds::ONE),
            filter: word("x"),
            op: FilterOp::Containing,
            invert: true,
            left_adjust: 2,
            right_adjust: 0,
        })
    );
}

// ========================================================================
// Combine loop
// ========================================================================

#[test]
fn test_combine_loop_merges_runs() {
    // Arrange
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let mut ctx = OptimizeContext::new(&config, &stats);
    let mut clauses = vec![word("a"); 4];

    // Act
    let combined = combine_adjacent_clauses(&mut clauses, &mut ctx).unwrap();

    // Assert
    assert_eq!(combined, 3);
    assert_eq!(clauses, vec![repetition(word("a"), Bounds::exactly(4))]);
    assert_eq!(ctx.steps().len(), 3);
}

#[test]
fn test_combine_loop_prefers_lower_priority() {
    // Arrange: `a a` (2) beats `a []` (3)
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let mut ctx = OptimizeContext::new(&config, &stats);
    let mut clauses = vec![word("a"), word("a"), any_token(Bounds::ONE)];

    // Act
    combine_adjacent_clauses(&mut clauses, &mut ctx).unwrap();

    // Assert
    let rules: Vec<Combiner> = ctx.steps().iter().map(|s| s.rule).collect();
    assert_eq!(rules, vec![Combiner::Repetition, Combiner::AnyExpansion]);
    assert_eq!(
        clauses,
        vec![expansion(
            repetition(word("a"), Bounds::exactly(2)),
            Direction::Right,
            Bounds::ONE
        )]
    );
}

#[test]
fn test_combine_loop_breaks_ties_leftmost() {
    // Arrange: both `a []` and `[] b` rate 3
    let config = OptimizerConfig::default();
    let stats = small_stats();
    let mut ctx = OptimizeContext::new(&config, &stats);
    let mut clauses = vec![word("a"), any_token(Bounds::ONE), word("b")];

    // Act
    let combined = combine_adjacent_clauses(&mut clauses, &mut ctx).unwrap();

    // Assert
    assert_eq!(combined, 1);
    assert_eq!(ctx.steps()[0].left, word("a"));
    assert_eq!(
        clauses,
        vec![
            expansion(word("a"), Direction::Right, Bounds::ONE),
            word("b")
        ]
    );
}

// ========================================================================
// NFA rule
// ========================================================================

#[test]
fn test_nfa_factor_sign_follows_feasibility() {
    let config = OptimizerConfig::default();
    let stats = skewed_stats();
    let ctx = OptimizeContext::new(&config, &stats);

    // Neither side can be an NFA
    assert_eq!(nfa::factor(&no_nfa_side(), &no_nfa_side(), &ctx).unwrap(), 0);
    // Only the right side can: forward
    assert!(nfa::factor(&no_nfa_side(), &word("b"), &ctx).unwrap() > 0);
    // Only the left side can: backward
    assert!(nfa::factor(&word("b"), &no_nfa_side(), &ctx).unwrap() < 0);
    // Empty-matching clauses never anchor
    let optional = any_token(Bounds::OPTIONAL);
    assert_eq!(nfa::factor(&optional, &optional, &ctx).unwrap(), 0);
}

#[test]
fn test_nfa_factor_anchors_the_rare_side() {
    // Arrange: seq = 1 + 100_001 / 500 = 201
    let config = OptimizerConfig::default();
    let stats = skewed_stats();
    let ctx = OptimizeContext::new(&config, &stats);

    // Act
    let forward = nfa::factor(&word("a"), &word("b"), &ctx).unwrap();
    let backward = nfa::factor(&word("b"), &word("a"), &ctx).unwrap();

    // Assert: 1000 · 1 · 200 / 201 = 995
    assert_eq!(forward, 996);
    assert_eq!(backward, -996);
}

#[test]
fn test_nfa_priority_threshold_and_gates() {
    // Arrange: a [] has factor 1000 · 1 · 1 / 201 + 1 = 5
    let stats = skewed_stats();
    let gap = any_token(Bounds::ONE);
    let rate = |config: &OptimizerConfig, stats: &FixedStats, l: &Clause, r: &Clause| {
        let ctx = OptimizeContext::new(config, stats);
        Combiner::Nfa.priority(l, r, &ctx).unwrap()
    };

    // Act & Assert
    let config = OptimizerConfig::default();
    assert_eq!(rate(&config, &stats, &word("a"), &gap), 10_000_000 - 2_000);
    assert_eq!(rate(&config, &stats, &gap, &word("a")), 10_000_001 - 2_000);

    // Too expensive for the default threshold
    assert_eq!(rate(&config, &stats, &word("a"), &word("b")), CANNOT_COMBINE);
    let relaxed = OptimizerConfig::default().with_nfa_threshold(1_000);
    assert_eq!(
        rate(&relaxed, &stats, &word("a"), &word("b")),
        10_000_000 - 10_000 / 996
    );

    // Disabled outright
    let disabled = OptimizerConfig::default().without_nfa();
    assert_eq!(rate(&disabled, &stats, &word("a"), &gap), CANNOT_COMBINE);

    // Too few unique terms, unless the gate is off
    let few_terms = FixedStats::new(100_000, 10).with("a", 1);
    assert_eq!(rate(&config, &few_terms, &word("a"), &gap), CANNOT_COMBINE);
    let ungated = OptimizerConfig::default().with_unique_terms_gate(false);
    assert_eq!(rate(&ungated, &few_terms, &word("a"), &gap), 10_000_000 - 2_000);
}

#[test]
fn test_nfa_combine_builds_and_extends_forward_sequences() {
    // Arrange
    let config = OptimizerConfig::default();
    let stats = skewed_stats();
    let ctx = OptimizeContext::new(&config, &stats);
    let gap = any_token(Bounds::ONE);

    // Act
    let first = Combiner::Nfa.combine(&word("a"), &gap, &ctx).unwrap();
    let extended = nfa::combine(&first, &word("c"), &ctx).unwrap();

    // Assert
    assert_eq!(
        first,
        Arc::new(ClauseNode::ForwardIndexSequence {
            anchor: word("a"),
            nfa: gap.clone(),
            direction: MatchDirection::Forward,
        })
    );
    assert_eq!(
        extended,
        Arc::new(ClauseNode::ForwardIndexSequence {
            anchor: word("a"),
            nfa: sequence(vec![gap, word("c")]),
            direction: MatchDirection::Forward,
        })
    );
}

#[test]
fn test_nfa_combine_backward() {
    let config = OptimizerConfig::default();
    let stats = skewed_stats();
    let ctx = OptimizeContext::new(&config, &stats);

    assert_eq!(
        nfa::combine(&word("b"), &word("a"), &ctx).unwrap(),
        Arc::new(ClauseNode::ForwardIndexSequence {
            anchor: word("a"),
            nfa: word("b"),
            direction: MatchDirection::Backward,
        })
    );
    assert!(matches!(
        nfa::combine(&no_nfa_side(), &no_nfa_side(), &ctx),
        Err(Error::Internal(_))
    ));
}

#[test]
fn test_optimize_reports_steps() {
    // Arrange
    let config = OptimizerConfig::default().with_nfa_threshold(1_000);
    let stats = skewed_stats();

    // Act
    let optimized = optimize(&sequence(vec![word("a"), word("b")]), &config, &stats).unwrap();

    // Assert
    assert_eq!(optimized.steps.len(), 1);
    assert_eq!(optimized.steps[0].rule, Combiner::Nfa);
    assert!(matches!(
        optimized.clause.as_ref(),
        ClauseNode::ForwardIndexSequence {
            direction: MatchDirection::Forward,
            ..
        }
    ));
}

#[test]
fn test_optimize_rates_very_wide_gaps() {
    // Arrange: every pair is rated, including the NFA rule
    let config = OptimizerConfig::default().with_unique_terms_gate(false);
    let stats = small_stats();
    let gap = any_token(Bounds::new(0, Some(400_000_000)).unwrap());

    // Act
    let optimized = optimize(&sequence(vec![word("a"), gap, word("b")]), &config, &stats).unwrap();

    // Assert
    assert_eq!(optimized.steps[0].rule, Combiner::AnyExpansion);
}

#[test]
fn test_optimize_propagates_unknown_field() {
    let config = OptimizerConfig::default();
    let stats = small_stats();

    let result = optimize(
        &sequence(vec![term("lemma", "x"), word("a")]),
        &config,
        &stats,
    );

    assert!(matches!(result, Err(Error::UnknownField(_))));
}

// ========================================================================
// Property-based tests
// ========================================================================

fn part_strategy() -> impl Strategy<Value = Clause> {
    prop::sample::select(vec![
        word("a"),
        word("b"),
        any_token(Bounds::ONE),
        any_token(Bounds::ANY),
        default_value(),
        not(word("x")),
        repetition(word("a"), Bounds::OPTIONAL),
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: `n` clauses take at most `n - 1` combines, one per step.
    #[test]
    fn prop_combine_count_is_bounded(parts in proptest::collection::vec(part_strategy(), 1..8)) {
        let config = OptimizerConfig::default();
        let stats = small_stats();
        let mut ctx = OptimizeContext::new(&config, &stats);
        let n = parts.len();
        let mut clauses = parts;

        let combined = combine_adjacent_clauses(&mut clauses, &mut ctx).unwrap();

        prop_assert!(combined < n);
        prop_assert_eq!(clauses.len() + combined, n);
        prop_assert_eq!(ctx.steps().len(), combined);
    }
}
