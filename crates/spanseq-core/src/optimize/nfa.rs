//! Forward-index NFA decision.
//!
//! Matching `L R` with the reverse index costs roughly the hits of both sides.
//! Alternatively the cheaper side can be found through the reverse index (the
//! anchor) and the other side matched token by token from each anchor hit
//! through the forward index. The combinability factor weighs the two:
//!
//! ```text
//! numL = max(1, reverse_cost(L))        numR = max(1, reverse_cost(R))
//! seq  = min(numL, numR) + (numL + numR) / term_freq_divider
//! fwd  = 1000 · numL · forward_cost(R) / seq    (anchor L, NFA R)
//! bwd  = 1000 · numR · forward_cost(L) / seq    (anchor R, NFA L)
//! ```
//!
//! A positive factor means "match forward", a negative one "match backward",
//! zero "impossible". Smaller magnitudes are better.

use super::{OptimizeContext, CANNOT_COMBINE};
use crate::error::{Error, Result};
use crate::query::{sequence, Clause, ClauseNode, MatchDirection};
use std::sync::Arc;
use tracing::trace;

/// Ratio scale.
const RATIO_SCALE: u128 = 1000;

/// Base priority of forward NFA combines.
const FORWARD_BASE: i64 = 10_000_000;

/// Base priority of backward NFA combines.
const BACKWARD_BASE: i64 = 10_000_001;

const PRIORITY_SPREAD: i64 = 10_000;

fn clamp(value: u128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX - 1).min(i64::MAX - 1)
}

/// Signed combinability factor of `left` followed by `right`.
///
/// # Errors
///
/// Propagates statistics lookup failures.
pub fn factor(left: &Clause, right: &Clause, ctx: &OptimizeContext<'_>) -> Result<i64> {
    let forward_possible = right.can_make_nfa() && !left.matches_empty();
    let backward_possible = left.can_make_nfa() && !right.matches_empty();
    if !forward_possible && !backward_possible {
        return Ok(0);
    }

    let num_left = u128::from(left.reverse_cost(ctx.stats())?.max(1));
    let num_right = u128::from(right.reverse_cost(ctx.stats())?.max(1));
    let divider = u128::from(ctx.config().term_freq_divider.max(1));
    let seq_reverse_cost = (num_left.min(num_right) + (num_left + num_right) / divider).max(1);

    let ratio_forward = clamp(
        RATIO_SCALE * num_left * u128::from(right.forward_cost()) / seq_reverse_cost,
    );
    let ratio_backward = clamp(
        RATIO_SCALE * num_right * u128::from(left.forward_cost()) / seq_reverse_cost,
    );

    Ok(match (forward_possible, backward_possible) {
        (true, true) if ratio_backward >= ratio_forward => ratio_forward + 1,
        (true, true) => -ratio_backward - 1,
        (true, false) => ratio_forward + 1,
        (false, true) => -ratio_backward - 1,
        (false, false) => 0,
    })
}

/// Clause matched through the NFA for a given factor.
fn nfa_side<'c>(left: &'c Clause, right: &'c Clause, factor: i64) -> &'c Clause {
    if factor > 0 {
        right
    } else {
        left
    }
}

/// Rating of the NFA rule.
///
/// # Errors
///
/// Propagates statistics lookup failures.
pub fn priority(left: &Clause, right: &Clause, ctx: &OptimizeContext<'_>) -> Result<i32> {
    let config = ctx.config();
    if !config.nfa_matching_enabled {
        return Ok(CANNOT_COMBINE);
    }
    let factor = factor(left, right, ctx)?;
    if factor == 0 || factor.unsigned_abs() > u64::from(config.nfa_threshold) {
        trace!(factor, %left, %right, "nfa rejected");
        return Ok(CANNOT_COMBINE);
    }
    if config.require_many_unique_terms {
        let stats = ctx.stats();
        let field = nfa_side(left, right, factor)
            .field()
            .unwrap_or_else(|| stats.main_field());
        let unique = stats.unique_terms(field)?;
        if unique < config.min_unique_terms {
            trace!(field, unique, "nfa rejected, too few unique terms");
            return Ok(CANNOT_COMBINE);
        }
    }
    let spread = PRIORITY_SPREAD / factor.abs();
    let priority = if factor > 0 {
        FORWARD_BASE - spread
    } else {
        BACKWARD_BASE - spread
    };
    Ok(i32::try_from(priority).unwrap_or(CANNOT_COMBINE - 1))
}

fn extend_nfa(nfa: &Clause, clause: &Clause, append: bool) -> Clause {
    let mut parts = match nfa.as_ref() {
        ClauseNode::Sequence { clauses } => clauses.clone(),
        _ => vec![Arc::clone(nfa)],
    };
    if append {
        parts.push(Arc::clone(clause));
    } else {
        parts.insert(0, Arc::clone(clause));
    }
    sequence(parts)
}

/// Builds the forward-index sequence for `left right`.
///
/// If the anchor already is a forward-index sequence in the same direction,
/// the new clause extends its NFA instead of nesting.
///
/// # Errors
///
/// Returns [`Error::Internal`] if NFA matching is impossible for the pair.
pub fn combine(left: &Clause, right: &Clause, ctx: &OptimizeContext<'_>) -> Result<Clause> {
    let factor = factor(left, right, ctx)?;
    let (anchor, nfa_clause, direction) = match factor {
        0 => {
            return Err(Error::Internal(format!(
                "nfa: cannot combine {left} and {right}"
            )))
        }
        f if f > 0 => (left, right, MatchDirection::Forward),
        _ => (right, left, MatchDirection::Backward),
    };
    let append = direction == MatchDirection::Forward;

    if let ClauseNode::ForwardIndexSequence {
        anchor: inner_anchor,
        nfa,
        direction: existing,
    } = anchor.as_ref()
    {
        if *existing == direction {
            return Ok(Arc::new(ClauseNode::ForwardIndexSequence {
                anchor: Arc::clone(inner_anchor),
                nfa: extend_nfa(nfa, nfa_clause, append),
                direction,
            }));
        }
    }
    Ok(Arc::new(ClauseNode::ForwardIndexSequence {
        anchor: Arc::clone(anchor),
        nfa: Arc::clone(nfa_clause),
        direction,
    }))
}
