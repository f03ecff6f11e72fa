//! Cost model used by the NFA decision.
//!
//! Reverse cost estimates how many hits the reverse index yields (roughly,
//! postings read). Forward cost estimates how expensive it is to match a clause
//! token by token through the forward index from one starting point. Both are
//! heuristics; only their ratios matter.

use super::ClauseNode;
use crate::error::Result;
use crate::index::IndexStats;

/// Forward cost of matching one token.
pub const TOKEN_FORWARD_COST: u64 = 200;

/// Stand-in for an unbounded maximum in cost formulas.
pub const UNBOUNDED_STEPS: u64 = 50;

/// Per-clause reverse-cost overhead of a sequence.
const SEQUENCE_OVERHEAD: f64 = 1.2;

fn max_or_default(max: Option<u32>) -> u64 {
    max.map_or(UNBOUNDED_STEPS, u64::from)
}

/// `min + (min + 1) + … + max`, saturating; 0 if `min > max`.
fn length_sum(min: u64, max: u64) -> u64 {
    if min > max {
        return 0;
    }
    let count = u128::from(max - min) + 1;
    let sum = count * (u128::from(min) + u128::from(max)) / 2;
    u64::try_from(sum).unwrap_or(u64::MAX)
}

impl ClauseNode {
    /// Estimated number of hits produced through the reverse index.
    ///
    /// # Errors
    ///
    /// Propagates statistics lookup failures, e.g. [`Error::UnknownField`](crate::Error::UnknownField).
    pub fn reverse_cost(&self, stats: &dyn IndexStats) -> Result<u64> {
        Ok(match self {
            Self::Token {
                field,
                value,
                sensitivity,
            } => stats.term_frequency(field, value, *sensitivity)?,
            Self::AnyToken { bounds } => {
                let steps = bounds.width().map_or(UNBOUNDED_STEPS, u64::from);
                stats.total_tokens()?.saturating_mul(steps)
            }
            Self::Not { clause } => stats
                .total_tokens()?
                .saturating_sub(clause.reverse_cost(stats)?),
            Self::Sequence { clauses } => {
                let mut cost = u64::from(u32::MAX >> 1);
                let mut factor = 1.0f64;
                for clause in clauses {
                    cost = cost.min(clause.reverse_cost(stats)?);
                    factor *= SEQUENCE_OVERHEAD;
                }
                // Float to int casts saturate.
                (cost as f64 * factor) as u64
            }
            Self::Or { clauses } => clauses.iter().try_fold(0u64, |acc, c| {
                Ok::<_, crate::Error>(acc.saturating_add(c.reverse_cost(stats)?))
            })?,
            Self::Repetition { clause, .. } => clause.reverse_cost(stats)?,
            Self::Expansion { clause, bounds, .. } => {
                let steps = bounds.width().map_or(UNBOUNDED_STEPS, u64::from);
                clause.reverse_cost(stats)?.saturating_mul(steps)
            }
            Self::PositionFilter { producer, .. } => producer.reverse_cost(stats)?,
            Self::ForwardIndexSequence { anchor, .. } => anchor.reverse_cost(stats)?,
            Self::DefaultValue => stats.total_tokens()?,
        })
    }

    /// Estimated cost of matching this clause through the forward index from a
    /// single starting position.
    #[must_use]
    pub fn forward_cost(&self) -> u64 {
        match self {
            Self::Token { .. } | Self::Not { .. } => TOKEN_FORWARD_COST,
            Self::AnyToken { bounds } => max_or_default(bounds.max),
            Self::Sequence { clauses } | Self::Or { clauses } => clauses
                .iter()
                .fold(0u64, |acc, c| acc.saturating_add(c.forward_cost())),
            Self::Repetition { clause, bounds } => clause
                .forward_cost()
                .saturating_mul(max_or_default(bounds.max)),
            Self::Expansion { clause, bounds, .. } => {
                let steps = length_sum(u64::from(bounds.min), max_or_default(bounds.max));
                clause.forward_cost().saturating_add(steps)
            }
            Self::PositionFilter { producer, .. } => producer.forward_cost(),
            Self::ForwardIndexSequence { anchor, nfa, .. } => {
                anchor.forward_cost().saturating_add(nfa.forward_cost())
            }
            Self::DefaultValue => 0,
        }
    }
}
