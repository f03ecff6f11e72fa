//! Clause-combiner optimizer.
//!
//! Adjacent clauses of a flattened sequence are merged pairwise by a closed
//! set of rules ([`Combiner`]). Each round, every rule rates every adjacent
//! pair; the pair/rule with the lowest finite priority is combined and the
//! list is rescanned. The loop ends when every rating is [`CANNOT_COMBINE`].
//! Each combine replaces two clauses by one, so `n` clauses take at most
//! `n - 1` combines.
//!
//! | Rule | Priority |
//! |------|----------|
//! | [`Combiner::Repetition`] | 2 |
//! | [`Combiner::AnyExpansion`] | 3 |
//! | [`Combiner::Internalisation`] | 4 |
//! | [`Combiner::DefaultValue`] | 8 |
//! | [`Combiner::Not`] | 40 |
//! | [`Combiner::Nfa`] | ~10,000,000 (see [`nfa`]) |

pub mod nfa;
mod rules;

use crate::config::OptimizerConfig;
use crate::error::{Error, Result};
use crate::index::IndexStats;
use crate::query::{Clause, Rewriter};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Rating of a pair a rule does not apply to.
pub const CANNOT_COMBINE: i32 = i32::MAX;

/// Combining rules, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Combiner {
    /// `X X → X{2}` and friends.
    Repetition,
    /// Gaps next to clauses become expansions.
    AnyExpansion,
    /// Wrapping clauses absorb neighbours.
    Internalisation,
    /// Unrestricted gap placeholders merge with gaps.
    DefaultValue,
    /// `!t B` becomes a position filter over `B`.
    Not,
    /// Cheap reverse-index anchor plus forward-index NFA.
    Nfa,
}

impl Combiner {
    /// Every rule, in tie-break order.
    pub const ALL: [Self; 6] = [
        Self::Repetition,
        Self::AnyExpansion,
        Self::Internalisation,
        Self::DefaultValue,
        Self::Not,
        Self::Nfa,
    ];

    /// Rates combining `left` and `right`; lower is more urgent.
    ///
    /// # Errors
    ///
    /// Propagates statistics lookup failures of the NFA rule.
    pub fn priority(self, left: &Clause, right: &Clause, ctx: &OptimizeContext<'_>) -> Result<i32> {
        Ok(match self {
            Self::Repetition => rules::repetition_priority(left, right),
            Self::AnyExpansion => rules::any_expansion_priority(left, right),
            Self::Internalisation => rules::internalisation_priority(left, right),
            Self::DefaultValue => rules::default_value_priority(left, right),
            Self::Not => rules::not_priority(left, right),
            Self::Nfa => nfa::priority(left, right, ctx)?,
        })
    }

    /// Combines `left` and `right` into one clause.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the rule rejects the pair.
    pub fn combine(self, left: &Clause, right: &Clause, ctx: &OptimizeContext<'_>) -> Result<Clause> {
        if self.priority(left, right, ctx)? == CANNOT_COMBINE {
            return Err(Error::Internal(format!(
                "{self} cannot combine {left} and {right}"
            )));
        }
        match self {
            Self::Repetition => rules::repetition_combine(left, right),
            Self::AnyExpansion => rules::any_expansion_combine(left, right),
            Self::Internalisation => rules::internalisation_combine(left, right),
            Self::DefaultValue => rules::default_value_combine(left, right),
            Self::Not => rules::not_combine(left, right),
            Self::Nfa => nfa::combine(left, right, ctx),
        }
    }
}

impl fmt::Display for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Repetition => "repetition",
            Self::AnyExpansion => "any_expansion",
            Self::Internalisation => "internalisation",
            Self::DefaultValue => "default_value",
            Self::Not => "not",
            Self::Nfa => "nfa",
        };
        f.write_str(name)
    }
}

/// One applied combine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombineStep {
    /// Rule applied.
    pub rule: Combiner,
    /// Rating it won with.
    pub priority: i32,
    /// Left input.
    pub left: Clause,
    /// Right input.
    pub right: Clause,
    /// Replacement.
    pub result: Clause,
}

/// Inputs of the optimizer plus its combine log.
pub struct OptimizeContext<'a> {
    config: &'a OptimizerConfig,
    stats: &'a dyn IndexStats,
    steps: Vec<CombineStep>,
}

impl<'a> OptimizeContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(config: &'a OptimizerConfig, stats: &'a dyn IndexStats) -> Self {
        Self {
            config,
            stats,
            steps: Vec::new(),
        }
    }

    /// Optimizer settings.
    #[must_use]
    pub fn config(&self) -> &'a OptimizerConfig {
        self.config
    }

    /// Corpus statistics.
    #[must_use]
    pub fn stats(&self) -> &'a dyn IndexStats {
        self.stats
    }

    /// Combines applied so far.
    #[must_use]
    pub fn steps(&self) -> &[CombineStep] {
        &self.steps
    }

    /// Consumes the context, returning the combine log.
    #[must_use]
    pub fn into_steps(self) -> Vec<CombineStep> {
        self.steps
    }
}

/// Repeatedly combines the best-rated adjacent pair of `clauses` until no rule
/// applies. Returns the number of combines.
///
/// # Errors
///
/// Propagates rating and combine errors.
pub fn combine_adjacent_clauses(
    clauses: &mut Vec<Clause>,
    ctx: &mut OptimizeContext<'_>,
) -> Result<usize> {
    let mut combined = 0;
    while clauses.len() > 1 {
        let mut best: Option<(usize, Combiner, i32)> = None;
        for i in 0..clauses.len() - 1 {
            for rule in Combiner::ALL {
                let priority = rule.priority(&clauses[i], &clauses[i + 1], ctx)?;
                if priority != CANNOT_COMBINE && best.map_or(true, |(_, _, p)| priority < p) {
                    best = Some((i, rule, priority));
                }
            }
        }
        let Some((i, rule, priority)) = best else {
            break;
        };

        let right = clauses.remove(i + 1);
        let left = clauses[i].clone();
        let result = rule.combine(&left, &right, ctx)?;
        debug!(%rule, priority, %left, %right, %result, "combined clauses");
        clauses[i] = result.clone();
        ctx.steps.push(CombineStep {
            rule,
            priority,
            left,
            right,
            result,
        });
        combined += 1;
    }
    Ok(combined)
}

/// Optimized clause tree plus the combines that produced it.
#[derive(Debug, Clone)]
pub struct Optimized {
    /// Final tree, ready for execution.
    pub clause: Clause,
    /// Combine log, in application order.
    pub steps: Vec<CombineStep>,
}

/// Rewrites and optimizes `clause` against `stats`.
///
/// The result depends only on the clause, the configuration and the
/// statistics, so it can be computed once and executed on every shard. The
/// result never matches the empty sequence; see
/// [`Rewriter::rewrite_top_level`].
///
/// # Errors
///
/// Returns [`Error::InvalidClause`] for clauses that cannot be rewritten (empty
/// sequences) and propagates statistics failures.
pub fn optimize(
    clause: &Clause,
    config: &OptimizerConfig,
    stats: &dyn IndexStats,
) -> Result<Optimized> {
    let mut rewriter = Rewriter::new(config, stats);
    let clause = rewriter.rewrite_top_level(clause)?;
    Ok(Optimized {
        clause,
        steps: rewriter.into_steps(),
    })
}

#[cfg(test)]
mod tests;
