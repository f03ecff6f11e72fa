//! Pure clause rewriting, iterated to a fixed point.
//!
//! One pass rewrites children first, then applies the local rules of the
//! parent. Sequences are flattened, run through the clause combiner, and split
//! into alternatives when some of their parts can match the empty sequence, so
//! no join ever has to deal with empty hits.

use super::{
    any_token, non_empty_alternatives, or, sequence, Bounds, Clause, ClauseNode, Direction,
    FilterOp,
};
use crate::config::OptimizerConfig;
use crate::error::{Error, Result};
use crate::index::IndexStats;
use crate::optimize::{combine_adjacent_clauses, CombineStep, OptimizeContext};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rewrites clause trees, collecting the optimizer's combine log.
pub struct Rewriter<'a> {
    context: OptimizeContext<'a>,
}

impl<'a> Rewriter<'a> {
    /// Creates a rewriter using `stats` for the cost model.
    #[must_use]
    pub fn new(config: &'a OptimizerConfig, stats: &'a dyn IndexStats) -> Self {
        Self {
            context: OptimizeContext::new(config, stats),
        }
    }

    /// Rewrites `clause` until nothing changes or the pass cap is reached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClause`] for empty sequences and propagates
    /// statistics and combiner errors.
    pub fn rewrite(&mut self, clause: &Clause) -> Result<Clause> {
        let max_passes = self.context.config().max_rewrite_passes;
        let mut current = Arc::clone(clause);
        for pass in 1..=max_passes {
            let next = self.rewrite_once(&current)?;
            if next == current {
                debug!(passes = pass, "rewrite reached a fixed point");
                return Ok(next);
            }
            current = next;
        }
        warn!(
            max_passes,
            clause = %current,
            "rewrite did not reach a fixed point, using last result"
        );
        Ok(current)
    }

    /// Rewrites a pattern that is executed on its own.
    ///
    /// Zero-length hits are never reported, so a tree that can match the
    /// empty sequence is replaced by its non-empty version and rewritten
    /// again. The result never matches the empty sequence.
    ///
    /// # Errors
    ///
    /// See [`rewrite`](Self::rewrite).
    pub fn rewrite_top_level(&mut self, clause: &Clause) -> Result<Clause> {
        let rewritten = self.rewrite(clause)?;
        if !rewritten.matches_empty() {
            return Ok(rewritten);
        }
        debug!(clause = %rewritten, "dropping empty matches of top-level clause");
        self.rewrite(&rewritten.no_empty())
    }

    /// Combines applied so far, in order.
    #[must_use]
    pub fn steps(&self) -> &[CombineStep] {
        self.context.steps()
    }

    /// Consumes the rewriter, returning its combine log.
    #[must_use]
    pub fn into_steps(self) -> Vec<CombineStep> {
        self.context.into_steps()
    }

    fn rewrite_once(&mut self, clause: &Clause) -> Result<Clause> {
        Ok(match clause.as_ref() {
            ClauseNode::Token { .. } | ClauseNode::AnyToken { .. } => Arc::clone(clause),
            ClauseNode::DefaultValue => any_token(Bounds::ANY),
            ClauseNode::Not { clause: inner } => {
                Arc::new(ClauseNode::Not {
                    clause: self.rewrite_once(inner)?,
                })
            }
            ClauseNode::Repetition { clause: base, bounds } => {
                let base = self.rewrite_once(base)?;
                rewrite_repetition(base, *bounds)
            }
            ClauseNode::Expansion {
                clause: base,
                direction,
                bounds,
            } => {
                let base = self.rewrite_once(base)?;
                rewrite_expansion(base, *direction, *bounds)
            }
            ClauseNode::PositionFilter {
                producer,
                filter,
                op,
                invert,
                left_adjust,
                right_adjust,
            } => Arc::new(ClauseNode::PositionFilter {
                producer: self.rewrite_once(producer)?,
                // Empty filter hits are ignored.
                filter: self.rewrite_once(filter)?.no_empty(),
                op: *op,
                invert: *invert,
                left_adjust: *left_adjust,
                right_adjust: *right_adjust,
            }),
            ClauseNode::Or { clauses } => {
                let mut flat: Vec<Clause> = Vec::with_capacity(clauses.len());
                for child in clauses {
                    let child = self.rewrite_once(child)?;
                    match child.as_ref() {
                        ClauseNode::Or { clauses: nested } => {
                            for c in nested {
                                push_distinct(&mut flat, Arc::clone(c));
                            }
                        }
                        _ => push_distinct(&mut flat, child),
                    }
                }
                if flat.len() == 1 {
                    flat.remove(0)
                } else {
                    or(flat)
                }
            }
            ClauseNode::ForwardIndexSequence {
                anchor,
                nfa,
                direction,
            } => Arc::new(ClauseNode::ForwardIndexSequence {
                anchor: self.rewrite_once(anchor)?,
                // Left alone: combining its parts could put reverse-index
                // clauses inside the NFA.
                nfa: Arc::clone(nfa),
                direction: *direction,
            }),
            ClauseNode::Sequence { clauses } => self.rewrite_sequence(clauses)?,
        })
    }

    fn rewrite_sequence(&mut self, clauses: &[Clause]) -> Result<Clause> {
        let mut parts = Vec::with_capacity(clauses.len());
        flatten_into(clauses, &mut parts);

        let mut rewritten = Vec::with_capacity(parts.len());
        for part in parts {
            // Gaps stay placeholders until the combiner has seen them.
            if matches!(part.as_ref(), ClauseNode::DefaultValue) {
                rewritten.push(part);
            } else {
                rewritten.push(self.rewrite_once(&part)?);
            }
        }
        let mut parts = Vec::with_capacity(rewritten.len());
        flatten_into(&rewritten, &mut parts);

        combine_adjacent_clauses(&mut parts, &mut self.context)?;

        if parts.iter().any(|c| c.matches_empty()) {
            let whole_matches_empty = parts.iter().all(|c| c.matches_empty());
            let mut alternatives: Vec<Clause> = non_empty_alternatives(&parts)
                .into_iter()
                .map(|mut alt| {
                    if alt.len() == 1 {
                        alt.remove(0)
                    } else {
                        sequence(alt)
                    }
                })
                .collect();
            if whole_matches_empty {
                alternatives.push(any_token(Bounds::exactly(0)));
            }
            return Ok(if alternatives.len() == 1 {
                alternatives.remove(0)
            } else {
                or(alternatives)
            });
        }

        match parts.len() {
            0 => Err(Error::InvalidClause("empty sequence".to_string())),
            1 => Ok(parts.remove(0)),
            _ => Ok(sequence(parts)),
        }
    }
}

fn flatten_into(clauses: &[Clause], out: &mut Vec<Clause>) {
    for clause in clauses {
        match clause.as_ref() {
            ClauseNode::Sequence { clauses: nested } => flatten_into(nested, out),
            _ => out.push(Arc::clone(clause)),
        }
    }
}

fn push_distinct(list: &mut Vec<Clause>, clause: Clause) {
    if !list.contains(&clause) {
        list.push(clause);
    }
}

fn rewrite_repetition(base: Clause, bounds: Bounds) -> Clause {
    if bounds == Bounds::ONE {
        return base;
    }
    match base.as_ref() {
        ClauseNode::AnyToken { bounds: inner } if *inner == Bounds::ONE => any_token(bounds),
        ClauseNode::AnyToken { bounds: inner } if inner.is_fixed() && bounds.is_fixed() => {
            any_token(inner.mul(bounds))
        }
        ClauseNode::Repetition {
            clause: inner,
            bounds: inner_bounds,
        } => {
            let zero_or_one = |b: &Bounds| *b == Bounds::OPTIONAL;
            let star_or_plus = |b: &Bounds| b.max.is_none() && b.min <= 1;
            if zero_or_one(inner_bounds) && zero_or_one(&bounds) {
                Arc::clone(&base)
            } else if star_or_plus(inner_bounds) && star_or_plus(&bounds) {
                Arc::new(ClauseNode::Repetition {
                    clause: Arc::clone(inner),
                    bounds: Bounds::at_least(inner_bounds.min * bounds.min),
                })
            } else if inner_bounds.is_fixed() && bounds.is_fixed() {
                Arc::new(ClauseNode::Repetition {
                    clause: Arc::clone(inner),
                    bounds: inner_bounds.mul(bounds),
                })
            } else {
                Arc::new(ClauseNode::Repetition {
                    clause: Arc::clone(&base),
                    bounds,
                })
            }
        }
        ClauseNode::Not { clause: excluded } if bounds.min > 0 => {
            Arc::new(ClauseNode::PositionFilter {
                producer: any_token(bounds),
                filter: Arc::clone(excluded),
                op: FilterOp::Containing,
                invert: true,
                left_adjust: 0,
                right_adjust: 0,
            })
        }
        _ => Arc::new(ClauseNode::Repetition { clause: base, bounds }),
    }
}

fn rewrite_expansion(base: Clause, direction: Direction, bounds: Bounds) -> Clause {
    if bounds == Bounds::exactly(0) {
        return base;
    }
    if let ClauseNode::AnyToken { bounds: inner } = base.as_ref() {
        return any_token(inner.add(bounds));
    }
    if base.matches_empty() {
        // The empty matches of `base` expand to plain gaps.
        let gap = any_token(bounds);
        let rest = base.no_empty();
        if matches!(rest.as_ref(), ClauseNode::Or { clauses } if clauses.is_empty()) {
            return gap;
        }
        return or(vec![
            Arc::new(ClauseNode::Expansion {
                clause: rest,
                direction,
                bounds,
            }),
            gap,
        ]);
    }
    Arc::new(ClauseNode::Expansion {
        clause: base,
        direction,
        bounds,
    })
}

