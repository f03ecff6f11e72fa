//! Structural properties of clauses: hit lengths, empty matches, NFA support.

use super::{any_token, or, sequence, Bounds, Clause, ClauseNode};
use std::sync::Arc;

impl ClauseNode {
    /// Shortest and longest hit this clause can produce.
    #[must_use]
    pub fn length_bounds(&self) -> Bounds {
        match self {
            Self::Token { .. } | Self::Not { .. } => Bounds::ONE,
            Self::AnyToken { bounds } => *bounds,
            Self::Repetition { clause, bounds } => clause.length_bounds().mul(*bounds),
            Self::Expansion { clause, bounds, .. } => clause.length_bounds().add(*bounds),
            Self::PositionFilter { producer, .. } => producer.length_bounds(),
            Self::Sequence { clauses } => clauses
                .iter()
                .fold(Bounds::exactly(0), |acc, c| acc.add(c.length_bounds())),
            Self::Or { clauses } => {
                let all: Vec<Bounds> = clauses.iter().map(|c| c.length_bounds()).collect();
                Bounds {
                    min: all.iter().map(|b| b.min).min().unwrap_or(0),
                    max: all
                        .iter()
                        .try_fold(0u32, |acc, b| b.max.map(|m| acc.max(m))),
                }
            }
            Self::ForwardIndexSequence { anchor, nfa, .. } => {
                anchor.length_bounds().add(nfa.length_bounds())
            }
            Self::DefaultValue => Bounds::ANY,
        }
    }

    /// Shortest possible hit.
    #[must_use]
    pub fn length_min(&self) -> u32 {
        self.length_bounds().min
    }

    /// Longest possible hit, `None` if unbounded.
    #[must_use]
    pub fn length_max(&self) -> Option<u32> {
        self.length_bounds().max
    }

    /// True if every hit has the same length.
    #[must_use]
    pub fn all_same_length(&self) -> bool {
        self.length_bounds().is_fixed()
    }

    /// True if the clause can match the empty sequence.
    #[must_use]
    pub fn matches_empty(&self) -> bool {
        match self {
            Self::Token { .. } | Self::Not { .. } => false,
            Self::AnyToken { bounds } => bounds.min == 0,
            Self::Repetition { clause, bounds } => bounds.min == 0 || clause.matches_empty(),
            Self::Expansion { clause, bounds, .. } => bounds.min == 0 && clause.matches_empty(),
            Self::PositionFilter { producer, .. } => producer.matches_empty(),
            Self::Sequence { clauses } => clauses.iter().all(|c| c.matches_empty()),
            Self::Or { clauses } => clauses.iter().any(|c| c.matches_empty()),
            Self::ForwardIndexSequence { anchor, nfa, .. } => {
                anchor.matches_empty() && nfa.matches_empty()
            }
            Self::DefaultValue => true,
        }
    }

    /// True if the clause can be compiled into a forward-index NFA.
    #[must_use]
    pub fn can_make_nfa(&self) -> bool {
        match self {
            Self::Token { .. } | Self::AnyToken { .. } | Self::Not { .. } => true,
            Self::Repetition { clause, .. } => clause.can_make_nfa(),
            Self::Expansion { clause, bounds, .. } => bounds.max.is_some() && clause.can_make_nfa(),
            Self::Sequence { clauses } | Self::Or { clauses } => {
                clauses.iter().all(|c| c.can_make_nfa())
            }
            Self::PositionFilter { .. } | Self::ForwardIndexSequence { .. } | Self::DefaultValue => {
                false
            }
        }
    }

    /// First field a token inside this clause refers to.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Token { field, .. } => Some(field),
            Self::Not { clause } | Self::Repetition { clause, .. } | Self::Expansion { clause, .. } => {
                clause.field()
            }
            Self::PositionFilter { producer, .. } => producer.field(),
            Self::Sequence { clauses } | Self::Or { clauses } => {
                clauses.iter().find_map(|c| c.field())
            }
            Self::ForwardIndexSequence { anchor, nfa, .. } => anchor.field().or_else(|| nfa.field()),
            Self::AnyToken { .. } | Self::DefaultValue => None,
        }
    }

    /// Version of this clause that never matches the empty sequence but
    /// otherwise matches the same hits.
    #[must_use]
    pub fn no_empty(self: &Arc<Self>) -> Clause {
        if !self.matches_empty() {
            return Arc::clone(self);
        }
        match self.as_ref() {
            Self::AnyToken { bounds } => match bounds.max {
                Some(0) => or(Vec::new()),
                max => any_token(Bounds {
                    min: bounds.min.max(1),
                    max,
                }),
            },
            Self::Repetition { clause, bounds } => {
                if bounds.max == Some(0) {
                    return or(Vec::new());
                }
                if !clause.matches_empty() {
                    return Arc::new(Self::Repetition {
                        clause: Arc::clone(clause),
                        bounds: Bounds {
                            min: bounds.min.max(1),
                            max: bounds.max,
                        },
                    });
                }
                // Empty copies add nothing: one to `max` non-empty copies remain.
                let base = clause.no_empty();
                if matches_nothing(&base) {
                    return base;
                }
                Arc::new(Self::Repetition {
                    clause: base,
                    bounds: Bounds {
                        min: 1,
                        max: bounds.max,
                    },
                })
            }
            // Only reached with `min == 0` around an empty-matching clause.
            Self::Expansion {
                clause,
                direction,
                bounds,
            } => {
                let rest = clause.no_empty();
                if bounds.max == Some(0) {
                    return rest;
                }
                // Expanded empty matches are plain gaps.
                let gap = any_token(Bounds {
                    min: 1,
                    max: bounds.max,
                });
                if matches_nothing(&rest) {
                    return gap;
                }
                or(vec![
                    Arc::new(Self::Expansion {
                        clause: rest,
                        direction: *direction,
                        bounds: *bounds,
                    }),
                    gap,
                ])
            }
            Self::PositionFilter {
                producer,
                filter,
                op,
                invert,
                left_adjust,
                right_adjust,
            } => Arc::new(Self::PositionFilter {
                producer: producer.no_empty(),
                filter: Arc::clone(filter),
                op: *op,
                invert: *invert,
                left_adjust: *left_adjust,
                right_adjust: *right_adjust,
            }),
            Self::Sequence { clauses } => {
                let mut alternatives: Vec<Clause> = non_empty_alternatives(clauses)
                    .into_iter()
                    .map(|mut parts| {
                        if parts.len() == 1 {
                            parts.remove(0)
                        } else {
                            sequence(parts)
                        }
                    })
                    .collect();
                if alternatives.len() == 1 {
                    alternatives.remove(0)
                } else {
                    or(alternatives)
                }
            }
            Self::Or { clauses } => or(clauses.iter().map(|c| c.no_empty()).collect()),
            Self::DefaultValue => any_token(Bounds::at_least(1)),
            Self::Token { .. }
            | Self::Not { .. }
            | Self::ForwardIndexSequence { .. } => Arc::clone(self),
        }
    }
}

/// True for the empty `Or`, which matches nothing.
pub(crate) fn matches_nothing(clause: &Clause) -> bool {
    matches!(clause.as_ref(), ClauseNode::Or { clauses } if clauses.is_empty())
}

/// Every way to pick, for each clause that can match empty, either its
/// non-empty version or nothing, skipping the pick where all parts are gone.
///
/// Clauses that never match empty are always present. The result never
/// contains an empty alternative; it is empty only if every clause matches
/// nothing but the empty sequence.
#[must_use]
pub fn non_empty_alternatives(clauses: &[Clause]) -> Vec<Vec<Clause>> {
    let mut alternatives: Vec<Vec<Clause>> = vec![Vec::new()];
    for clause in clauses {
        if !clause.matches_empty() {
            for alt in &mut alternatives {
                alt.push(Arc::clone(clause));
            }
            continue;
        }
        let no_empty = clause.no_empty();
        let matches_something = !matches_nothing(&no_empty);
        let mut next = Vec::with_capacity(alternatives.len() * 2);
        for alt in alternatives {
            if matches_something {
                let mut with = alt.clone();
                with.push(Arc::clone(&no_empty));
                next.push(with);
            }
            next.push(alt);
        }
        alternatives = next;
    }
    alternatives.retain(|alt| !alt.is_empty());
    alternatives
}
