//! Structural combining rules.

use super::CANNOT_COMBINE;
use crate::error::{Error, Result};
use crate::query::{any_token, sequence, Bounds, Clause, ClauseNode, Direction, FilterOp};
use std::sync::Arc;

const REPETITION_PRIORITY: i32 = 2;
const ANY_EXPANSION_PRIORITY: i32 = 3;
const INTERNALISATION_PRIORITY: i32 = 4;
const DEFAULT_VALUE_PRIORITY: i32 = 8;
const NOT_PRIORITY: i32 = 40;

fn rejected(rule: &str, left: &Clause, right: &Clause) -> Error {
    Error::Internal(format!("{rule}: cannot combine {left} and {right}"))
}

fn is_default_value(clause: &Clause) -> bool {
    matches!(clause.as_ref(), ClauseNode::DefaultValue)
}

fn any_bounds(clause: &Clause) -> Option<Bounds> {
    match clause.as_ref() {
        ClauseNode::AnyToken { bounds } => Some(*bounds),
        _ => None,
    }
}

// Repetition: `X X`, `X{a,b} X`, `X{a,b} X{c,d}`.

fn repeated(clause: &Clause) -> (&Clause, Bounds) {
    match clause.as_ref() {
        ClauseNode::Repetition { clause: base, bounds } => (base, *bounds),
        _ => (clause, Bounds::ONE),
    }
}

pub(super) fn repetition_priority(left: &Clause, right: &Clause) -> i32 {
    // Gaps are merged by the expansion and default-value rules.
    let gap = |c: &Clause| is_default_value(c) || any_bounds(c).is_some();
    if gap(left) || gap(right) {
        return CANNOT_COMBINE;
    }
    if repeated(left).0 == repeated(right).0 {
        REPETITION_PRIORITY
    } else {
        CANNOT_COMBINE
    }
}

pub(super) fn repetition_combine(left: &Clause, right: &Clause) -> Result<Clause> {
    let (base, left_bounds) = repeated(left);
    let (other, right_bounds) = repeated(right);
    if repetition_priority(left, right) == CANNOT_COMBINE || base != other {
        return Err(rejected("repetition", left, right));
    }
    Ok(Arc::new(ClauseNode::Repetition {
        clause: Arc::clone(base),
        bounds: left_bounds.add(right_bounds),
    }))
}

// AnyExpansion: gaps next to clauses.

fn expandable(clause: &Clause) -> bool {
    !matches!(
        clause.as_ref(),
        ClauseNode::AnyToken { .. } | ClauseNode::DefaultValue
    ) && !clause.matches_empty()
}

pub(super) fn any_expansion_priority(left: &Clause, right: &Clause) -> i32 {
    match (any_bounds(left), any_bounds(right)) {
        (Some(_), Some(_)) => ANY_EXPANSION_PRIORITY,
        (Some(_), None) if expandable(right) => ANY_EXPANSION_PRIORITY,
        (None, Some(_)) if expandable(left) => ANY_EXPANSION_PRIORITY,
        _ => CANNOT_COMBINE,
    }
}

pub(super) fn any_expansion_combine(left: &Clause, right: &Clause) -> Result<Clause> {
    Ok(match (any_bounds(left), any_bounds(right)) {
        (Some(a), Some(b)) => any_token(a.add(b)),
        (Some(a), None) if expandable(right) => Arc::new(ClauseNode::Expansion {
            clause: Arc::clone(right),
            direction: Direction::Left,
            bounds: a,
        }),
        (None, Some(b)) if expandable(left) => Arc::new(ClauseNode::Expansion {
            clause: Arc::clone(left),
            direction: Direction::Right,
            bounds: b,
        }),
        _ => return Err(rejected("any_expansion", left, right)),
    })
}

// Internalisation: a wrapping clause absorbs its neighbour.

/// Adds `neighbour` to `target`, splicing into `target` if it already is a
/// sequence.
fn sequence_internalize(target: &Clause, neighbour: &Clause, add_to_right: bool) -> Clause {
    let mut parts = match target.as_ref() {
        ClauseNode::Sequence { clauses } => clauses.clone(),
        _ => vec![Arc::clone(target)],
    };
    if add_to_right {
        parts.push(Arc::clone(neighbour));
    } else {
        parts.insert(0, Arc::clone(neighbour));
    }
    sequence(parts)
}

/// True if `host` can absorb `neighbour` standing on its right
/// (`on_the_right`) or left.
fn can_internalize(host: &Clause, neighbour: &Clause, on_the_right: bool) -> bool {
    match host.as_ref() {
        ClauseNode::Expansion { direction, .. } => {
            let plain_side = match direction {
                Direction::Left => on_the_right,
                Direction::Right => !on_the_right,
            };
            plain_side || any_bounds(neighbour).is_some()
        }
        ClauseNode::PositionFilter { .. } => neighbour.all_same_length(),
        _ => false,
    }
}

fn internalize(host: &Clause, neighbour: &Clause, on_the_right: bool) -> Option<Clause> {
    if !can_internalize(host, neighbour, on_the_right) {
        return None;
    }
    Some(match host.as_ref() {
        ClauseNode::Expansion {
            clause,
            direction,
            bounds,
        } => {
            let grows_left = *direction == Direction::Left;
            if on_the_right == grows_left {
                Arc::new(ClauseNode::Expansion {
                    clause: sequence_internalize(clause, neighbour, grows_left),
                    direction: *direction,
                    bounds: *bounds,
                })
            } else {
                Arc::new(ClauseNode::Expansion {
                    clause: Arc::clone(clause),
                    direction: *direction,
                    bounds: bounds.add(neighbour.length_bounds()),
                })
            }
        }
        ClauseNode::PositionFilter {
            producer,
            filter,
            op,
            invert,
            left_adjust,
            right_adjust,
        } => {
            let len = i32::try_from(neighbour.length_min()).ok()?;
            let (left_adjust, right_adjust) = if on_the_right {
                (*left_adjust, right_adjust.checked_sub(len)?)
            } else {
                (left_adjust.checked_add(len)?, *right_adjust)
            };
            Arc::new(ClauseNode::PositionFilter {
                producer: sequence_internalize(producer, neighbour, on_the_right),
                filter: Arc::clone(filter),
                op: *op,
                invert: *invert,
                left_adjust,
                right_adjust,
            })
        }
        _ => return None,
    })
}

pub(super) fn internalisation_priority(left: &Clause, right: &Clause) -> i32 {
    if can_internalize(left, right, true) || can_internalize(right, left, false) {
        INTERNALISATION_PRIORITY
    } else {
        CANNOT_COMBINE
    }
}

pub(super) fn internalisation_combine(left: &Clause, right: &Clause) -> Result<Clause> {
    internalize(left, right, true)
        .or_else(|| internalize(right, left, false))
        .ok_or_else(|| rejected("internalisation", left, right))
}

// DefaultValue: `_ _ → _`, `_ []{a,b} → []{a,}`.

pub(super) fn default_value_priority(left: &Clause, right: &Clause) -> i32 {
    let (l, r) = (is_default_value(left), is_default_value(right));
    let applies = (l && r)
        || (l && any_bounds(right).is_some())
        || (r && any_bounds(left).is_some());
    if applies {
        DEFAULT_VALUE_PRIORITY
    } else {
        CANNOT_COMBINE
    }
}

pub(super) fn default_value_combine(left: &Clause, right: &Clause) -> Result<Clause> {
    match (left.as_ref(), right.as_ref()) {
        (ClauseNode::DefaultValue, ClauseNode::DefaultValue) => Ok(Arc::clone(left)),
        (ClauseNode::DefaultValue, ClauseNode::AnyToken { bounds })
        | (ClauseNode::AnyToken { bounds }, ClauseNode::DefaultValue) => {
            Ok(any_token(Bounds::at_least(bounds.min)))
        }
        _ => Err(rejected("default_value", left, right)),
    }
}

// Not: `!t B` and `B !t` for constant-length B.

fn negated_token(clause: &Clause) -> Option<&Clause> {
    match clause.as_ref() {
        ClauseNode::Not { clause } => Some(clause),
        _ => None,
    }
}

fn constant_non_empty(clause: &Clause) -> bool {
    clause.all_same_length() && clause.length_min() >= 1
}

pub(super) fn not_priority(left: &Clause, right: &Clause) -> i32 {
    let applies = (negated_token(left).is_some() && constant_non_empty(right))
        || (negated_token(right).is_some() && constant_non_empty(left));
    if applies {
        NOT_PRIORITY
    } else {
        CANNOT_COMBINE
    }
}

fn not_filter(kept: &Clause, excluded: &Clause, not_on_left: bool) -> Result<Clause> {
    let len = i32::try_from(kept.length_min())
        .map_err(|_| Error::Internal(format!("clause too long: {kept}")))?;
    let (direction, left_adjust, right_adjust) = if not_on_left {
        (Direction::Left, 0, -len)
    } else {
        (Direction::Right, len, 0)
    };
    Ok(Arc::new(ClauseNode::PositionFilter {
        producer: Arc::new(ClauseNode::Expansion {
            clause: Arc::clone(kept),
            direction,
            bounds: Bounds::ONE,
        }),
        filter: Arc::clone(excluded),
        op: FilterOp::Containing,
        invert: true,
        left_adjust,
        right_adjust,
    }))
}

pub(super) fn not_combine(left: &Clause, right: &Clause) -> Result<Clause> {
    if let Some(excluded) = negated_token(left) {
        if constant_non_empty(right) {
            return not_filter(right, excluded, true);
        }
    }
    if let Some(excluded) = negated_token(right) {
        if constant_non_empty(left) {
            return not_filter(left, excluded, false);
        }
    }
    Err(rejected("not", left, right))
}
