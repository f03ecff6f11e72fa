//! Two-way NFA over the forward index.
//!
//! A clause is compiled into a Thompson automaton whose transitions test the
//! term id at the next position of one field. Forward automata read
//! `pos, pos + 1, …` and report exclusive end positions; backward automata read
//! `pos - 1, pos - 2, …` and report inclusive start positions. The automaton is
//! simulated as a set of states, so matching from one position costs at most
//! `states × tokens read`.
//!
//! States live in an arena and refer to each other by index; the automaton is
//! built back to front, starting from the accepting state.

mod accessor;

pub use accessor::{FieldHandle, ForwardIndexAccessor};

use crate::error::{Error, Result};
use crate::query::{any_token, Bounds, Clause, ClauseNode, Direction, MatchDirection};
use crate::span::{DocId, Position};
use crate::terms::TermId;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Index of a state in the arena.
pub type StateId = usize;

#[derive(Debug, Clone)]
enum Predicate {
    AnyOf(FxHashSet<TermId>),
    NoneOf(FxHashSet<TermId>),
    Any,
}

impl Predicate {
    fn accepts(&self, id: TermId) -> bool {
        match self {
            Self::AnyOf(ids) => ids.contains(&id),
            Self::NoneOf(ids) => !ids.contains(&id),
            Self::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    /// Consumes one token of `field` satisfying `predicate`.
    Consume {
        field: usize,
        predicate: Predicate,
        next: StateId,
    },
    /// Epsilon transitions.
    Split(Vec<StateId>),
    Match,
}

/// Compiled automaton.
#[derive(Debug)]
pub struct Nfa {
    states: Vec<State>,
    start: StateId,
    direction: MatchDirection,
    fields: Vec<Arc<FieldHandle>>,
    length: Bounds,
}

impl Nfa {
    /// Compiles `clause` for matching in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClause`] for clauses that cannot be matched
    /// token by token (position filters, forward-index sequences, negations of
    /// anything but a token) and [`Error::UnknownField`] for unknown fields.
    pub fn compile(
        clause: &Clause,
        direction: MatchDirection,
        accessor: &ForwardIndexAccessor,
    ) -> Result<Self> {
        let mut builder = Builder {
            states: vec![State::Match],
            direction,
            accessor,
            fields: Vec::new(),
        };
        let start = builder.build(clause, 0)?;
        Ok(Self {
            states: builder.states,
            start,
            direction,
            fields: builder.fields,
            length: clause.length_bounds(),
        })
    }

    /// Direction tokens are read in.
    #[must_use]
    pub fn direction(&self) -> MatchDirection {
        self.direction
    }

    /// Number of tokens a match consumes.
    #[must_use]
    pub fn length_bounds(&self) -> Bounds {
        self.length
    }

    /// Number of states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Adds `state` and everything reachable from it through epsilon
    /// transitions to `set`.
    fn close(&self, state: StateId, set: &mut FxHashSet<StateId>) {
        let mut stack = vec![state];
        while let Some(id) = stack.pop() {
            if !set.insert(id) {
                continue;
            }
            if let Some(State::Split(targets)) = self.states.get(id) {
                stack.extend(targets.iter().copied());
            }
        }
    }

    /// Boundaries reachable from `pos` in `doc`, sorted ascending.
    ///
    /// `doc_length` is the number of tokens hits may cover. Forward matching
    /// returns exclusive ends in `pos..=doc_length`; backward matching returns
    /// inclusive starts in `0..=pos`.
    ///
    /// # Errors
    ///
    /// Propagates forward-index failures.
    pub fn find_matches(&self, doc: DocId, pos: Position, doc_length: Position) -> Result<Vec<Position>> {
        let mut boundaries = Vec::new();
        let mut current = FxHashSet::default();
        self.close(self.start, &mut current);
        let mut pos = pos;
        let mut term_cache: Vec<Option<TermId>> = vec![None; self.fields.len()];

        while !current.is_empty() {
            if current.contains(&0) {
                boundaries.push(pos);
            }
            let read = match self.direction {
                MatchDirection::Forward if pos < doc_length => pos,
                MatchDirection::Backward if pos > 0 => pos - 1,
                _ => break,
            };

            term_cache.iter_mut().for_each(|t| *t = None);
            let mut next = FxHashSet::default();
            for &id in &current {
                let State::Consume {
                    field,
                    predicate,
                    next: target,
                } = &self.states[id]
                else {
                    continue;
                };
                let term = match term_cache[*field] {
                    Some(term) => term,
                    None => {
                        let term = self.fields[*field].forward().term_at(doc, read)?;
                        term_cache[*field] = Some(term);
                        term
                    }
                };
                if predicate.accepts(term) {
                    self.close(*target, &mut next);
                }
            }
            current = next;
            pos = match self.direction {
                MatchDirection::Forward => pos + 1,
                MatchDirection::Backward => pos - 1,
            };
        }

        boundaries.sort_unstable();
        Ok(boundaries)
    }
}

struct Builder<'a> {
    states: Vec<State>,
    direction: MatchDirection,
    accessor: &'a ForwardIndexAccessor,
    fields: Vec<Arc<FieldHandle>>,
}

impl Builder<'_> {
    fn push(&mut self, state: State) -> StateId {
        self.states.push(state);
        self.states.len() - 1
    }

    fn field_slot(&mut self, name: &str) -> Result<usize> {
        if let Some(i) = self.fields.iter().position(|f| f.name() == name) {
            return Ok(i);
        }
        self.fields.push(self.accessor.field(name)?);
        Ok(self.fields.len() - 1)
    }

    fn main_field(&self) -> String {
        self.accessor.index().main_field().to_string()
    }

    fn token_ids(&mut self, clause: &ClauseNode) -> Result<(usize, FxHashSet<TermId>)> {
        match clause {
            ClauseNode::Token {
                field,
                value,
                sensitivity,
            } => {
                let slot = self.field_slot(field)?;
                let ids = self.fields[slot].terms().ids_of(value, *sensitivity);
                Ok((slot, ids.into_iter().collect()))
            }
            other => Err(Error::InvalidClause(format!(
                "expected a token clause, got {other}"
            ))),
        }
    }

    fn any(&mut self, next: StateId) -> Result<StateId> {
        let field = self.main_field();
        let field = self.field_slot(&field)?;
        Ok(self.push(State::Consume {
            field,
            predicate: Predicate::Any,
            next,
        }))
    }

    /// Builds parts given in text order.
    fn build_sequence(&mut self, parts: &[Clause], next: StateId) -> Result<StateId> {
        let mut next = next;
        match self.direction {
            // The last part is read last going forward, first going backward.
            MatchDirection::Forward => {
                for part in parts.iter().rev() {
                    next = self.build(part, next)?;
                }
            }
            MatchDirection::Backward => {
                for part in parts {
                    next = self.build(part, next)?;
                }
            }
        }
        Ok(next)
    }

    /// Builds `bounds` repetitions of the fragment `body` creates.
    fn build_repeated(
        &mut self,
        bounds: Bounds,
        next: StateId,
        body: &mut dyn FnMut(&mut Self, StateId) -> Result<StateId>,
    ) -> Result<StateId> {
        let mut tail = match bounds.max {
            Some(max) => {
                let mut tail = next;
                for _ in bounds.min..max {
                    let part = body(self, tail)?;
                    tail = self.push(State::Split(vec![part, next]));
                }
                tail
            }
            None => {
                let loop_state = self.push(State::Split(Vec::new()));
                let part = body(self, loop_state)?;
                self.states[loop_state] = State::Split(vec![part, next]);
                loop_state
            }
        };
        for _ in 0..bounds.min {
            tail = body(self, tail)?;
        }
        Ok(tail)
    }

    fn build(&mut self, clause: &Clause, next: StateId) -> Result<StateId> {
        match clause.as_ref() {
            ClauseNode::Token { .. } => {
                let (field, ids) = self.token_ids(clause)?;
                Ok(self.push(State::Consume {
                    field,
                    predicate: Predicate::AnyOf(ids),
                    next,
                }))
            }
            ClauseNode::Not { clause: inner } => {
                let (field, ids) = self.token_ids(inner)?;
                Ok(self.push(State::Consume {
                    field,
                    predicate: Predicate::NoneOf(ids),
                    next,
                }))
            }
            ClauseNode::AnyToken { bounds } => {
                self.build_repeated(*bounds, next, &mut |b, n| b.any(n))
            }
            ClauseNode::DefaultValue => {
                self.build_repeated(Bounds::ANY, next, &mut |b, n| b.any(n))
            }
            ClauseNode::Repetition { clause: part, bounds } => {
                self.build_repeated(*bounds, next, &mut |b, n| b.build(part, n))
            }
            ClauseNode::Expansion {
                clause: part,
                direction,
                bounds,
            } => {
                let gap = any_token(*bounds);
                let parts = match direction {
                    Direction::Left => [gap, Arc::clone(part)],
                    Direction::Right => [Arc::clone(part), gap],
                };
                self.build_sequence(&parts, next)
            }
            ClauseNode::Sequence { clauses } => self.build_sequence(clauses, next),
            ClauseNode::Or { clauses } => {
                let mut branches = Vec::with_capacity(clauses.len());
                for alternative in clauses {
                    branches.push(self.build(alternative, next)?);
                }
                Ok(self.push(State::Split(branches)))
            }
            ClauseNode::PositionFilter { .. } | ClauseNode::ForwardIndexSequence { .. } => {
                Err(Error::InvalidClause(format!(
                    "{} cannot be matched through the forward index",
                    clause.kind()
                )))
            }
        }
    }
}
