//! Turns an optimized clause tree into a stream tree for one shard.

use crate::error::{Error, Result};
use crate::index::IndexSnapshot;
use crate::nfa::{ForwardIndexAccessor, Nfa};
use crate::query::{Bounds, Clause, ClauseNode};
use crate::stream::{
    opt_sort_uniq, sequence_join, BoxedStream, ExpansionStream, FiSeqStream, NGramsStream,
    NotStream, OrStream, PositionFilterStream, RepetitionStream, TermStream,
};
use std::sync::Arc;
use tracing::trace;

/// Builds streams over one shard.
///
/// Forward-index readers are opened lazily and shared by every automaton the
/// plan compiles.
pub struct ShardPlanner {
    index: Arc<dyn IndexSnapshot>,
    accessor: ForwardIndexAccessor,
    automata: usize,
}

impl ShardPlanner {
    /// Creates a planner for `index`.
    #[must_use]
    pub fn new(index: Arc<dyn IndexSnapshot>) -> Self {
        let accessor = ForwardIndexAccessor::new(Arc::clone(&index));
        Self {
            index,
            accessor,
            automata: 0,
        }
    }

    /// Number of automata compiled so far.
    #[must_use]
    pub fn automata(&self) -> usize {
        self.automata
    }

    /// Builds the top-level stream of `clause`: hits in `(start, end)` order,
    /// without duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClause`] for trees the executor cannot run
    /// (e.g. an unrewritten repetition of an empty match) and propagates index
    /// failures.
    pub fn top_level(&mut self, clause: &Clause) -> Result<BoxedStream> {
        let stream = self.stream(clause)?;
        Ok(opt_sort_uniq(stream, true, true))
    }

    /// Builds the raw stream of `clause`.
    ///
    /// # Errors
    ///
    /// See [`top_level`](Self::top_level).
    pub fn stream(&mut self, clause: &Clause) -> Result<BoxedStream> {
        match clause.as_ref() {
            ClauseNode::Token {
                field,
                value,
                sensitivity,
            } => {
                let postings = self.index.postings(field, value, *sensitivity)?;
                Ok(Box::new(TermStream::new(postings)))
            }
            ClauseNode::AnyToken { bounds } => self.ngrams(*bounds),
            ClauseNode::DefaultValue => self.ngrams(Bounds::ANY),
            ClauseNode::Not { clause: inner } => {
                let inner = self.stream(inner)?;
                Ok(Box::new(NotStream::new(inner, Arc::clone(&self.index))?))
            }
            ClauseNode::Repetition { clause: base, bounds } => {
                if bounds.min == 0 {
                    return Err(Error::InvalidClause(format!(
                        "repetition {clause} can match empty and must be rewritten first"
                    )));
                }
                let base = opt_sort_uniq(self.stream(base)?, true, true);
                Ok(Box::new(RepetitionStream::new(base, bounds.min, bounds.max)?))
            }
            ClauseNode::Expansion {
                clause: source,
                direction,
                bounds,
            } => {
                let source = self.stream(source)?;
                let expansion = ExpansionStream::new(
                    source,
                    Arc::clone(&self.index),
                    *direction,
                    bounds.min,
                    bounds.max,
                )?;
                Ok(opt_sort_uniq(Box::new(expansion), true, true))
            }
            ClauseNode::Sequence { clauses } => {
                let mut parts = clauses.iter();
                let Some(first) = parts.next() else {
                    return Err(Error::InvalidClause("empty sequence".to_string()));
                };
                let mut joined = self.stream(first)?;
                for part in parts {
                    let right = self.stream(part)?;
                    joined = sequence_join(joined, right)?;
                }
                Ok(joined)
            }
            ClauseNode::Or { clauses } => {
                let streams = clauses
                    .iter()
                    .map(|c| self.stream(c))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(OrStream::new(streams)))
            }
            ClauseNode::PositionFilter {
                producer,
                filter,
                op,
                invert,
                left_adjust,
                right_adjust,
            } => {
                let producer = self.stream(producer)?;
                let filter = self.stream(filter)?;
                Ok(Box::new(PositionFilterStream::new(
                    producer,
                    filter,
                    *op,
                    *invert,
                    *left_adjust,
                    *right_adjust,
                )))
            }
            ClauseNode::ForwardIndexSequence {
                anchor,
                nfa,
                direction,
            } => {
                let anchor = self.stream(anchor)?;
                let automaton = Nfa::compile(nfa, *direction, &self.accessor)?;
                self.automata += 1;
                trace!(
                    states = automaton.state_count(),
                    fields = self.accessor.open_fields(),
                    "compiled forward-index automaton"
                );
                Ok(Box::new(FiSeqStream::new(
                    anchor,
                    Arc::new(automaton),
                    Arc::clone(&self.index),
                )))
            }
        }
    }

    fn ngrams(&self, bounds: Bounds) -> Result<BoxedStream> {
        Ok(Box::new(NGramsStream::new(
            Arc::clone(&self.index),
            bounds.min,
            bounds.max,
        )?))
    }
}
