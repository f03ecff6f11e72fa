use super::buffered::{step_doc, BufferedStream, HitProducer};
use super::{drain_doc, BoxedStream, PositionStream};
use crate::error::Result;
use crate::index::IndexSnapshot;
use crate::nfa::Nfa;
use crate::query::MatchDirection;
use crate::span::{DocId, Guarantees, Position, NO_MORE_DOCS};
use std::sync::Arc;

/// Anchor hits extended through the forward index.
///
/// Forward: every end `b` the NFA reaches from the anchor's end yields
/// `(anchor.start, b)`. Backward: every start `b` reached from the anchor's
/// start yields `(b, anchor.end)`.
pub struct FiSeqStream {
    anchor: BoxedStream,
    nfa: Arc<Nfa>,
    index: Arc<dyn IndexSnapshot>,
    anchor_hits: Vec<(Position, Position)>,
}

impl FiSeqStream {
    /// Creates a forward-index sequence stream.
    #[must_use]
    pub fn new(anchor: BoxedStream, nfa: Arc<Nfa>, index: Arc<dyn IndexSnapshot>) -> BufferedStream<Self> {
        BufferedStream::new(Self {
            anchor,
            nfa,
            index,
            anchor_hits: Vec::new(),
        })
    }
}

impl HitProducer for FiSeqStream {
    fn fill(&mut self, target: Option<DocId>, out: &mut Vec<(Position, Position)>) -> Result<DocId> {
        let mut target = target;
        loop {
            let doc = step_doc(&mut self.anchor, target.take())?;
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            self.anchor_hits.clear();
            drain_doc(&mut self.anchor, &mut self.anchor_hits)?;
            let length = self.index.effective_length(doc)?;

            for &(start, end) in &self.anchor_hits {
                match self.nfa.direction() {
                    MatchDirection::Forward => {
                        for b in self.nfa.find_matches(doc, end, length)? {
                            out.push((start, b));
                        }
                    }
                    MatchDirection::Backward => {
                        for b in self.nfa.find_matches(doc, start, length)? {
                            out.push((b, end));
                        }
                    }
                }
            }
            if !out.is_empty() {
                out.sort_unstable();
                out.dedup();
                return Ok(doc);
            }
        }
    }

    fn guarantees(&self) -> Guarantees {
        let anchor = self.anchor.guarantees();
        let nfa = self.nfa.length_bounds();
        let length_min = anchor.length_min.saturating_add(nfa.min);
        let length_max = anchor
            .length_max
            .zip(nfa.max)
            .map(|(a, b)| a.saturating_add(b));
        Guarantees {
            start_sorted: true,
            end_sorted: length_max == Some(length_min),
            unique_start: false,
            unique_end: false,
            unique: true,
            length_min,
            length_max,
        }
    }
}
