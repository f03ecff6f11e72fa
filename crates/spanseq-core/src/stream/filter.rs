use super::buffered::{step_doc, BufferedStream, HitProducer};
use super::{drain_doc, BoxedStream, PositionStream};
use crate::error::Result;
use crate::query::FilterOp;
use crate::span::{DocId, Guarantees, Position, NO_MORE_DOCS};

/// Filter hits of one document, indexed so each relation is answered with a
/// binary search.
#[derive(Debug, Default)]
pub(crate) struct FilterIndex {
    /// `(start, end)`, sorted and unique.
    by_start: Vec<(Position, Position)>,
    /// `(end, start)`, sorted.
    by_end: Vec<(Position, Position)>,
    /// Smallest end among `by_start[i..]`.
    min_end_from: Vec<Position>,
    /// Largest end among `by_start[..=i]`.
    max_end_to: Vec<Position>,
}

impl FilterIndex {
    /// Rebuilds the index from the hits of a document, in any order.
    pub(crate) fn load(&mut self, hits: &[(Position, Position)]) {
        self.by_start.clear();
        self.by_start.extend_from_slice(hits);
        self.by_start.sort_unstable();
        self.by_start.dedup();

        self.by_end.clear();
        self.by_end
            .extend(self.by_start.iter().map(|&(start, end)| (end, start)));
        self.by_end.sort_unstable();

        self.min_end_from.clear();
        self.min_end_from.resize(self.by_start.len(), Position::MAX);
        let mut min_end = Position::MAX;
        for (i, &(_, end)) in self.by_start.iter().enumerate().rev() {
            min_end = min_end.min(end);
            self.min_end_from[i] = min_end;
        }

        self.max_end_to.clear();
        let mut max_end = Position::MIN;
        for &(_, end) in &self.by_start {
            max_end = max_end.max(end);
            self.max_end_to.push(max_end);
        }
    }

    /// True if some filter hit `f` satisfies `op` with window `w`.
    pub(crate) fn related(&self, op: FilterOp, w: (Position, Position)) -> bool {
        let (start, end) = w;
        match op {
            FilterOp::Containing => {
                let i = self.by_start.partition_point(|&(s, _)| s < start);
                i < self.by_start.len() && self.min_end_from[i] <= end
            }
            FilterOp::Within => {
                let i = self.by_start.partition_point(|&(s, _)| s <= start);
                i > 0 && self.max_end_to[i - 1] >= end
            }
            FilterOp::StartsAt => {
                let i = self.by_start.partition_point(|&(s, _)| s < start);
                self.by_start.get(i).is_some_and(|&(s, _)| s == start)
            }
            FilterOp::EndsAt => {
                let i = self.by_end.partition_point(|&(e, _)| e < end);
                self.by_end.get(i).is_some_and(|&(e, _)| e == end)
            }
            FilterOp::Matches => self.by_start.binary_search(&w).is_ok(),
            FilterOp::ContainingAtStart => {
                // Shortest filter hit starting at the window start
                let i = self.by_start.partition_point(|&(s, _)| s < start);
                self.by_start
                    .get(i)
                    .is_some_and(|&(s, e)| s == start && e <= end)
            }
            FilterOp::ContainingAtEnd => {
                // Latest-starting filter hit ending at the window end
                let i = self.by_end.partition_point(|&(e, _)| e <= end);
                i > 0 && {
                    let (e, s) = self.by_end[i - 1];
                    e == end && s >= start
                }
            }
        }
    }
}

/// Producer hits kept or dropped depending on how they relate to filter hits.
///
/// Each producer hit `(s, e)` is tested as the window
/// `(s + left_adjust, e + right_adjust)`; the unadjusted hit is returned.
pub struct PositionFilterStream {
    producer: BoxedStream,
    filter: BoxedStream,
    filter_started: bool,
    op: FilterOp,
    invert: bool,
    left_adjust: Position,
    right_adjust: Position,
    producer_hits: Vec<(Position, Position)>,
    filter_hits: Vec<(Position, Position)>,
    index: FilterIndex,
}

impl PositionFilterStream {
    /// Creates a position filter.
    #[must_use]
    pub fn new(
        producer: BoxedStream,
        filter: BoxedStream,
        op: FilterOp,
        invert: bool,
        left_adjust: Position,
        right_adjust: Position,
    ) -> BufferedStream<Self> {
        BufferedStream::new(Self {
            producer,
            filter,
            filter_started: false,
            op,
            invert,
            left_adjust,
            right_adjust,
            producer_hits: Vec::new(),
            filter_hits: Vec::new(),
            index: FilterIndex::default(),
        })
    }

    /// Loads the filter hits of `doc`, if any.
    fn load_filter(&mut self, doc: DocId) -> Result<()> {
        self.filter_hits.clear();
        let at = if self.filter_started && self.filter.doc_id() >= doc {
            self.filter.doc_id()
        } else {
            self.filter_started = true;
            self.filter.advance(doc)?
        };
        if at == doc {
            drain_doc(&mut self.filter, &mut self.filter_hits)?;
        }
        self.index.load(&self.filter_hits);
        Ok(())
    }

    fn keep(&self, (start, end): (Position, Position)) -> bool {
        let window = (start + self.left_adjust, end + self.right_adjust);
        self.index.related(self.op, window) != self.invert
    }
}

impl HitProducer for PositionFilterStream {
    fn fill(&mut self, target: Option<DocId>, out: &mut Vec<(Position, Position)>) -> Result<DocId> {
        let mut target = target;
        loop {
            let doc = step_doc(&mut self.producer, target.take())?;
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            self.producer_hits.clear();
            drain_doc(&mut self.producer, &mut self.producer_hits)?;
            self.load_filter(doc)?;

            out.extend(
                self.producer_hits
                    .iter()
                    .copied()
                    .filter(|&hit| self.keep(hit)),
            );
            if !out.is_empty() {
                out.sort_unstable();
                return Ok(doc);
            }
        }
    }

    fn guarantees(&self) -> Guarantees {
        self.producer.guarantees().sorted_by_start(false)
    }
}
