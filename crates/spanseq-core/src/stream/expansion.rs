//! N-gram expansion and plain n-grams.
//!
//! [`ExpansionStream`] grows every source hit by `k` tokens to one side for
//! each `k` in `min..=max`, clipped at the start of the document (left) or at
//! its effective end (right). Output is raw: it may be out of order and contain
//! duplicates, so callers wrap it with [`opt_sort_uniq`](super::opt_sort_uniq)
//! according to its guarantees. No buffering happens here.

use super::buffered::step_doc;
use super::{BoxedStream, PositionStream};
use crate::error::{Error, Result};
use crate::index::IndexSnapshot;
use crate::query::Direction;
use crate::span::{DocId, Guarantees, Position, NOT_POSITIONED, NO_MORE_DOCS, NO_MORE_POSITIONS};
use std::sync::Arc;

fn check_bounds(min: u32, max: Option<u32>) -> Result<()> {
    match max {
        Some(max) if min > max => Err(Error::InvalidBounds { min, max }),
        _ => Ok(()),
    }
}

/// Expands source hits by a variable number of tokens to the left or right.
pub struct ExpansionStream {
    source: BoxedStream,
    index: Arc<dyn IndexSnapshot>,
    direction: Direction,
    min: u32,
    max: Option<u32>,
    doc: DocId,
    started: bool,
    doc_length: Position,
    /// Current source hit and the expansion steps left for it.
    source_hit: (Position, Position),
    next_k: i64,
    last_k: i64,
    pending_first: bool,
    start: Position,
    end: Position,
}

impl ExpansionStream {
    /// Creates an expansion of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if `min > max`.
    pub fn new(
        source: BoxedStream,
        index: Arc<dyn IndexSnapshot>,
        direction: Direction,
        min: u32,
        max: Option<u32>,
    ) -> Result<Self> {
        check_bounds(min, max)?;
        Ok(Self {
            source,
            index,
            direction,
            min,
            max,
            doc: NO_MORE_DOCS,
            started: false,
            doc_length: 0,
            source_hit: (NOT_POSITIONED, NOT_POSITIONED),
            next_k: 0,
            last_k: -1,
            pending_first: false,
            start: NOT_POSITIONED,
            end: NOT_POSITIONED,
        })
    }

    fn steps_left(&self) -> bool {
        match self.direction {
            // Left expansions are produced from the widest down, so starts ascend.
            Direction::Left => self.next_k >= self.last_k && self.next_k >= i64::from(self.min),
            Direction::Right => self.next_k <= self.last_k,
        }
    }

    fn find_next_hit(&mut self) -> Result<bool> {
        loop {
            if self.last_k >= 0 && self.steps_left() {
                let k = self.next_k as Position;
                let (s, e) = self.source_hit;
                match self.direction {
                    Direction::Left => {
                        self.start = s - k;
                        self.end = e;
                        self.next_k -= 1;
                    }
                    Direction::Right => {
                        self.start = s;
                        self.end = e + k;
                        self.next_k += 1;
                    }
                }
                return Ok(true);
            }

            let s = self.source.next_start_position()?;
            if s == NO_MORE_POSITIONS {
                return Ok(false);
            }
            let e = self.source.end_position();
            let room = match self.direction {
                Direction::Left => i64::from(s),
                Direction::Right => i64::from(self.doc_length) - i64::from(e),
            };
            let widest = self.max.map_or(room, |max| room.min(i64::from(max)));
            self.source_hit = (s, e);
            if widest < i64::from(self.min) {
                self.last_k = -1;
                continue;
            }
            match self.direction {
                Direction::Left => {
                    self.next_k = widest;
                    self.last_k = i64::from(self.min);
                }
                Direction::Right => {
                    self.next_k = i64::from(self.min);
                    self.last_k = widest;
                }
            }
        }
    }

    fn enter_docs(&mut self, mut target: Option<DocId>) -> Result<DocId> {
        self.started = true;
        loop {
            let doc = step_doc(&mut self.source, target.take())?;
            self.doc = doc;
            self.last_k = -1;
            self.start = NOT_POSITIONED;
            self.end = NOT_POSITIONED;
            if doc == NO_MORE_DOCS {
                self.pending_first = false;
                return Ok(doc);
            }
            self.doc_length = self.index.effective_length(doc)?;
            if self.find_next_hit()? {
                self.pending_first = true;
                return Ok(doc);
            }
        }
    }
}

impl PositionStream for ExpansionStream {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        if self.started && self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.enter_docs(None)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.started && self.doc >= target {
            return Ok(self.doc);
        }
        self.enter_docs(Some(target))
    }

    fn next_start_position(&mut self) -> Result<Position> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_POSITIONS);
        }
        if self.pending_first {
            self.pending_first = false;
            return Ok(self.start);
        }
        if !self.find_next_hit()? {
            self.start = NO_MORE_POSITIONS;
            self.end = NO_MORE_POSITIONS;
        }
        Ok(self.start)
    }

    fn start_position(&self) -> Position {
        if self.pending_first {
            NOT_POSITIONED
        } else {
            self.start
        }
    }

    fn end_position(&self) -> Position {
        if self.pending_first {
            NOT_POSITIONED
        } else {
            self.end
        }
    }

    fn guarantees(&self) -> Guarantees {
        let g = self.source.guarantees();
        let fixed = self.max == Some(self.min);
        let (start_sorted, end_sorted, unique) = match self.direction {
            Direction::Left => (
                g.start_sorted && fixed,
                g.end_sorted && (fixed || g.unique_end),
                g.unique && (fixed || g.unique_end),
            ),
            Direction::Right => (
                g.start_sorted && (fixed || g.unique_start),
                g.end_sorted && fixed,
                g.unique && (fixed || g.unique_start),
            ),
        };
        Guarantees {
            start_sorted,
            end_sorted,
            unique_start: fixed && g.unique_start,
            unique_end: fixed && g.unique_end,
            unique,
            length_min: g.length_min.saturating_add(self.min),
            length_max: g.length_max.zip(self.max).map(|(a, b)| a.saturating_add(b)),
        }
    }
}

/// Every window of `min..=max` tokens in every document.
pub struct NGramsStream {
    index: Arc<dyn IndexSnapshot>,
    docs: Vec<DocId>,
    doc_index: Option<usize>,
    min: u32,
    max: Option<u32>,
    doc_length: Position,
    start: Position,
    end: Position,
}

impl NGramsStream {
    /// Creates an n-gram stream over all documents of `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if `min > max`.
    pub fn new(index: Arc<dyn IndexSnapshot>, min: u32, max: Option<u32>) -> Result<Self> {
        check_bounds(min, max)?;
        let docs = index.docs().iter().collect();
        Ok(Self {
            index,
            docs,
            doc_index: None,
            min,
            max,
            doc_length: 0,
            start: NOT_POSITIONED,
            end: NOT_POSITIONED,
        })
    }

    fn min_len(&self) -> Position {
        self.min as Position
    }

    fn max_len(&self) -> Position {
        self.max.map_or(Position::MAX, |m| m.min(Position::MAX as u32) as Position)
    }

    /// Enters the first document at or after `from` that is long enough.
    fn enter_from(&mut self, mut from: usize) -> Result<DocId> {
        while let Some(&doc) = self.docs.get(from) {
            let length = self.index.effective_length(doc)?;
            if length >= self.min_len() {
                self.doc_index = Some(from);
                self.doc_length = length;
                self.start = NOT_POSITIONED;
                self.end = NOT_POSITIONED;
                return Ok(doc);
            }
            from += 1;
        }
        self.doc_index = Some(self.docs.len());
        Ok(NO_MORE_DOCS)
    }
}

impl PositionStream for NGramsStream {
    fn doc_id(&self) -> DocId {
        self.doc_index
            .and_then(|i| self.docs.get(i))
            .copied()
            .unwrap_or(NO_MORE_DOCS)
    }

    fn next_doc(&mut self) -> Result<DocId> {
        let from = self.doc_index.map_or(0, |i| (i + 1).min(self.docs.len()));
        self.enter_from(from)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.doc_index.is_some() && self.doc_id() >= target {
            return Ok(self.doc_id());
        }
        let from = self.doc_index.map_or(0, |i| (i + 1).min(self.docs.len()));
        let offset = self.docs[from..].partition_point(|&d| d < target);
        self.enter_from(from + offset)
    }

    fn next_start_position(&mut self) -> Result<Position> {
        if self.doc_id() == NO_MORE_DOCS || self.start == NO_MORE_POSITIONS {
            return Ok(NO_MORE_POSITIONS);
        }
        let (mut start, mut end) = if self.start == NOT_POSITIONED {
            (0, self.min_len())
        } else {
            (self.start, self.end + 1)
        };
        if end - start > self.max_len() || end > self.doc_length {
            start += 1;
            end = start + self.min_len();
        }
        if end > self.doc_length {
            self.start = NO_MORE_POSITIONS;
            self.end = NO_MORE_POSITIONS;
        } else {
            self.start = start;
            self.end = end;
        }
        Ok(self.start)
    }

    fn start_position(&self) -> Position {
        self.start
    }

    fn end_position(&self) -> Position {
        self.end
    }

    fn guarantees(&self) -> Guarantees {
        let fixed = self.max == Some(self.min);
        Guarantees {
            start_sorted: true,
            end_sorted: fixed,
            unique_start: fixed,
            unique_end: fixed,
            unique: true,
            length_min: self.min,
            length_max: self.max,
        }
    }
}
