//! Per-document sorting and duplicate elimination.
//!
//! Operators such as the expansion stream may produce hits out of order or
//! repeated. These wrappers restore order lazily, buffering a single document.

use super::buffered::{step_doc, BufferedStream, HitProducer};
use super::{drain_doc, BoxedStream, PositionStream};
use crate::error::Result;
use crate::span::{DocId, Guarantees, Position, NOT_POSITIONED, NO_MORE_DOCS, NO_MORE_POSITIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    Start,
    End,
}

/// Sorts each document's hits by start or by end, optionally removing duplicates.
pub struct PerDocumentSorted {
    inner: BoxedStream,
    key: SortKey,
    dedupe: bool,
}

impl PerDocumentSorted {
    /// Sorts hits by `(start, end)`.
    #[must_use]
    pub fn by_start(inner: BoxedStream, dedupe: bool) -> BufferedStream<Self> {
        BufferedStream::new(Self {
            inner,
            key: SortKey::Start,
            dedupe,
        })
    }

    /// Sorts hits by `(end, start)`.
    #[must_use]
    pub fn by_end(inner: BoxedStream, dedupe: bool) -> BufferedStream<Self> {
        BufferedStream::new(Self {
            inner,
            key: SortKey::End,
            dedupe,
        })
    }
}

impl HitProducer for PerDocumentSorted {
    fn fill(&mut self, target: Option<DocId>, out: &mut Vec<(Position, Position)>) -> Result<DocId> {
        let doc = step_doc(&mut self.inner, target)?;
        if doc == NO_MORE_DOCS {
            return Ok(doc);
        }
        drain_doc(&mut self.inner, out)?;
        match self.key {
            SortKey::Start => out.sort_unstable(),
            SortKey::End => out.sort_unstable_by_key(|&(start, end)| (end, start)),
        }
        if self.dedupe {
            out.dedup();
        }
        Ok(doc)
    }

    fn guarantees(&self) -> Guarantees {
        let inner = self.inner.guarantees();
        match self.key {
            SortKey::Start => inner.sorted_by_start(self.dedupe),
            SortKey::End => inner.sorted_by_end(self.dedupe),
        }
    }
}

/// Removes adjacent duplicate hits from a sorted stream without buffering.
pub struct Unique {
    inner: BoxedStream,
    previous: (Position, Position),
}

impl Unique {
    /// Wraps `inner`, which must be start- or end-sorted.
    #[must_use]
    pub fn new(inner: BoxedStream) -> Self {
        Self {
            inner,
            previous: (NOT_POSITIONED, NOT_POSITIONED),
        }
    }
}

impl PositionStream for Unique {
    fn doc_id(&self) -> DocId {
        self.inner.doc_id()
    }

    fn next_doc(&mut self) -> Result<DocId> {
        self.previous = (NOT_POSITIONED, NOT_POSITIONED);
        self.inner.next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.inner.doc_id() < target {
            self.previous = (NOT_POSITIONED, NOT_POSITIONED);
        }
        self.inner.advance(target)
    }

    fn next_start_position(&mut self) -> Result<Position> {
        loop {
            let start = self.inner.next_start_position()?;
            if start == NO_MORE_POSITIONS {
                return Ok(start);
            }
            let hit = (start, self.inner.end_position());
            if hit != self.previous {
                self.previous = hit;
                return Ok(start);
            }
        }
    }

    fn start_position(&self) -> Position {
        self.inner.start_position()
    }

    fn end_position(&self) -> Position {
        self.inner.end_position()
    }

    fn guarantees(&self) -> Guarantees {
        Guarantees {
            unique: true,
            ..self.inner.guarantees()
        }
    }
}

/// Wraps `stream` in a start sorter unless it already is start-sorted.
#[must_use]
pub fn ensure_start_sorted(stream: BoxedStream) -> BoxedStream {
    if stream.guarantees().start_sorted {
        stream
    } else {
        Box::new(PerDocumentSorted::by_start(stream, false))
    }
}

/// Wraps `stream` in an end sorter unless it already is end-sorted.
#[must_use]
pub fn ensure_end_sorted(stream: BoxedStream) -> BoxedStream {
    if stream.guarantees().end_sorted {
        stream
    } else {
        Box::new(PerDocumentSorted::by_end(stream, false))
    }
}

/// Makes `stream` start-sorted (if `sort`) and duplicate-free (if `unique`),
/// adding at most one wrapper.
#[must_use]
pub fn opt_sort_uniq(stream: BoxedStream, sort: bool, unique: bool) -> BoxedStream {
    let g = stream.guarantees();
    let needs_sort = sort && !g.start_sorted;
    let needs_unique = unique && !g.unique;
    match (needs_sort, needs_unique) {
        (false, false) => stream,
        (true, dedupe) => Box::new(PerDocumentSorted::by_start(stream, dedupe)),
        (false, true) if g.start_sorted || g.end_sorted => Box::new(Unique::new(stream)),
        (false, true) => Box::new(PerDocumentSorted::by_start(stream, true)),
    }
}
