//! Streams that materialise one document's hits at a time.

use super::PositionStream;
use crate::error::Result;
use crate::span::{DocId, Guarantees, Position, NOT_POSITIONED, NO_MORE_DOCS, NO_MORE_POSITIONS};

/// Computes the hits of one document at a time.
pub trait HitProducer: Send {
    /// Moves to the next document that has hits (or the first one `>= target`)
    /// and appends its hits to `out`, in the order they should be returned.
    /// Returns [`NO_MORE_DOCS`] when exhausted.
    fn fill(&mut self, target: Option<DocId>, out: &mut Vec<(Position, Position)>) -> Result<DocId>;

    /// Guarantees of the hits produced.
    fn guarantees(&self) -> Guarantees;
}

/// Adapts a [`HitProducer`] to the [`PositionStream`] cursor protocol.
#[derive(Debug)]
pub struct BufferedStream<P> {
    producer: P,
    doc: DocId,
    started: bool,
    hits: Vec<(Position, Position)>,
    next: usize,
    current: (Position, Position),
}

impl<P: HitProducer> BufferedStream<P> {
    /// Wraps `producer`.
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            doc: NO_MORE_DOCS,
            started: false,
            hits: Vec::new(),
            next: 0,
            current: (NOT_POSITIONED, NOT_POSITIONED),
        }
    }

    fn load(&mut self, target: Option<DocId>) -> Result<DocId> {
        self.hits.clear();
        self.next = 0;
        self.current = (NOT_POSITIONED, NOT_POSITIONED);
        self.started = true;
        self.doc = self.producer.fill(target, &mut self.hits)?;
        Ok(self.doc)
    }
}

impl<P: HitProducer> PositionStream for BufferedStream<P> {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        if self.started && self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.load(None)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.started && self.doc >= target {
            return Ok(self.doc);
        }
        self.load(Some(target))
    }

    fn next_start_position(&mut self) -> Result<Position> {
        if let Some(&hit) = self.hits.get(self.next) {
            self.next += 1;
            self.current = hit;
        } else {
            self.current = (NO_MORE_POSITIONS, NO_MORE_POSITIONS);
        }
        Ok(self.current.0)
    }

    fn start_position(&self) -> Position {
        self.current.0
    }

    fn end_position(&self) -> Position {
        self.current.1
    }

    fn guarantees(&self) -> Guarantees {
        self.producer.guarantees()
    }
}

/// Moves `stream` to its next document, or to the first one `>= target`.
pub(crate) fn step_doc<S: PositionStream + ?Sized>(
    stream: &mut S,
    target: Option<DocId>,
) -> Result<DocId> {
    match target {
        Some(t) => stream.advance(t),
        None => stream.next_doc(),
    }
}
