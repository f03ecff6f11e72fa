use super::PositionStream;
use crate::error::Result;
use crate::index::DocPositions;
use crate::span::{DocId, Guarantees, Position, NOT_POSITIONED, NO_MORE_DOCS, NO_MORE_POSITIONS};

/// Single-token hits read from a postings list.
#[derive(Debug)]
pub struct TermStream {
    postings: Vec<DocPositions>,
    doc_index: Option<usize>,
    position_index: usize,
    start: Position,
}

impl TermStream {
    /// Creates a stream over `postings` (sorted by document, positions ascending).
    #[must_use]
    pub fn new(postings: Vec<DocPositions>) -> Self {
        Self {
            postings,
            doc_index: None,
            position_index: 0,
            start: NOT_POSITIONED,
        }
    }

    /// Number of documents the term occurs in.
    #[must_use]
    pub fn doc_frequency(&self) -> usize {
        self.postings.len()
    }

    fn current(&self) -> Option<&DocPositions> {
        self.doc_index.and_then(|i| self.postings.get(i))
    }

    fn enter(&mut self, index: usize) -> DocId {
        self.doc_index = Some(index);
        self.position_index = 0;
        self.start = NOT_POSITIONED;
        self.doc_id()
    }
}

impl PositionStream for TermStream {
    fn doc_id(&self) -> DocId {
        self.current().map_or(NO_MORE_DOCS, |p| p.doc)
    }

    fn next_doc(&mut self) -> Result<DocId> {
        let next = self.doc_index.map_or(0, |i| i + 1).min(self.postings.len());
        Ok(self.enter(next))
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.doc_index.is_some() && self.doc_id() >= target {
            return Ok(self.doc_id());
        }
        let from = self.doc_index.map_or(0, |i| i + 1).min(self.postings.len());
        let offset = self.postings[from..].partition_point(|p| p.doc < target);
        Ok(self.enter(from + offset))
    }

    fn next_start_position(&mut self) -> Result<Position> {
        let next = self
            .current()
            .and_then(|p| p.positions.get(self.position_index))
            .copied();
        self.start = match next {
            Some(position) => {
                self.position_index += 1;
                position
            }
            None => NO_MORE_POSITIONS,
        };
        Ok(self.start)
    }

    fn advance_start_position(&mut self, target: Position) -> Result<Position> {
        if self.start >= target {
            return Ok(self.start);
        }
        let from = self.position_index;
        let skip = self.current().map(|doc| {
            doc.positions
                .get(from..)
                .map_or(0, |rest| rest.partition_point(|&p| p < target))
        });
        match skip {
            Some(skip) => {
                self.position_index += skip;
                self.next_start_position()
            }
            None => {
                self.start = NO_MORE_POSITIONS;
                Ok(self.start)
            }
        }
    }

    fn start_position(&self) -> Position {
        self.start
    }

    fn end_position(&self) -> Position {
        match self.start {
            NOT_POSITIONED | NO_MORE_POSITIONS => self.start,
            start => start + 1,
        }
    }

    fn guarantees(&self) -> Guarantees {
        Guarantees::SINGLE_TOKEN
    }
}
