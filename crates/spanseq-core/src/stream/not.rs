use super::buffered::{BufferedStream, HitProducer};
use super::{BoxedStream, PositionStream};
use crate::error::{Error, Result};
use crate::index::IndexSnapshot;
use crate::span::{DocId, Guarantees, Position, NO_MORE_DOCS, NO_MORE_POSITIONS};
use std::sync::Arc;

/// Single-token positions not matched by a single-token clause.
pub struct NotStream {
    inner: BoxedStream,
    inner_started: bool,
    index: Arc<dyn IndexSnapshot>,
    docs: Vec<DocId>,
    next_doc_index: usize,
    excluded: Vec<Position>,
}

impl NotStream {
    /// Creates the complement of `inner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClause`] if `inner` does not produce
    /// single-token hits.
    pub fn new(inner: BoxedStream, index: Arc<dyn IndexSnapshot>) -> Result<BufferedStream<Self>> {
        let g = inner.guarantees();
        if g.length_min != 1 || g.length_max != Some(1) {
            return Err(Error::InvalidClause(
                "NOT can only be applied to single-token clauses".to_string(),
            ));
        }
        let docs = index.docs().iter().collect();
        Ok(BufferedStream::new(Self {
            inner,
            inner_started: false,
            index,
            docs,
            next_doc_index: 0,
            excluded: Vec::new(),
        }))
    }

    fn inner_doc_at_or_after(&mut self, doc: DocId) -> Result<DocId> {
        if self.inner_started && self.inner.doc_id() >= doc {
            return Ok(self.inner.doc_id());
        }
        self.inner_started = true;
        self.inner.advance(doc)
    }
}

impl HitProducer for NotStream {
    fn fill(&mut self, target: Option<DocId>, out: &mut Vec<(Position, Position)>) -> Result<DocId> {
        if let Some(target) = target {
            let rest = &self.docs[self.next_doc_index.min(self.docs.len())..];
            self.next_doc_index += rest.partition_point(|&d| d < target);
        }
        while let Some(&doc) = self.docs.get(self.next_doc_index) {
            self.next_doc_index += 1;
            let length = self.index.effective_length(doc)?;

            self.excluded.clear();
            if self.inner_doc_at_or_after(doc)? == doc {
                while self.inner.next_start_position()? != NO_MORE_POSITIONS {
                    self.excluded.push(self.inner.start_position());
                }
            }
            self.excluded.sort_unstable();

            out.extend(
                (0..length)
                    .filter(|p| self.excluded.binary_search(p).is_err())
                    .map(|p| (p, p + 1)),
            );
            if !out.is_empty() {
                return Ok(doc);
            }
        }
        Ok(NO_MORE_DOCS)
    }

    fn guarantees(&self) -> Guarantees {
        Guarantees::SINGLE_TOKEN
    }
}
