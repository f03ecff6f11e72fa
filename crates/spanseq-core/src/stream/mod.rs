//! Position streams: per-document cursors over the hits of a clause.
//!
//! A stream is advanced document by document ([`PositionStream::next_doc`],
//! [`PositionStream::advance`]) and, inside a document, hit by hit
//! ([`PositionStream::next_start_position`]). A stream only stops on documents
//! containing at least one hit. Both cursors are monotonic.
//!
//! | Stream | Produces |
//! |--------|----------|
//! | [`TermStream`] | postings of a term |
//! | [`NGramsStream`] | every `[]{min,max}` window |
//! | [`NotStream`] | single tokens not matched by a clause |
//! | [`SequenceJoin`] | `left` immediately followed by `right` |
//! | [`RepetitionStream`] | chains of abutting base hits |
//! | [`ExpansionStream`] | hits grown by a gap to one side |
//! | [`PositionFilterStream`] | producer hits filtered by position relations |
//! | [`OrStream`] | union of several streams |
//! | [`FiSeqStream`] | anchor hits extended by forward-index NFA matching |
//! | [`PerDocumentSorted`], [`Unique`] | post-processing wrappers |

mod buffered;
mod expansion;
mod fiseq;
mod filter;
mod not;
mod or;
mod postings;
mod repetition;
mod sequence;
mod sort;

pub use buffered::{BufferedStream, HitProducer};
pub use expansion::{ExpansionStream, NGramsStream};
pub use fiseq::FiSeqStream;
pub use filter::PositionFilterStream;
pub use not::NotStream;
pub use or::OrStream;
pub use postings::TermStream;
pub use repetition::RepetitionStream;
pub use sequence::{sequence_join, SequenceJoin};
pub use sort::{ensure_end_sorted, ensure_start_sorted, opt_sort_uniq, PerDocumentSorted, Unique};

use crate::error::Result;
use crate::span::{DocId, Guarantees, Position, Span, NO_MORE_DOCS, NO_MORE_POSITIONS};

/// Per-document cursor over hits.
///
/// Before the first call to [`next_doc`](Self::next_doc) or
/// [`advance`](Self::advance) the current document is unspecified. Within a
/// document, [`start_position`](Self::start_position) is
/// [`NOT_POSITIONED`](crate::span::NOT_POSITIONED) until the first hit is read.
pub trait PositionStream: Send {
    /// Current document, or [`NO_MORE_DOCS`].
    fn doc_id(&self) -> DocId;

    /// Moves to the next document with hits.
    fn next_doc(&mut self) -> Result<DocId>;

    /// Moves to the first document `>= target` with hits. If the stream already
    /// sits on such a document it stays there.
    fn advance(&mut self, target: DocId) -> Result<DocId>;

    /// Moves to the next hit in the current document; [`NO_MORE_POSITIONS`]
    /// when exhausted.
    fn next_start_position(&mut self) -> Result<Position>;

    /// Moves to the first hit starting at or after `target`. Only meaningful
    /// for start-sorted streams.
    fn advance_start_position(&mut self, target: Position) -> Result<Position> {
        let mut start = self.start_position();
        while start < target {
            start = self.next_start_position()?;
        }
        Ok(start)
    }

    /// Start of the current hit.
    fn start_position(&self) -> Position;

    /// End of the current hit.
    fn end_position(&self) -> Position;

    /// Static ordering and length guarantees.
    fn guarantees(&self) -> Guarantees;
}

/// Owned, type-erased stream.
pub type BoxedStream = Box<dyn PositionStream>;

impl<S: PositionStream + ?Sized> PositionStream for Box<S> {
    fn doc_id(&self) -> DocId {
        (**self).doc_id()
    }

    fn next_doc(&mut self) -> Result<DocId> {
        (**self).next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        (**self).advance(target)
    }

    fn next_start_position(&mut self) -> Result<Position> {
        (**self).next_start_position()
    }

    fn advance_start_position(&mut self, target: Position) -> Result<Position> {
        (**self).advance_start_position(target)
    }

    fn start_position(&self) -> Position {
        (**self).start_position()
    }

    fn end_position(&self) -> Position {
        (**self).end_position()
    }

    fn guarantees(&self) -> Guarantees {
        (**self).guarantees()
    }
}

/// Reads every remaining hit of the current document into `out`.
pub(crate) fn drain_doc<S: PositionStream + ?Sized>(
    stream: &mut S,
    out: &mut Vec<(Position, Position)>,
) -> Result<()> {
    while stream.next_start_position()? != NO_MORE_POSITIONS {
        out.push((stream.start_position(), stream.end_position()));
    }
    Ok(())
}

/// Reads every remaining hit of a stream. Intended for small results and tests.
///
/// # Errors
///
/// Propagates errors from the stream.
pub fn collect_spans<S: PositionStream + ?Sized>(stream: &mut S) -> Result<Vec<Span>> {
    let mut spans = Vec::new();
    let mut hits = Vec::new();
    let mut doc = stream.next_doc()?;
    while doc != NO_MORE_DOCS {
        hits.clear();
        drain_doc(stream, &mut hits)?;
        spans.extend(hits.iter().map(|&(start, end)| Span::new(doc, start, end)));
        doc = stream.next_doc()?;
    }
    Ok(spans)
}

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;
