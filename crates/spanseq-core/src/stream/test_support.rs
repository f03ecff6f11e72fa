//! Literal streams for operator tests.

use super::buffered::{BufferedStream, HitProducer};
use super::{BoxedStream, PositionStream};
use crate::error::Result;
use crate::span::{DocId, Guarantees, Position, Span, NO_MORE_DOCS};

/// Replays fixed hits, in the given order, with declared guarantees.
pub(crate) struct VecProducer {
    docs: Vec<(DocId, Vec<(Position, Position)>)>,
    next: usize,
    guarantees: Guarantees,
}

impl HitProducer for VecProducer {
    fn fill(&mut self, target: Option<DocId>, out: &mut Vec<(Position, Position)>) -> Result<DocId> {
        while let Some((doc, hits)) = self.docs.get(self.next) {
            self.next += 1;
            if hits.is_empty() || target.is_some_and(|t| *doc < t) {
                continue;
            }
            out.extend_from_slice(hits);
            return Ok(*doc);
        }
        Ok(NO_MORE_DOCS)
    }

    fn guarantees(&self) -> Guarantees {
        self.guarantees
    }
}

/// Stream over `hits` (doc, start, end), grouped by document in order of
/// first appearance. Hits inside a document keep their order.
pub(crate) fn vec_stream(hits: &[(DocId, Position, Position)], guarantees: Guarantees) -> BoxedStream {
    let mut docs: Vec<(DocId, Vec<(Position, Position)>)> = Vec::new();
    for &(doc, start, end) in hits {
        match docs.last_mut() {
            Some((last, list)) if *last == doc => list.push((start, end)),
            _ => docs.push((doc, vec![(start, end)])),
        }
    }
    Box::new(BufferedStream::new(VecProducer {
        docs,
        next: 0,
        guarantees,
    }))
}

/// Stream over hits of document 0.
pub(crate) fn doc0(hits: &[(Position, Position)], guarantees: Guarantees) -> BoxedStream {
    let hits: Vec<_> = hits.iter().map(|&(s, e)| (0, s, e)).collect();
    vec_stream(&hits, guarantees)
}

/// Guarantees of a start-sorted, unique stream of hits between `min` and
/// `max` tokens long.
pub(crate) fn start_sorted(min: u32, max: Option<u32>) -> Guarantees {
    Guarantees {
        start_sorted: true,
        end_sorted: max == Some(min),
        unique_start: false,
        unique_end: false,
        unique: true,
        length_min: min,
        length_max: max,
    }
}

/// Drains `stream` as `(doc, start, end)` triples.
pub(crate) fn triples<S: PositionStream + ?Sized>(stream: &mut S) -> Vec<(DocId, Position, Position)> {
    super::collect_spans(stream)
        .expect("stream failed")
        .into_iter()
        .map(|Span { doc, start, end }| (doc, start, end))
        .collect()
}

/// Drains the hits of document 0 of `stream`.
pub(crate) fn pairs<S: PositionStream + ?Sized>(stream: &mut S) -> Vec<(Position, Position)> {
    triples(stream)
        .into_iter()
        .map(|(doc, s, e)| {
            assert_eq!(doc, 0, "unexpected document");
            (s, e)
        })
        .collect()
}
