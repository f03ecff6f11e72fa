//! Sequence join: hits of `left` immediately followed by hits of `right`.
//!
//! For document `d` the join produces every `(s, e2)` such that `(s, m)` is a
//! left hit and `(m, e2)` is a right hit. Left is walked in end order; right
//! hits starting at the current midpoint `m` are collected once into a bucket
//! and crossed with every left hit ending at `m`. Each input is read once per
//! document, so the cost is linear in the input plus the size of the output.
//!
//! Duplicates are not removed: `a b c` matched as `(a b)(c)` and `(a)(b c)`
//! yields `[0,3)` twice. The number of hits per document is exactly
//! `Σ_m |left ending at m| × |right starting at m|`.

use super::{ensure_end_sorted, ensure_start_sorted, BoxedStream, PerDocumentSorted, PositionStream};
use crate::error::{Error, Result};
use crate::span::{DocId, Guarantees, Position, NOT_POSITIONED, NO_MORE_DOCS, NO_MORE_POSITIONS};
use smallvec::SmallVec;

/// Raw merge join of an end-sorted left stream and a start-sorted right stream.
///
/// Output is start-sorted only when `left` is both start- and end-sorted; use
/// [`sequence_join`] for output in `(start, end)` order.
pub struct SequenceJoin {
    left: BoxedStream,
    right: BoxedStream,
    doc: DocId,
    /// Midpoint the bucket was filled for.
    bucket_mid: Position,
    /// Ends of right hits starting at `bucket_mid`.
    bucket: SmallVec<[Position; 8]>,
    bucket_next: usize,
    /// First hit of the document was already found by `sync_docs`.
    pending_first: bool,
    start: Position,
    end: Position,
}

impl SequenceJoin {
    /// Creates a join.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if `left` is not end-sorted or `right` is
    /// not start-sorted.
    pub fn new(left: BoxedStream, right: BoxedStream) -> Result<Self> {
        if !left.guarantees().end_sorted {
            return Err(Error::Internal(
                "sequence join: left stream is not end-sorted".to_string(),
            ));
        }
        if !right.guarantees().start_sorted {
            return Err(Error::Internal(
                "sequence join: right stream is not start-sorted".to_string(),
            ));
        }
        Ok(Self {
            left,
            right,
            doc: NO_MORE_DOCS,
            bucket_mid: NOT_POSITIONED,
            bucket: SmallVec::new(),
            bucket_next: 0,
            pending_first: false,
            start: NOT_POSITIONED,
            end: NOT_POSITIONED,
        })
    }

    fn reset_doc_state(&mut self) {
        self.bucket.clear();
        self.bucket_mid = NOT_POSITIONED;
        self.bucket_next = 0;
        self.start = NOT_POSITIONED;
        self.end = NOT_POSITIONED;
    }

    /// Brings both sides to the same document that has at least one joined hit.
    fn sync_docs(&mut self, mut l: DocId, mut r: DocId) -> Result<DocId> {
        loop {
            if l == NO_MORE_DOCS || r == NO_MORE_DOCS {
                self.doc = NO_MORE_DOCS;
                self.pending_first = false;
                return Ok(NO_MORE_DOCS);
            }
            if l < r {
                l = self.left.advance(r)?;
            } else if r < l {
                r = self.right.advance(l)?;
            } else {
                self.doc = l;
                self.reset_doc_state();
                if self.find_next_hit()? {
                    self.pending_first = true;
                    return Ok(l);
                }
                l = self.left.next_doc()?;
            }
        }
    }

    /// Finds the next joined hit in the current document.
    fn find_next_hit(&mut self) -> Result<bool> {
        loop {
            if let Some(&end) = self.bucket.get(self.bucket_next) {
                self.bucket_next += 1;
                self.start = self.left.start_position();
                self.end = end;
                return Ok(true);
            }

            if self.left.next_start_position()? == NO_MORE_POSITIONS {
                return Ok(false);
            }
            let mid = self.left.end_position();
            self.bucket_next = 0;
            if mid == self.bucket_mid {
                continue;
            }

            self.bucket.clear();
            self.bucket_mid = mid;
            let mut right_start = self.right.start_position();
            if right_start < mid {
                right_start = self.right.advance_start_position(mid)?;
            }
            if right_start == NO_MORE_POSITIONS {
                // Later left hits end at or after `mid`; nothing can join.
                return Ok(false);
            }
            while right_start == mid {
                self.bucket.push(self.right.end_position());
                right_start = self.right.next_start_position()?;
            }
        }
    }
}

impl PositionStream for SequenceJoin {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        let l = self.left.next_doc()?;
        let r = self.right.advance(l)?;
        self.sync_docs(l, r)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.doc != NO_MORE_DOCS && self.doc >= target {
            return Ok(self.doc);
        }
        let l = self.left.advance(target)?;
        let r = self.right.advance(l)?;
        self.sync_docs(l, r)
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
        let l = self.left.guarantees();
        let r = self.right.guarantees();
        let left_both_sorted = l.start_sorted && l.end_sorted;
        // Two left hits sharing a start but not an end interleave their joins.
        Guarantees {
            start_sorted: left_both_sorted && l.unique && l.all_same_length(),
            end_sorted: left_both_sorted && r.all_same_length(),
            unique_start: false,
            unique_end: false,
            unique: l.unique && r.unique && (l.all_same_length() || r.all_same_length()),
            length_min: l.length_min + r.length_min,
            length_max: l.length_max.zip(r.length_max).map(|(a, b)| a + b),
        }
    }
}

/// Joins `left` and `right`, inserting sorters as needed so the result comes in
/// `(start, end)` order.
///
/// # Errors
///
/// Propagates construction errors of [`SequenceJoin`].
pub fn sequence_join(left: BoxedStream, right: BoxedStream) -> Result<BoxedStream> {
    let join = SequenceJoin::new(ensure_end_sorted(left), ensure_start_sorted(right))?;
    if join.guarantees().start_sorted {
        Ok(Box::new(join))
    } else {
        Ok(Box::new(PerDocumentSorted::by_start(Box::new(join), false)))
    }
}
