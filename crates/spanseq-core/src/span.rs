//! Span primitives shared by streams, clauses and the optimizer.
//!
//! A hit is a half-open token interval `[start, end)` inside one document.
//! Positions are 0-based. Streams report their ordering and uniqueness
//! properties through [`Guarantees`], which are static: they describe what the
//! stream promises, and are never checked against the data.

use serde::{Deserialize, Serialize};

/// Document identifier, local to one index shard.
pub type DocId = u32;

/// Token position inside a document.
pub type Position = i32;

/// Returned by doc cursors once every document has been visited.
pub const NO_MORE_DOCS: DocId = u32::MAX;

/// Returned by position cursors once every hit in the document has been visited.
pub const NO_MORE_POSITIONS: Position = i32::MAX;

/// Position reported before the first hit of a document has been read.
pub const NOT_POSITIONED: Position = -1;

/// One match: `[start, end)` in document `doc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Document the hit belongs to.
    pub doc: DocId,
    /// First token of the hit.
    pub start: Position,
    /// One past the last token of the hit.
    pub end: Position,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(doc: DocId, start: Position, end: Position) -> Self {
        Self { doc, start, end }
    }

    /// Number of tokens covered.
    #[must_use]
    pub const fn len(&self) -> i32 {
        self.end - self.start
    }

    /// True for zero-length hits.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Static properties of the hits a stream produces within each document.
///
/// | Flag | Meaning |
/// |------|---------|
/// | `start_sorted` | hits come in `(start, end)` order |
/// | `end_sorted` | hits come in `(end, start)` order |
/// | `unique_start` | no two hits share a start |
/// | `unique_end` | no two hits share an end |
/// | `unique` | no two hits are equal |
///
/// A stream may be both start- and end-sorted, e.g. when all hits have the same
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guarantees {
    /// Hits are sorted by start, then end.
    pub start_sorted: bool,
    /// Hits are sorted by end, then start.
    pub end_sorted: bool,
    /// No two hits start at the same position.
    pub unique_start: bool,
    /// No two hits end at the same position.
    pub unique_end: bool,
    /// No duplicate hits.
    pub unique: bool,
    /// Shortest possible hit.
    pub length_min: u32,
    /// Longest possible hit, `None` if unbounded.
    pub length_max: Option<u32>,
}

impl Guarantees {
    /// Hits of exactly one token at distinct positions, in order.
    pub const SINGLE_TOKEN: Self = Self {
        start_sorted: true,
        end_sorted: true,
        unique_start: true,
        unique_end: true,
        unique: true,
        length_min: 1,
        length_max: Some(1),
    };

    /// Nothing is promised.
    #[must_use]
    pub const fn none(length_min: u32, length_max: Option<u32>) -> Self {
        Self {
            start_sorted: false,
            end_sorted: false,
            unique_start: false,
            unique_end: false,
            unique: false,
            length_min,
            length_max,
        }
    }

    /// True if every hit has the same length.
    #[must_use]
    pub fn all_same_length(&self) -> bool {
        self.length_max == Some(self.length_min)
    }

    /// Guarantees after sorting one document's hits by start.
    #[must_use]
    pub fn sorted_by_start(self, dedupe: bool) -> Self {
        Self {
            start_sorted: true,
            end_sorted: self.all_same_length(),
            unique: self.unique || dedupe,
            ..self
        }
    }

    /// Guarantees after sorting one document's hits by end.
    #[must_use]
    pub fn sorted_by_end(self, dedupe: bool) -> Self {
        Self {
            start_sorted: self.all_same_length(),
            end_sorted: true,
            unique: self.unique || dedupe,
            ..self
        }
    }
}
