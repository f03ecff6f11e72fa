//! Index collaborators consumed by the matching core.
//!
//! The core never reads storage formats directly. It sees a shard of the corpus
//! through [`IndexSnapshot`]: term statistics for the cost model, postings for
//! reverse-index matching, and [`ForwardIndex`] readers for NFA matching. All
//! fields of a document share one token position space.
//!
//! [`MemoryIndex`] is a complete in-memory implementation used by tests,
//! benchmarks and the command-line tool.

mod memory;

pub use memory::{MemoryIndex, MemoryIndexBuilder};

use crate::error::Result;
use crate::span::{DocId, Position};
use crate::terms::{MatchSensitivity, TermId, Terms};
use roaring::RoaringBitmap;
use std::sync::Arc;

/// Positions of one term (or folded term group) in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPositions {
    /// Document id.
    pub doc: DocId,
    /// Ascending, distinct positions.
    pub positions: Vec<Position>,
}

/// Corpus statistics used by the cost model.
///
/// Optimization is a pure function of these numbers and the clause tree.
pub trait IndexStats: Send + Sync {
    /// Field used when a clause does not name one (e.g. `[]`).
    fn main_field(&self) -> &str;

    /// Number of occurrences of `term` under `sensitivity`.
    fn term_frequency(&self, field: &str, term: &str, sensitivity: MatchSensitivity)
        -> Result<u64>;

    /// Number of distinct terms in `field`.
    fn unique_terms(&self, field: &str) -> Result<u64>;

    /// Number of token positions in the corpus.
    fn total_tokens(&self) -> Result<u64>;
}

/// One shard of the corpus.
pub trait IndexSnapshot: IndexStats {
    /// Documents in this shard.
    fn docs(&self) -> &RoaringBitmap;

    /// Length of `doc` in tokens, including the closing token if the index
    /// stores one.
    fn doc_length(&self, doc: DocId) -> Result<u32>;

    /// True if every document ends with a synthetic closing token that hits
    /// must never cover.
    fn ignore_last_token(&self) -> bool;

    /// Postings of `term` in `field`, sorted by document.
    fn postings(
        &self,
        field: &str,
        term: &str,
        sensitivity: MatchSensitivity,
    ) -> Result<Vec<DocPositions>>;

    /// Term table of `field`.
    fn terms(&self, field: &str) -> Result<Arc<dyn Terms>>;

    /// Forward index of `field`.
    fn forward_index(&self, field: &str) -> Result<Arc<dyn ForwardIndex>>;

    /// Length of `doc` minus the closing token, if any.
    fn effective_length(&self, doc: DocId) -> Result<Position> {
        let len = self.doc_length(doc)? as Position;
        Ok(if self.ignore_last_token() { (len - 1).max(0) } else { len })
    }
}

/// Position → term id lookup for one field.
pub trait ForwardIndex: Send + Sync {
    /// Name of the field.
    fn field(&self) -> &str;

    /// Term id at `position` of `doc`.
    fn term_at(&self, doc: DocId, position: Position) -> Result<TermId>;

    /// Term ids of `doc` in `[start, end)`.
    fn terms_between(&self, doc: DocId, start: Position, end: Position) -> Result<Vec<TermId>> {
        (start..end).map(|p| self.term_at(doc, p)).collect()
    }
}

#[cfg(test)]
pub(crate) mod test_stats;
