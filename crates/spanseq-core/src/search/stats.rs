use crate::error::Result;
use crate::index::{IndexSnapshot, IndexStats};
use crate::terms::MatchSensitivity;
use std::sync::Arc;

/// Statistics of several shards seen as one corpus.
///
/// Frequencies and token counts are summed. Unique-term counts cannot be
/// summed without double counting, so the largest shard's count is used.
pub struct ShardSetStats<'a> {
    shards: &'a [Arc<dyn IndexSnapshot>],
}

impl<'a> ShardSetStats<'a> {
    /// Wraps `shards`.
    #[must_use]
    pub fn new(shards: &'a [Arc<dyn IndexSnapshot>]) -> Self {
        Self { shards }
    }
}

impl IndexStats for ShardSetStats<'_> {
    fn main_field(&self) -> &str {
        self.shards.first().map_or(crate::query::DEFAULT_FIELD, |s| s.main_field())
    }

    fn term_frequency(
        &self,
        field: &str,
        term: &str,
        sensitivity: MatchSensitivity,
    ) -> Result<u64> {
        self.shards.iter().try_fold(0u64, |acc, shard| {
            Ok(acc.saturating_add(shard.term_frequency(field, term, sensitivity)?))
        })
    }

    fn unique_terms(&self, field: &str) -> Result<u64> {
        self.shards.iter().try_fold(0u64, |acc, shard| {
            Ok(acc.max(shard.unique_terms(field)?))
        })
    }

    fn total_tokens(&self) -> Result<u64> {
        self.shards.iter().try_fold(0u64, |acc, shard| {
            Ok(acc.saturating_add(shard.total_tokens()?))
        })
    }
}
