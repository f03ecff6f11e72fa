//! Query execution over one or more shards.
//!
//! A pattern is optimized once against the combined statistics of all shards
//! ([`ShardSetStats`]), then the optimized tree is instantiated as a stream
//! tree per shard ([`ShardPlanner`]) and drained. Shards run in parallel when
//! the `parallel` feature is enabled and [`SearchConfig::parallel_shards`] is
//! set.
//!
//! # Example
//!
//! ```rust
//! use spanseq_core::query::{any_token, sequence, term, Bounds};
//! use spanseq_core::{MemoryIndex, Searcher};
//!
//! let searcher = Searcher::single(MemoryIndex::from_texts(&["the quick brown fox"]));
//! let pattern = sequence(vec![
//!     term("word", "the"),
//!     any_token(Bounds::exactly(1)),
//!     term("word", "brown"),
//! ]);
//! let outcome = searcher.search(&pattern)?;
//! assert_eq!(outcome.hits.len(), 1);
//! assert_eq!((outcome.hits[0].start, outcome.hits[0].end), (0, 3));
//! # Ok::<(), spanseq_core::Error>(())
//! ```

mod guard;
mod plan;
mod stats;

pub use guard::{CancellationToken, QueryGuard};
pub use plan::ShardPlanner;
pub use stats::ShardSetStats;

use crate::config::{global_optimizer_config, OptimizerConfig, SearchConfig};
use crate::error::Result;
use crate::index::IndexSnapshot;
use crate::optimize::{optimize, CombineStep, Optimized};
use crate::query::Clause;
use crate::span::{DocId, Position, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::stream::PositionStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// One hit of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hit {
    /// Index of the shard in the searcher.
    pub shard: usize,
    /// Document within the shard.
    pub doc: DocId,
    /// First token, inclusive.
    pub start: Position,
    /// Last token, exclusive.
    pub end: Position,
}

/// Result of [`Searcher::search`].
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Hits ordered by shard, document, start and end.
    pub hits: Vec<Hit>,
    /// Tree that was executed.
    pub optimized: Clause,
    /// Combines the optimizer applied.
    pub steps: Vec<CombineStep>,
    /// True if the hit limit cut the result short.
    pub truncated: bool,
    /// Wall time of the search in milliseconds.
    pub elapsed_ms: u64,
}

#[derive(Debug, Default)]
struct ShardResult {
    hits: Vec<Hit>,
    docs: usize,
    automata: usize,
}

/// Runs patterns over a fixed set of shards.
pub struct Searcher {
    shards: Vec<Arc<dyn IndexSnapshot>>,
    optimizer: OptimizerConfig,
    config: SearchConfig,
}

impl Searcher {
    /// Creates a searcher using the process-wide optimizer configuration.
    #[must_use]
    pub fn new(shards: Vec<Arc<dyn IndexSnapshot>>) -> Self {
        Self {
            shards,
            optimizer: global_optimizer_config().as_ref().clone(),
            config: SearchConfig::default(),
        }
    }

    /// Creates a searcher over a single shard.
    #[must_use]
    pub fn single<I: IndexSnapshot + 'static>(index: I) -> Self {
        Self::new(vec![Arc::new(index)])
    }

    /// Replaces the optimizer configuration.
    #[must_use]
    pub fn with_optimizer_config(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Replaces the execution settings.
    #[must_use]
    pub fn with_search_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Shards searched.
    #[must_use]
    pub fn shards(&self) -> &[Arc<dyn IndexSnapshot>] {
        &self.shards
    }

    /// Optimizer configuration in use.
    #[must_use]
    pub fn optimizer_config(&self) -> &OptimizerConfig {
        &self.optimizer
    }

    /// Rewrites and optimizes `clause` against the statistics of all shards.
    ///
    /// # Errors
    ///
    /// See [`optimize`].
    pub fn optimize(&self, clause: &Clause) -> Result<Optimized> {
        let stats = ShardSetStats::new(&self.shards);
        optimize(clause, &self.optimizer, &stats)
    }

    /// Searches every shard for `clause`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`](crate::Error::Cancelled) on timeout and
    /// propagates optimizer, planning and index errors.
    pub fn search(&self, clause: &Clause) -> Result<SearchOutcome> {
        self.search_with_token(clause, &CancellationToken::new())
    }

    /// Like [`search`](Self::search), stopping early once `token` is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// See [`search`](Self::search).
    pub fn search_with_token(
        &self,
        clause: &Clause,
        token: &CancellationToken,
    ) -> Result<SearchOutcome> {
        let guard = QueryGuard::from_config(&self.config, token.clone());
        let Optimized { clause: optimized, steps } = self.optimize(clause)?;
        debug!(pattern = %clause, optimized = %optimized, combines = steps.len(), "optimized pattern");

        let results = self.run_shards(&optimized, &guard)?;

        let mut hits = Vec::new();
        let mut docs = 0;
        let mut automata = 0;
        for result in results {
            docs += result.docs;
            automata += result.automata;
            hits.extend(result.hits);
        }
        let truncated = guard.truncated();
        let elapsed_ms = u64::try_from(guard.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            shards = self.shards.len(),
            docs,
            hits = hits.len(),
            automata,
            truncated,
            elapsed_ms,
            "search finished"
        );

        Ok(SearchOutcome {
            hits,
            optimized,
            steps,
            truncated,
            elapsed_ms,
        })
    }

    #[cfg(feature = "parallel")]
    fn run_shards(&self, clause: &Clause, guard: &QueryGuard) -> Result<Vec<ShardResult>> {
        use rayon::prelude::*;

        if self.config.parallel_shards && self.shards.len() > 1 {
            return self
                .shards
                .par_iter()
                .enumerate()
                .map(|(i, shard)| search_shard(i, shard, clause, guard))
                .collect();
        }
        self.run_sequential(clause, guard)
    }

    #[cfg(not(feature = "parallel"))]
    fn run_shards(&self, clause: &Clause, guard: &QueryGuard) -> Result<Vec<ShardResult>> {
        self.run_sequential(clause, guard)
    }

    fn run_sequential(&self, clause: &Clause, guard: &QueryGuard) -> Result<Vec<ShardResult>> {
        self.shards
            .iter()
            .enumerate()
            .map(|(i, shard)| search_shard(i, shard, clause, guard))
            .collect()
    }
}

/// Drains the hits of `clause` in one shard. Zero-length hits are dropped.
fn search_shard(
    shard: usize,
    index: &Arc<dyn IndexSnapshot>,
    clause: &Clause,
    guard: &QueryGuard,
) -> Result<ShardResult> {
    let mut planner = ShardPlanner::new(Arc::clone(index));
    let mut stream = planner.top_level(clause)?;
    let mut result = ShardResult::default();
    let mut doc_hits = Vec::new();

    let mut doc = stream.next_doc()?;
    while doc != NO_MORE_DOCS {
        guard.check()?;
        result.docs += 1;

        doc_hits.clear();
        while stream.next_start_position()? != NO_MORE_POSITIONS {
            let (start, end) = (stream.start_position(), stream.end_position());
            if end > start {
                doc_hits.push(Hit {
                    shard,
                    doc,
                    start,
                    end,
                });
            }
        }
        let keep = guard.reserve_hits(doc_hits.len());
        result.hits.extend(doc_hits.drain(..keep));
        if guard.hits_exhausted() {
            if stream.next_doc()? != NO_MORE_DOCS {
                guard.mark_truncated();
            }
            break;
        }

        doc = stream.next_doc()?;
    }

    result.automata = planner.automata();
    Ok(result)
}
