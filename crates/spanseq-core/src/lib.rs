//! # spanseq core
//!
//! Sequence matching for annotated corpus search.
//!
//! A pattern is a tree of clauses ([`ClauseNode`]) over token annotations:
//! single tokens, gaps, sequences, repetitions, expansions, alternatives,
//! negations and position filters. Hits are token spans `[start, end)` within
//! documents.
//!
//! ## Features
//!
//! - **Span algebra**: sequence joins, repetitions and n-gram expansions over
//!   per-document position streams, with static sort/uniqueness guarantees
//!   that decide where sorters are needed
//! - **Clause-combiner optimizer**: adjacent clauses of a sequence are merged
//!   pairwise by a closed set of prioritized rules
//! - **Forward-index matching**: expensive parts of a sequence are matched
//!   token by token with a two-way NFA from a cheap anchor, decided by a cost
//!   model over corpus statistics
//! - **Shards**: one optimization, parallel execution per shard (`parallel`
//!   feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use spanseq_core::query::{repetition, sequence, term, Bounds};
//! use spanseq_core::{MemoryIndex, Searcher};
//!
//! let searcher = Searcher::single(MemoryIndex::from_texts(&["A B B B"]));
//!
//! // A B{2,3}
//! let pattern = sequence(vec![
//!     term("word", "A"),
//!     repetition(term("word", "B"), Bounds::new(2, Some(3))?),
//! ]);
//! let outcome = searcher.search(&pattern)?;
//! let spans: Vec<_> = outcome.hits.iter().map(|h| (h.start, h.end)).collect();
//! assert_eq!(spans, vec![(0, 3), (0, 4)]);
//! # Ok::<(), spanseq_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Positions are i32 and document lengths u32; conversions are bounds-checked
// where lengths come from outside the index.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::use_self)]

pub mod config;
#[cfg(test)]
mod config_tests;
pub mod error;
pub mod index;
pub mod nfa;
pub mod optimize;
pub mod query;
pub mod search;
pub mod span;
pub mod stream;
pub mod terms;

pub use config::{ConfigError, OptimizerConfig, SearchConfig, SpanseqConfig};
pub use error::{Error, Result};
pub use index::{IndexSnapshot, IndexStats, MemoryIndex, MemoryIndexBuilder};
pub use optimize::{optimize, CombineStep, Combiner, Optimized};
pub use query::{Bounds, Clause, ClauseNode};
pub use search::{CancellationToken, Hit, SearchOutcome, Searcher};
pub use span::{DocId, Guarantees, Position, Span};
pub use terms::MatchSensitivity;
