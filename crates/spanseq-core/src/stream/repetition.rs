//! Repetition: chains of `min..=max` abutting hits of a base stream.

use super::buffered::{step_doc, BufferedStream, HitProducer};
use super::{drain_doc, BoxedStream};
use crate::error::{Error, Result};
use crate::span::{DocId, Guarantees, Position, NO_MORE_DOCS};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Enumerates every `[s, e)` covered by `k` consecutive base hits, where hit
/// `i + 1` starts where hit `i` ends and `min <= k <= max`.
///
/// Output per document is sorted and unique. Zero-length base hits never
/// extend a chain.
pub struct RepetitionStream {
    base: BoxedStream,
    min: u32,
    max: Option<u32>,
    base_hits: Vec<(Position, Position)>,
}

impl RepetitionStream {
    /// Creates a repetition stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if `base` is not start-sorted and unique,
    /// or `min` is 0; and [`Error::InvalidBounds`] if `min > max`.
    pub fn new(base: BoxedStream, min: u32, max: Option<u32>) -> Result<BufferedStream<Self>> {
        let g = base.guarantees();
        if !(g.start_sorted && g.unique) {
            return Err(Error::Internal(
                "repetition: base stream must be start-sorted and unique".to_string(),
            ));
        }
        if min == 0 {
            return Err(Error::Internal(
                "repetition: empty matches must be rewritten away before execution".to_string(),
            ));
        }
        if let Some(max) = max {
            if min > max {
                return Err(Error::InvalidBounds { min, max });
            }
        }
        Ok(BufferedStream::new(Self {
            base,
            min,
            max,
            base_hits: Vec::new(),
        }))
    }

    fn expand_doc(&self, out: &mut Vec<(Position, Position)>) {
        let mut ends_by_start: FxHashMap<Position, Vec<Position>> = FxHashMap::default();
        for &(start, end) in &self.base_hits {
            if end > start {
                ends_by_start.entry(start).or_default().push(end);
            }
        }

        let mut starts: Vec<Position> = ends_by_start.keys().copied().collect();
        starts.sort_unstable();

        for start in starts {
            let mut reached: BTreeSet<Position> = BTreeSet::new();
            let mut frontier: BTreeSet<Position> = BTreeSet::from([start]);
            let mut k = 0u32;
            while !frontier.is_empty() && self.max.map_or(true, |max| k < max) {
                k += 1;
                frontier = frontier
                    .iter()
                    .filter_map(|p| ends_by_start.get(p))
                    .flatten()
                    .copied()
                    .collect();
                if k >= self.min {
                    reached.extend(frontier.iter().copied());
                }
            }
            out.extend(reached.into_iter().map(|end| (start, end)));
        }
    }
}

impl HitProducer for RepetitionStream {
    fn fill(&mut self, target: Option<DocId>, out: &mut Vec<(Position, Position)>) -> Result<DocId> {
        let mut target = target;
        loop {
            let doc = step_doc(&mut self.base, target.take())?;
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            self.base_hits.clear();
            drain_doc(&mut self.base, &mut self.base_hits)?;
            self.expand_doc(out);
            if !out.is_empty() {
                return Ok(doc);
            }
        }
    }

    fn guarantees(&self) -> Guarantees {
        let g = self.base.guarantees();
        let fixed = g.all_same_length() && self.max == Some(self.min);
        Guarantees {
            start_sorted: true,
            end_sorted: fixed,
            unique_start: false,
            unique_end: false,
            unique: true,
            length_min: g.length_min.saturating_mul(self.min),
            length_max: g
                .length_max
                .zip(self.max)
                .map(|(len, max)| len.saturating_mul(max)),
        }
    }
}
