use super::buffered::{BufferedStream, HitProducer};
use super::{drain_doc, BoxedStream, PositionStream};
use crate::error::Result;
use crate::span::{DocId, Guarantees, Position, NO_MORE_DOCS};

/// Sorted, duplicate-free union of several streams.
pub struct OrStream {
    clauses: Vec<BoxedStream>,
    docs: Vec<DocId>,
    started: bool,
    current: Option<DocId>,
}

impl OrStream {
    /// Creates the union of `clauses`. An empty list matches nothing.
    #[must_use]
    pub fn new(clauses: Vec<BoxedStream>) -> BufferedStream<Self> {
        let docs = vec![NO_MORE_DOCS; clauses.len()];
        BufferedStream::new(Self {
            clauses,
            docs,
            started: false,
            current: None,
        })
    }
}

impl HitProducer for OrStream {
    fn fill(&mut self, target: Option<DocId>, out: &mut Vec<(Position, Position)>) -> Result<DocId> {
        for (clause, doc) in self.clauses.iter_mut().zip(self.docs.iter_mut()) {
            if !self.started {
                *doc = match target {
                    Some(t) => clause.advance(t)?,
                    None => clause.next_doc()?,
                };
                continue;
            }
            if Some(*doc) == self.current {
                *doc = clause.next_doc()?;
            }
            if let Some(t) = target {
                if *doc < t {
                    *doc = clause.advance(t)?;
                }
            }
        }
        self.started = true;

        let doc = self.docs.iter().copied().min().unwrap_or(NO_MORE_DOCS);
        self.current = Some(doc);
        if doc == NO_MORE_DOCS {
            return Ok(doc);
        }
        for (clause, _) in self
            .clauses
            .iter_mut()
            .zip(&self.docs)
            .filter(|(_, d)| **d == doc)
        {
            drain_doc(clause, out)?;
        }
        out.sort_unstable();
        out.dedup();
        Ok(doc)
    }

    fn guarantees(&self) -> Guarantees {
        let all: Vec<Guarantees> = self.clauses.iter().map(|c| c.guarantees()).collect();
        let length_min = all.iter().map(|g| g.length_min).min().unwrap_or(0);
        let length_max = all
            .iter()
            .map(|g| g.length_max)
            .try_fold(0u32, |acc, m| m.map(|m| acc.max(m)));
        let fixed = length_max == Some(length_min);
        Guarantees {
            start_sorted: true,
            end_sorted: fixed,
            unique_start: false,
            unique_end: false,
            unique: true,
            length_min,
            length_max,
        }
    }
}
