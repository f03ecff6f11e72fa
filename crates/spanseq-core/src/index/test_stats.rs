//! Hand-set corpus statistics for cost and optimizer tests.

use super::IndexStats;
use crate::error::{Error, Result};
use crate::terms::MatchSensitivity;
use rustc_hash::FxHashMap;

/// Statistics with explicit term frequencies; unknown terms occur once.
pub(crate) struct FixedStats {
    pub(crate) frequencies: FxHashMap<String, u64>,
    pub(crate) unique_terms: u64,
    pub(crate) total_tokens: u64,
}

impl FixedStats {
    pub(crate) fn new(total_tokens: u64, unique_terms: u64) -> Self {
        Self {
            frequencies: FxHashMap::default(),
            unique_terms,
            total_tokens,
        }
    }

    pub(crate) fn with(mut self, term: &str, frequency: u64) -> Self {
        self.frequencies.insert(term.to_string(), frequency);
        self
    }
}

impl IndexStats for FixedStats {
    fn main_field(&self) -> &str {
        "word"
    }

    fn term_frequency(&self, field: &str, term: &str, _: MatchSensitivity) -> Result<u64> {
        if field != "word" {
            return Err(Error::UnknownField(field.to_string()));
        }
        Ok(self.frequencies.get(term).copied().unwrap_or(1))
    }

    fn unique_terms(&self, field: &str) -> Result<u64> {
        if field != "word" {
            return Err(Error::UnknownField(field.to_string()));
        }
        Ok(self.unique_terms)
    }

    fn total_tokens(&self) -> Result<u64> {
        Ok(self.total_tokens)
    }
}
