//! Corpus loading for the CLI.
//!
//! One document per line; blank lines and lines starting with `#` are
//! skipped. Tokens are separated by whitespace and carry one annotation per
//! field, separated by `/` (`cats/cat/NOUN` for fields `word,lemma,pos`).
//! Only the last separators split, so a word may itself contain `/`.

use anyhow::{bail, Context, Result};
use spanseq_core::{IndexSnapshot, MemoryIndexBuilder};
use std::path::Path;
use std::sync::Arc;

/// Loaded corpus, split into shards.
pub struct Corpus {
    /// One index per shard.
    pub shards: Vec<Arc<dyn IndexSnapshot>>,
    /// Words of every document, by shard then document.
    pub words: Vec<Vec<Vec<String>>>,
}

impl Corpus {
    /// Words `start..end` of a document, space separated.
    pub fn text(&self, shard: usize, doc: u32, start: i32, end: i32) -> String {
        let Some(words) = self
            .words
            .get(shard)
            .and_then(|docs| docs.get(doc as usize))
        else {
            return String::new();
        };
        let start = usize::try_from(start).unwrap_or(0).min(words.len());
        let end = usize::try_from(end).unwrap_or(0).clamp(start, words.len());
        words[start..end].join(" ")
    }

    /// Number of documents over all shards.
    pub fn doc_count(&self) -> usize {
        self.words.iter().map(Vec::len).sum()
    }
}

/// Splits a token into one annotation per field.
pub fn split_token<'t>(token: &'t str, fields: usize) -> Option<Vec<&'t str>> {
    let mut parts: Vec<&str> = token.rsplitn(fields, '/').collect();
    if parts.len() != fields || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    parts.reverse();
    Some(parts)
}

/// Parses corpus text into `shards` shards, assigning documents round-robin.
pub fn parse_corpus(text: &str, fields: &[String], shards: usize) -> Result<Corpus> {
    if fields.is_empty() {
        bail!("at least one field is required");
    }
    if shards == 0 {
        bail!("shard count must be at least 1");
    }

    let mut builders: Vec<MemoryIndexBuilder> =
        (0..shards).map(|_| MemoryIndexBuilder::new(fields)).collect();
    let mut words: Vec<Vec<Vec<String>>> = vec![Vec::new(); shards];
    let mut doc = 0usize;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut columns: Vec<Vec<&str>> = vec![Vec::new(); fields.len()];
        for token in line.split_whitespace() {
            let Some(annotations) = split_token(token, fields.len()) else {
                bail!(
                    "line {}: token '{}' does not have {} annotation(s) separated by '/'",
                    line_no + 1,
                    token,
                    fields.len()
                );
            };
            for (column, value) in columns.iter_mut().zip(annotations) {
                column.push(value);
            }
        }

        let shard = doc % shards;
        let refs: Vec<&[&str]> = columns.iter().map(Vec::as_slice).collect();
        builders[shard]
            .add_document(&refs)
            .with_context(|| format!("line {}", line_no + 1))?;
        words[shard].push(columns[0].iter().map(|w| (*w).to_string()).collect());
        doc += 1;
    }

    Ok(Corpus {
        shards: builders
            .into_iter()
            .map(|b| Arc::new(b.build()) as Arc<dyn IndexSnapshot>)
            .collect(),
        words,
    })
}

/// Reads and parses a corpus file.
pub fn load_corpus(path: &Path, fields: &[String], shards: usize) -> Result<Corpus> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus {}", path.display()))?;
    let corpus = parse_corpus(&text, fields, shards)?;
    tracing::debug!(
        path = %path.display(),
        docs = corpus.doc_count(),
        shards,
        "corpus loaded"
    );
    Ok(corpus)
}
