//! In-memory reference index.
//!
//! Documents are token sequences with one value per field at every position.
//! By default each document gets a closing token (the empty string) appended,
//! the way a corpus index stores punctuation after the last word; hits never
//! cover it.

use super::{DocPositions, ForwardIndex, IndexSnapshot, IndexStats};
use crate::error::{Error, Result};
use crate::span::{DocId, Position};
use crate::terms::{MatchSensitivity, MemoryTerms, MemoryTermsBuilder, TermId, Terms};
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Value stored at the closing position of every document.
const CLOSING_TOKEN: &str = "";

#[derive(Debug, Default)]
struct FieldBuilder {
    terms: MemoryTermsBuilder,
    forward: Vec<Vec<TermId>>,
    postings: Vec<Vec<DocPositions>>,
}

impl FieldBuilder {
    fn add(&mut self, doc: DocId, values: &[&str], closing_token: bool) {
        let mut ids: Vec<TermId> = values.iter().map(|v| self.terms.add(v)).collect();
        if closing_token {
            ids.push(self.terms.add(CLOSING_TOKEN));
        }
        if self.postings.len() < self.terms.len() {
            self.postings.resize_with(self.terms.len(), Vec::new);
        }
        for (position, &id) in ids.iter().enumerate() {
            let list = &mut self.postings[id as usize];
            match list.last_mut() {
                Some(last) if last.doc == doc => last.positions.push(position as Position),
                _ => list.push(DocPositions {
                    doc,
                    positions: vec![position as Position],
                }),
            }
        }
        self.forward.push(ids);
    }
}

/// Builder for [`MemoryIndex`].
#[derive(Debug)]
pub struct MemoryIndexBuilder {
    field_names: Vec<String>,
    fields: Vec<FieldBuilder>,
    lengths: Vec<u32>,
    closing_token: bool,
}

impl MemoryIndexBuilder {
    /// Creates a builder for the given fields; the first one is the main field.
    #[must_use]
    pub fn new<S: AsRef<str>>(fields: &[S]) -> Self {
        Self {
            field_names: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            fields: fields.iter().map(|_| FieldBuilder::default()).collect(),
            lengths: Vec::new(),
            closing_token: true,
        }
    }

    /// Enables or disables the closing token appended to each document.
    #[must_use]
    pub fn closing_token(mut self, enabled: bool) -> Self {
        self.closing_token = enabled;
        self
    }

    /// Adds a document given one column of values per field, in field order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if the number of columns does not match the
    /// number of fields, or the columns differ in length.
    pub fn add_document(&mut self, columns: &[&[&str]]) -> Result<DocId> {
        if columns.len() != self.fields.len() {
            return Err(Error::Index(format!(
                "expected {} field columns, got {}",
                self.fields.len(),
                columns.len()
            )));
        }
        let len = columns.first().map_or(0, |c| c.len());
        if columns.iter().any(|c| c.len() != len) {
            return Err(Error::Index("field columns differ in length".to_string()));
        }

        Ok(self.push_document(columns, len))
    }

    /// Appends checked columns of `len` values each.
    fn push_document(&mut self, columns: &[&[&str]], len: usize) -> DocId {
        let doc = self.lengths.len() as DocId;
        for (field, values) in self.fields.iter_mut().zip(columns) {
            field.add(doc, values, self.closing_token);
        }
        self.lengths
            .push(len as u32 + u32::from(self.closing_token));
        doc
    }

    /// Adds a document with a single field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if the builder has more than one field.
    pub fn add_tokens(&mut self, tokens: &[&str]) -> Result<DocId> {
        self.add_document(&[tokens])
    }

    /// Freezes the index.
    #[must_use]
    pub fn build(self) -> MemoryIndex {
        let mut docs = RoaringBitmap::new();
        docs.insert_range(0..self.lengths.len() as u32);
        let closing = u64::from(self.closing_token);
        let total_tokens = self
            .lengths
            .iter()
            .map(|&l| u64::from(l).saturating_sub(closing))
            .sum();

        let fields = self
            .field_names
            .iter()
            .cloned()
            .zip(self.fields)
            .map(|(name, builder)| {
                let terms = Arc::new(builder.terms.build());
                let frequencies = builder
                    .postings
                    .iter()
                    .map(|list| list.iter().map(|p| p.positions.len() as u64).sum())
                    .collect();
                let field = MemoryField {
                    terms,
                    forward: Arc::new(MemoryForwardIndex {
                        field: name.clone(),
                        tokens: builder.forward,
                    }),
                    postings: builder.postings,
                    frequencies,
                };
                (name, field)
            })
            .collect();

        MemoryIndex {
            main_field: self.field_names.first().cloned().unwrap_or_default(),
            fields,
            lengths: self.lengths,
            docs,
            closing_token: self.closing_token,
            total_tokens,
        }
    }
}

#[derive(Debug)]
struct MemoryField {
    terms: Arc<MemoryTerms>,
    forward: Arc<MemoryForwardIndex>,
    postings: Vec<Vec<DocPositions>>,
    frequencies: Vec<u64>,
}

/// Forward index backed by per-document id vectors.
#[derive(Debug)]
pub struct MemoryForwardIndex {
    field: String,
    tokens: Vec<Vec<TermId>>,
}

impl ForwardIndex for MemoryForwardIndex {
    fn field(&self) -> &str {
        &self.field
    }

    fn term_at(&self, doc: DocId, position: Position) -> Result<TermId> {
        usize::try_from(position)
            .ok()
            .and_then(|p| self.tokens.get(doc as usize)?.get(p))
            .copied()
            .ok_or_else(|| {
                Error::Index(format!(
                    "position {position} out of range in doc {doc} of field '{}'",
                    self.field
                ))
            })
    }
}

/// In-memory corpus shard.
#[derive(Debug)]
pub struct MemoryIndex {
    main_field: String,
    fields: FxHashMap<String, MemoryField>,
    lengths: Vec<u32>,
    docs: RoaringBitmap,
    closing_token: bool,
    total_tokens: u64,
}

impl MemoryIndex {
    /// Builds a single-field (`word`) index from whitespace-separated texts.
    #[must_use]
    pub fn from_texts(texts: &[&str]) -> Self {
        let mut builder = MemoryIndexBuilder::new(&["word"]);
        for text in texts {
            let tokens: Vec<&str> = text.split_whitespace().collect();
            let column: &[&str] = &tokens;
            builder.push_document(&[column], tokens.len());
        }
        builder.build()
    }

    /// Number of documents.
    #[must_use]
    pub fn doc_count(&self) -> usize {
        self.lengths.len()
    }

    /// Names of the fields.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn field(&self, name: &str) -> Result<&MemoryField> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }
}

impl IndexStats for MemoryIndex {
    fn main_field(&self) -> &str {
        &self.main_field
    }

    fn term_frequency(
        &self,
        field: &str,
        term: &str,
        sensitivity: MatchSensitivity,
    ) -> Result<u64> {
        let field = self.field(field)?;
        Ok(field
            .terms
            .ids_of(term, sensitivity)
            .into_iter()
            .filter_map(|id| field.frequencies.get(id as usize))
            .sum())
    }

    fn unique_terms(&self, field: &str) -> Result<u64> {
        Ok(self.field(field)?.terms.number_of_terms() as u64)
    }

    fn total_tokens(&self) -> Result<u64> {
        Ok(self.total_tokens)
    }
}

impl IndexSnapshot for MemoryIndex {
    fn docs(&self) -> &RoaringBitmap {
        &self.docs
    }

    fn doc_length(&self, doc: DocId) -> Result<u32> {
        self.lengths
            .get(doc as usize)
            .copied()
            .ok_or_else(|| Error::Index(format!("document {doc} does not exist")))
    }

    fn ignore_last_token(&self) -> bool {
        self.closing_token
    }

    fn postings(
        &self,
        field: &str,
        term: &str,
        sensitivity: MatchSensitivity,
    ) -> Result<Vec<DocPositions>> {
        let field = self.field(field)?;
        let ids = field.terms.ids_of(term, sensitivity);
        if let [id] = ids.as_slice() {
            return Ok(field.postings.get(*id as usize).cloned().unwrap_or_default());
        }

        let mut merged: BTreeMap<DocId, Vec<Position>> = BTreeMap::new();
        for id in ids {
            for list in field.postings.get(id as usize).into_iter().flatten() {
                merged
                    .entry(list.doc)
                    .or_default()
                    .extend_from_slice(&list.positions);
            }
        }
        Ok(merged
            .into_iter()
            .map(|(doc, mut positions)| {
                positions.sort_unstable();
                positions.dedup();
                DocPositions { doc, positions }
            })
            .collect())
    }

    fn terms(&self, field: &str) -> Result<Arc<dyn Terms>> {
        Ok(self.field(field)?.terms.clone())
    }

    fn forward_index(&self, field: &str) -> Result<Arc<dyn ForwardIndex>> {
        Ok(self.field(field)?.forward.clone())
    }
}
