//! Term tables: string ↔ id mapping and sensitivity-aware ordering.
//!
//! Every field (annotation) has its own id space. Ids are dense, starting at 0;
//! [`NO_TERM`] marks "no such term". A [`MatchSensitivity`] decides which
//! differences between two strings matter: under a folding sensitivity, one
//! string may map to several ids and several ids may share one sort position.

mod memory;

pub use memory::{MemoryTerms, MemoryTermsBuilder};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Term identifier inside one field.
pub type TermId = i32;

/// Rank of a term under a sensitivity.
pub type SortPosition = i32;

/// Sentinel for "no term".
pub const NO_TERM: TermId = -1;

/// How strictly token strings are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSensitivity {
    /// Case and diacritics matter.
    Sensitive,
    /// Neither case nor diacritics matter.
    #[default]
    Insensitive,
    /// Case does not matter, diacritics do.
    CaseInsensitive,
    /// Diacritics do not matter, case does.
    DiacriticsInsensitive,
}

impl MatchSensitivity {
    /// All sensitivities, in table order.
    pub const ALL: [Self; 4] = [
        Self::Sensitive,
        Self::Insensitive,
        Self::CaseInsensitive,
        Self::DiacriticsInsensitive,
    ];

    /// True if upper and lower case are distinguished.
    #[must_use]
    pub const fn is_case_sensitive(self) -> bool {
        matches!(self, Self::Sensitive | Self::DiacriticsInsensitive)
    }

    /// True if accented and unaccented letters are distinguished.
    #[must_use]
    pub const fn is_diacritics_sensitive(self) -> bool {
        matches!(self, Self::Sensitive | Self::CaseInsensitive)
    }

    /// Index into per-sensitivity tables.
    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            Self::Sensitive => 0,
            Self::Insensitive => 1,
            Self::CaseInsensitive => 2,
            Self::DiacriticsInsensitive => 3,
        }
    }

    /// Folds `term` so that strings equal under this sensitivity fold identically.
    #[must_use]
    pub fn fold(self, term: &str) -> Cow<'_, str> {
        match self {
            Self::Sensitive => Cow::Borrowed(term),
            Self::CaseInsensitive => Cow::Owned(term.to_lowercase()),
            Self::DiacriticsInsensitive => Cow::Owned(strip_diacritics(term)),
            Self::Insensitive => Cow::Owned(strip_diacritics(&term.to_lowercase())),
        }
    }
}

/// Removes combining marks after canonical decomposition ("café" → "cafe").
#[must_use]
pub fn strip_diacritics(term: &str) -> String {
    term.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// String ↔ id mapping for one field.
pub trait Terms: Send + Sync {
    /// Number of distinct (sensitive) terms.
    fn number_of_terms(&self) -> usize;

    /// Exact id of `term`, or [`NO_TERM`].
    fn index_of(&self, term: &str) -> TermId;

    /// String for `id`.
    fn get(&self, id: TermId) -> Option<&str>;

    /// All ids whose string equals `term` under `sensitivity`, ascending.
    fn ids_of(&self, term: &str, sensitivity: MatchSensitivity) -> Vec<TermId>;

    /// Rank of `id` under `sensitivity`. Equal-folding terms share a rank;
    /// [`NO_TERM`] ranks before everything.
    fn id_to_sort_position(&self, id: TermId, sensitivity: MatchSensitivity) -> SortPosition;

    /// Compares two ids under `sensitivity`.
    fn compare_sort_position(
        &self,
        a: TermId,
        b: TermId,
        sensitivity: MatchSensitivity,
    ) -> Ordering {
        self.id_to_sort_position(a, sensitivity)
            .cmp(&self.id_to_sort_position(b, sensitivity))
    }

    /// True if both id sequences spell the same strings under `sensitivity`.
    fn terms_equal(&self, a: &[TermId], b: &[TermId], sensitivity: MatchSensitivity) -> bool {
        a.len() == b.len()
            && a.iter().zip(b).all(|(&x, &y)| {
                x == y || self.compare_sort_position(x, y, sensitivity) == Ordering::Equal
            })
    }
}

/// A [`Terms`] table viewed under one fixed sensitivity.
#[derive(Clone, Copy)]
pub struct TermsSensitivity<'a> {
    terms: &'a dyn Terms,
    sensitivity: MatchSensitivity,
}

impl<'a> TermsSensitivity<'a> {
    /// Creates a view.
    #[must_use]
    pub fn new(terms: &'a dyn Terms, sensitivity: MatchSensitivity) -> Self {
        Self { terms, sensitivity }
    }

    /// Sensitivity of this view.
    #[must_use]
    pub const fn sensitivity(&self) -> MatchSensitivity {
        self.sensitivity
    }

    /// Ids matching `term` under this view.
    #[must_use]
    pub fn ids_of(&self, term: &str) -> Vec<TermId> {
        self.terms.ids_of(term, self.sensitivity)
    }

    /// Sort position of `id` under this view.
    #[must_use]
    pub fn sort_position(&self, id: TermId) -> SortPosition {
        self.terms.id_to_sort_position(id, self.sensitivity)
    }

    /// Compares two ids.
    #[must_use]
    pub fn compare(&self, a: TermId, b: TermId) -> Ordering {
        self.terms.compare_sort_position(a, b, self.sensitivity)
    }

    /// True if `a` and `b` are equal under this view.
    #[must_use]
    pub fn equal(&self, a: TermId, b: TermId) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

impl std::fmt::Debug for TermsSensitivity<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermsSensitivity")
            .field("terms", &self.terms.number_of_terms())
            .field("sensitivity", &self.sensitivity)
            .finish()
    }
}

#[cfg(test)]
mod tests;
