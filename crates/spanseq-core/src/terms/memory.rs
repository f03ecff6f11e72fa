use super::{MatchSensitivity, SortPosition, TermId, Terms, NO_TERM};
use rustc_hash::FxHashMap;

/// Per-sensitivity lookup tables.
#[derive(Debug, Default)]
struct SensitivityTable {
    sort_positions: Vec<SortPosition>,
    by_folded: FxHashMap<String, Vec<TermId>>,
}

/// In-memory term table with precomputed sort positions.
#[derive(Debug)]
pub struct MemoryTerms {
    strings: Vec<String>,
    ids: FxHashMap<String, TermId>,
    tables: [SensitivityTable; 4],
}

impl MemoryTerms {
    /// Builds a table; ids follow the order of `strings`. Duplicates keep their
    /// first id.
    #[must_use]
    pub fn from_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = MemoryTermsBuilder::default();
        for s in strings {
            builder.add(&s.into());
        }
        builder.build()
    }

    fn table(&self, sensitivity: MatchSensitivity) -> &SensitivityTable {
        &self.tables[sensitivity.slot()]
    }
}

impl Terms for MemoryTerms {
    fn number_of_terms(&self) -> usize {
        self.strings.len()
    }

    fn index_of(&self, term: &str) -> TermId {
        self.ids.get(term).copied().unwrap_or(NO_TERM)
    }

    fn get(&self, id: TermId) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
    }

    fn ids_of(&self, term: &str, sensitivity: MatchSensitivity) -> Vec<TermId> {
        if sensitivity == MatchSensitivity::Sensitive {
            let id = self.index_of(term);
            return if id == NO_TERM { Vec::new() } else { vec![id] };
        }
        self.table(sensitivity)
            .by_folded
            .get(sensitivity.fold(term).as_ref())
            .cloned()
            .unwrap_or_default()
    }

    fn id_to_sort_position(&self, id: TermId, sensitivity: MatchSensitivity) -> SortPosition {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.table(sensitivity).sort_positions.get(i))
            .copied()
            .unwrap_or(NO_TERM)
    }
}

/// Incremental builder for [`MemoryTerms`], used while indexing.
#[derive(Debug, Default)]
pub struct MemoryTermsBuilder {
    strings: Vec<String>,
    ids: FxHashMap<String, TermId>,
}

impl MemoryTermsBuilder {
    /// Returns the id of `term`, assigning the next free id if it is new.
    pub fn add(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        let id = self.strings.len() as TermId;
        self.strings.push(term.to_string());
        self.ids.insert(term.to_string(), id);
        id
    }

    /// Number of terms added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True if no term was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Freezes the table and computes the per-sensitivity sort orders.
    #[must_use]
    pub fn build(self) -> MemoryTerms {
        let tables = MatchSensitivity::ALL.map(|sensitivity| sensitivity_table(&self.strings, sensitivity));
        MemoryTerms {
            strings: self.strings,
            ids: self.ids,
            tables,
        }
    }
}

fn sensitivity_table(strings: &[String], sensitivity: MatchSensitivity) -> SensitivityTable {
    let folded: Vec<String> = strings
        .iter()
        .map(|s| sensitivity.fold(s).into_owned())
        .collect();

    let mut order: Vec<usize> = (0..strings.len()).collect();
    order.sort_by(|&a, &b| folded[a].cmp(&folded[b]).then(a.cmp(&b)));

    let mut sort_positions = vec![0; strings.len()];
    let mut rank: SortPosition = -1;
    let mut previous: Option<&str> = None;
    for &i in &order {
        if previous != Some(folded[i].as_str()) {
            rank += 1;
            previous = Some(folded[i].as_str());
        }
        sort_positions[i] = rank;
    }

    let mut by_folded: FxHashMap<String, Vec<TermId>> = FxHashMap::default();
    for (i, f) in folded.into_iter().enumerate() {
        by_folded.entry(f).or_default().push(i as TermId);
    }

    SensitivityTable {
        sort_positions,
        by_folded,
    }
}
