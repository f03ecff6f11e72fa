use crate::error::Result;
use crate::index::{ForwardIndex, IndexSnapshot};
use crate::terms::Terms;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Forward index and term table of one field.
pub struct FieldHandle {
    name: String,
    forward: Arc<dyn ForwardIndex>,
    terms: Arc<dyn Terms>,
}

impl FieldHandle {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position → term id lookup.
    #[must_use]
    pub fn forward(&self) -> &dyn ForwardIndex {
        self.forward.as_ref()
    }

    /// Term table.
    #[must_use]
    pub fn terms(&self) -> &dyn Terms {
        self.terms.as_ref()
    }
}

impl fmt::Debug for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHandle")
            .field("name", &self.name)
            .field("terms", &self.terms.number_of_terms())
            .finish()
    }
}

/// Per-execution cache of forward-index readers, one per field.
///
/// Shared by every NFA compiled for one shard; dropped with the execution.
pub struct ForwardIndexAccessor {
    index: Arc<dyn IndexSnapshot>,
    fields: RwLock<FxHashMap<String, Arc<FieldHandle>>>,
}

impl ForwardIndexAccessor {
    /// Creates an accessor over `index`.
    #[must_use]
    pub fn new(index: Arc<dyn IndexSnapshot>) -> Self {
        Self {
            index,
            fields: RwLock::new(FxHashMap::default()),
        }
    }

    /// Shard the accessor reads from.
    #[must_use]
    pub fn index(&self) -> &Arc<dyn IndexSnapshot> {
        &self.index
    }

    /// Reader for `field`, opened on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`](crate::Error::UnknownField) if the
    /// index has no such field.
    pub fn field(&self, name: &str) -> Result<Arc<FieldHandle>> {
        if let Some(handle) = self.fields.read().get(name) {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(FieldHandle {
            name: name.to_string(),
            forward: self.index.forward_index(name)?,
            terms: self.index.terms(name)?,
        });
        let mut fields = self.fields.write();
        Ok(Arc::clone(
            fields.entry(name.to_string()).or_insert(handle),
        ))
    }

    /// Number of fields opened so far.
    #[must_use]
    pub fn open_fields(&self) -> usize {
        self.fields.read().len()
    }
}

impl fmt::Debug for ForwardIndexAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardIndexAccessor")
            .field("open_fields", &self.open_fields())
            .finish()
    }
}
