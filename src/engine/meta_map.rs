use crate::graph::ValueId;
use crate::meta::ValueMeta;

/// Map used to store the inferred metadata of each value in a graph.
///
/// Entries are indexed by [`ValueId`] and each value may be written only
/// once.
#[derive(Clone, Debug, Default)]
pub struct MetaMap {
    values: Vec<Option<ValueMeta>>,
}

impl MetaMap {
    /// Create a map with space for `len` values.
    pub fn with_len(len: usize) -> Self {
        MetaMap {
            values: vec![None; len],
        }
    }

    /// Record the metadata for a value.
    ///
    /// Panics if the value already has metadata.
    pub fn insert(&mut self, id: ValueId, meta: ValueMeta) {
        let index = id.as_usize();
        if index >= self.values.len() {
            self.values.resize(index + 1, None);
        }
        let slot = &mut self.values[index];
        assert!(slot.is_none(), "value {} was produced more than once", id);
        *slot = Some(meta);
    }

    pub fn get(&self, id: ValueId) -> Option<&ValueMeta> {
        self.values.get(id.as_usize())?.as_ref()
    }

    /// Return the number of values which have metadata.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over values with metadata, in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &ValueMeta)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(index, meta)| Some((ValueId::from_u32(index as u32), meta.as_ref()?)))
    }
}
