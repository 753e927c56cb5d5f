use std::num::NonZero;

/// Handle for a value in a [`Graph`](crate::Graph).
///
/// Value IDs are assigned by the graph that owns the value, in creation order,
/// so they can be used directly as indices into per-run metadata tables. IDs
/// from one graph are meaningless in another graph, including in a graph's
/// nested sub-graphs.
#[derive(Copy, Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ValueId(NonZero<u32>);

impl ValueId {
    /// Return the underlying index of the value.
    pub fn as_u32(self) -> u32 {
        self.0.get() - 1
    }

    /// Return the index as a usize, for slice indexing.
    pub fn as_usize(self) -> usize {
        self.as_u32() as usize
    }

    /// Construct a value ID from an index.
    ///
    /// Panics if the index is `u32::MAX`.
    pub fn from_u32(index: u32) -> ValueId {
        // Indices are stored offset by one so that zero is available as a
        // niche and `Option<ValueId>` is the same size as `ValueId`.
        let raw = index.checked_add(1).expect("value index overflow");
        ValueId(NonZero::new(raw).expect("offset index is non-zero"))
    }
}

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

impl std::fmt::Debug for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueId({})", self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::ValueId;

    #[test]
    fn test_value_id() {
        let id = ValueId::from_u32(0);
        assert_eq!(id.as_u32(), 0);
        assert_eq!(id.as_usize(), 0);
        assert_eq!(format!("{:?}", ValueId::from_u32(7)), "ValueId(7)");
        assert_eq!(ValueId::from_u32(7).to_string(), "7");
        assert_eq!(
            std::mem::size_of::<Option<ValueId>>(),
            std::mem::size_of::<ValueId>()
        );
    }
}
