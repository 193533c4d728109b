use serde::{Deserialize, Serialize};

/// Ordered offsets walked from a base address.
///
/// See [`AddressSpace::calculate_pointer`](super::AddressSpace::calculate_pointer)
/// for the exact resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointerChain(Vec<i32>);

impl PointerChain {
    pub fn new(offsets: Vec<i32>) -> Self {
        Self(offsets)
    }

    pub fn offsets(&self) -> &[i32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every offset except the last one.
    ///
    /// These are the steps whose result is itself dereferenced, i.e. the walk
    /// that lands on the structure the last offset indexes into.
    pub fn intermediate(&self) -> &[i32] {
        match self.0.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }
}

impl From<Vec<i32>> for PointerChain {
    fn from(offsets: Vec<i32>) -> Self {
        Self(offsets)
    }
}
