//! Circuit locations: the ordered qudit tuple an operation acts on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};

/// An ordered tuple of distinct global qudit indices.
///
/// Order is significant: for a multi-qudit gate, `location[0]` addresses the
/// gate's first qudit (e.g. the control of a CX), and the unitary embedding
/// follows this order exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location(Vec<usize>);

impl Location {
    /// Create a location, rejecting empty and duplicated index tuples.
    pub fn new(indices: impl Into<Vec<usize>>) -> IrResult<Self> {
        let indices = indices.into();
        if indices.is_empty() {
            return Err(IrError::EmptyLocation);
        }
        for (i, &q) in indices.iter().enumerate() {
            if indices[..i].contains(&q) {
                return Err(IrError::DuplicateQudit { qudit: q });
            }
        }
        Ok(Location(indices))
    }

    /// Number of qudits addressed.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the location addresses no qudits (never constructible via `new`).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The lowest addressed qudit index.
    pub fn min_index(&self) -> usize {
        *self.0.iter().min().expect("location is never empty")
    }

    /// Whether the location addresses `qudit`.
    pub fn contains(&self, qudit: usize) -> bool {
        self.0.contains(&qudit)
    }

    /// Iterate the indices in tuple order.
    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    /// The indices as a slice, in tuple order.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl std::ops::Index<usize> for Location {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

impl<'a> IntoIterator for &'a Location {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{q}")?;
        }
        write!(f, ")")
    }
}
