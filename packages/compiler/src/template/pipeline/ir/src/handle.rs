//! IR Handles
//!
//! Identifiers used to link IR nodes together.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an element in its template's element arena. `CloseTag` nodes refer to the
/// element whose start tag they close by this id, never by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub usize);

impl ElementId {
    pub fn new(id: usize) -> Self {
        ElementId(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out element ids in allocation order.
#[derive(Debug, Default, Clone)]
pub struct ElementIdAllocator {
    next: usize,
}

impl ElementIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ElementId {
        let id = ElementId(self.next);
        self.next += 1;
        id
    }
}
