//! Coarse cell types (mtypes) known to the catalog.

use serde::{Deserialize, Serialize};

/// Opaque, sequentially allocated cell-type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellTypeId(pub u32);

impl CellTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for CellTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named cell type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellType {
    pub id: CellTypeId,
    pub name: String,
}

impl CellType {
    pub fn new(id: CellTypeId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}
