//! Fully concrete networks, ready for a simulator.

use serde::{Deserialize, Serialize};

use super::{Anomaly, Polarity};

/// A concrete cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: String,
    pub label: Option<String>,
    /// Resolved mtype name.
    pub cell_type: String,
    /// Concrete model-library variant, when an index was attached.
    pub variant: Option<String>,
}

impl Cell {
    pub fn new(id: impl Into<String>, cell_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            cell_type: cell_type.into(),
            variant: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

/// A parameterized connection between two cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub polarity: Polarity,
    /// Number of synaptic contacts, always at least 1.
    pub conn_count: u32,
    pub weight: f64,
    /// May be negative; latency draws are not clamped.
    pub delay: f64,
}

impl Edge {
    /// Wire code of the polarity (`connType`).
    pub fn conn_type(&self) -> u8 {
        self.polarity.code()
    }
}

/// A current stimulus attached to one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub target: String,
    pub stim_file: String,
    pub delay: f64,
    pub dur: f64,
}

/// A recording probe attached to one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub id: String,
    pub target: String,
    pub tag: String,
}

/// The four sections of a generated network.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedNetwork {
    pub cells: Vec<Cell>,
    pub edges: Vec<Edge>,
    pub stimuli: Vec<Stimulus>,
    pub probes: Vec<Probe>,
}

impl ResolvedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// A satisfied request: the network plus whatever went oddly on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub network: ResolvedNetwork,
    pub anomalies: Vec<Anomaly>,
}

impl Resolution {
    pub fn into_network(self) -> ResolvedNetwork {
        self.network
    }
}
