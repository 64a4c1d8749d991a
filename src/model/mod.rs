//! # Network Model
//!
//! Clean DTOs shared by every stage: catalog ↔ resolver ↔ writer ↔ user.
//!
//! Design rule: NO simulator types, NO file handles here.
//! This module is pure data: no I/O, no randomness.

pub mod cell_type;
pub mod pathway;
pub mod network;
pub mod anomaly;

pub use cell_type::{CellType, CellTypeId};
pub use pathway::{AnatomyStats, Pathway, PhysiologyStats, Polarity, SynapseClass};
pub use network::{Cell, Edge, Probe, Resolution, ResolvedNetwork, Stimulus};
pub use anomaly::{Anomaly, SamplingAnomaly};
