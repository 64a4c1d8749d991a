//! Non-fatal events recorded while resolving a request.

use serde::{Deserialize, Serialize};

/// Weighted sampling could not select by weight and fell back to a uniform pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingAnomaly {
    pub candidates: usize,
    pub total_weight: f64,
    /// The uniform draw `u`, when one was made.
    pub draw: Option<f64>,
    pub chosen: usize,
}

/// Something odd that did not stop the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Anomaly {
    Sampling(SamplingAnomaly),
    /// Polarity string matched neither keyword; `applied` is the default used.
    UnknownSynapseClassification {
        edge: String,
        pathway: String,
        synapse_type: String,
        applied: super::Polarity,
    },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::Sampling(s) => write!(
                f,
                "weighted sampling fell back to uniform choice {} of {} (total weight {})",
                s.chosen, s.candidates, s.total_weight,
            ),
            Anomaly::UnknownSynapseClassification { edge, pathway, synapse_type, applied } => write!(
                f,
                "edge {edge}: synapse type '{synapse_type}' of {pathway} is unclassified, applied {applied:?}",
            ),
        }
    }
}
