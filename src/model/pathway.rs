//! Pathway statistics for one ordered pair of cell types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CellTypeId;

/// Anatomical connectivity statistics (one anatomy-file record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnatomyStats {
    pub connection_probability: f64,
    pub total_synapse_count: f64,
    pub mean_number_of_synapse_per_connection: f64,
    pub number_of_synapse_per_connection_std: f64,
    pub number_of_convergent_neuron_mean: f64,
    pub number_of_convergent_neuron_std: f64,
    pub number_of_divergent_neuron_mean: f64,
    pub number_of_divergent_neuron_std: f64,
    pub common_neighbor_bias: f64,
    /// Fields this crate does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Physiological synapse statistics (one physiology-file record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysiologyStats {
    pub gsyn_mean: f64,
    pub gsyn_std: f64,
    pub epsp_mean: f64,
    pub epsp_std: f64,
    pub decay_mean: f64,
    pub decay_std: f64,
    pub latency_mean: f64,
    pub latency_std: f64,
    pub risetime_mean: f64,
    pub risetime_std: f64,
    pub failures_mean: f64,
    pub failures_std: f64,
    pub u_mean: f64,
    pub u_std: f64,
    pub d_mean: f64,
    pub d_std: f64,
    pub f_mean: f64,
    pub f_std: f64,
    pub cv_psp_amplitude_mean: f64,
    pub cv_psp_amplitude_std: f64,
    /// Free-form polarity description, e.g. `"Excitatory, depressing"`.
    #[serde(default)]
    pub synapse_type: String,
    /// Numeric in most datasets, a string in some; never interpreted.
    #[serde(default)]
    pub space_clamp_correction_factor: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Polarity inferred from a pathway's `synapse_type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynapseClass {
    Excitatory,
    Inhibitory,
    Unknown,
}

impl SynapseClass {
    /// Case-insensitive keyword match.
    ///
    /// A string naming exactly one of "excitatory"/"inhibitory" gets that
    /// class. Neither keyword, or both, is `Unknown`.
    pub fn classify(synapse_type: &str) -> Self {
        let lower = synapse_type.to_lowercase();
        let exc = lower.contains("excitatory");
        let inh = lower.contains("inhibitory");
        match (exc, inh) {
            (true, false) => SynapseClass::Excitatory,
            (false, true) => SynapseClass::Inhibitory,
            _ => SynapseClass::Unknown,
        }
    }

    /// The concrete polarity, if the classification settled on one.
    pub fn polarity(self) -> Option<Polarity> {
        match self {
            SynapseClass::Excitatory => Some(Polarity::Excitatory),
            SynapseClass::Inhibitory => Some(Polarity::Inhibitory),
            SynapseClass::Unknown => None,
        }
    }
}

/// Synapse polarity as handed to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Excitatory,
    Inhibitory,
}

impl Polarity {
    /// Wire code: 0 = excitatory, 1 = inhibitory.
    pub fn code(self) -> u8 {
        match self {
            Polarity::Excitatory => 0,
            Polarity::Inhibitory => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Polarity::Excitatory),
            1 => Some(Polarity::Inhibitory),
            _ => None,
        }
    }
}

/// Statistical connectivity description for `pre → post`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pathway {
    pub pre: CellTypeId,
    pub post: CellTypeId,
    pub anatomy: AnatomyStats,
    pub physiology: PhysiologyStats,
    pub class: SynapseClass,
}

impl Pathway {
    pub fn new(
        pre: CellTypeId,
        post: CellTypeId,
        anatomy: AnatomyStats,
        physiology: PhysiologyStats,
    ) -> Self {
        let class = SynapseClass::classify(&physiology.synapse_type);
        Self { pre, post, anatomy, physiology, class }
    }

    /// Sampling weight for this pathway.
    pub fn connection_probability(&self) -> f64 {
        self.anatomy.connection_probability
    }

    /// `(mean, std)` of the onset latency.
    pub fn latency(&self) -> (f64, f64) {
        (self.physiology.latency_mean, self.physiology.latency_std)
    }

    /// `(mean, std)` of the synapse count per connection.
    pub fn synapses_per_connection(&self) -> (f64, f64) {
        (
            self.anatomy.mean_number_of_synapse_per_connection,
            self.anatomy.number_of_synapse_per_connection_std,
        )
    }

    pub fn synapse_type(&self) -> &str {
        &self.physiology.synapse_type
    }
}
