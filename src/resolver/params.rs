//! Per-edge synaptic parameter derivation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{Anomaly, Pathway, Polarity};
use super::sampling::{sample_normal, sample_uniform, synapse_count};

/// Sampling ranges and defaults for edge parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplingConfig {
    pub weight_min: f64,
    pub weight_max: f64,
    /// Polarity applied when a pathway's synapse type is unclassified.
    pub unknown_synapse: Polarity,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            weight_min: 0.8,
            weight_max: 5.0,
            unknown_synapse: Polarity::Excitatory,
        }
    }
}

/// Concrete parameters for one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeParams {
    pub polarity: Polarity,
    pub conn_count: u32,
    pub weight: f64,
    pub delay: f64,
    pub anomaly: Option<Anomaly>,
}

/// Draw delay, synapse count and weight for `edge_id` from `pathway`.
///
/// Draw order is fixed (delay, count, weight) so a seeded stream reproduces.
pub fn derive_edge_params<R: Rng + ?Sized>(
    edge_id: &str,
    pathway_key: &str,
    pathway: &Pathway,
    config: &SamplingConfig,
    rng: &mut R,
) -> EdgeParams {
    let (lat_mean, lat_std) = pathway.latency();
    let delay = sample_normal(lat_mean, lat_std, rng);

    let (syn_mean, syn_std) = pathway.synapses_per_connection();
    let conn_count = synapse_count(sample_normal(syn_mean, syn_std, rng));

    let weight = sample_uniform(config.weight_min, config.weight_max, rng);

    let (polarity, anomaly) = match pathway.class.polarity() {
        Some(p) => (p, None),
        None => {
            let applied = config.unknown_synapse;
            warn!(
                edge = edge_id,
                pathway = pathway_key,
                synapse_type = pathway.synapse_type(),
                applied = ?applied,
                "unclassified synapse type, applying default polarity"
            );
            let anomaly = Anomaly::UnknownSynapseClassification {
                edge: edge_id.to_owned(),
                pathway: pathway_key.to_owned(),
                synapse_type: pathway.synapse_type().to_owned(),
                applied,
            };
            (applied, Some(anomaly))
        }
    };

    debug!(edge = edge_id, pathway = pathway_key, delay, conn_count, weight, "parameterized edge");
    EdgeParams { polarity, conn_count, weight, delay, anomaly }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::model::CellTypeId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pathway(synapse_type: &str, syn_mean: f64, syn_std: f64) -> Pathway {
        let anatomy = serde_json::from_value(fixtures::anatomy_entry(0.1, syn_mean, syn_std)).unwrap();
        let physiology = serde_json::from_value(fixtures::physiology_entry(synapse_type, 1.5, 0.5)).unwrap();
        Pathway::new(CellTypeId(0), CellTypeId(1), anatomy, physiology)
    }

    #[test]
    fn test_polarity_codes_follow_class() {
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = SamplingConfig::default();
        let inh = derive_edge_params("e0", "A:B", &pathway("Inhibitory", 4.0, 1.0), &cfg, &mut rng);
        assert_eq!(inh.polarity.code(), 1);
        assert!(inh.anomaly.is_none());
        let exc = derive_edge_params("e1", "A:B", &pathway("excitatory", 4.0, 1.0), &cfg, &mut rng);
        assert_eq!(exc.polarity.code(), 0);
    }

    #[test]
    fn test_unknown_class_applies_configured_default() {
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = SamplingConfig { unknown_synapse: Polarity::Inhibitory, ..Default::default() };
        let params = derive_edge_params("e7", "A:B", &pathway("gap junction", 4.0, 1.0), &cfg, &mut rng);
        assert_eq!(params.polarity, Polarity::Inhibitory);
        match params.anomaly {
            Some(Anomaly::UnknownSynapseClassification { edge, applied, .. }) => {
                assert_eq!(edge, "e7");
                assert_eq!(applied, Polarity::Inhibitory);
            }
            other => panic!("expected unknown-classification anomaly, got {other:?}"),
        }
    }

    #[test]
    fn test_weight_in_range_and_count_positive() {
        let mut rng = StdRng::seed_from_u64(42);
        let cfg = SamplingConfig::default();
        let p = pathway("Excitatory", -50.0, 10.0);
        for i in 0..500 {
            let params = derive_edge_params(&i.to_string(), "A:B", &p, &cfg, &mut rng);
            assert!((0.8..5.0).contains(&params.weight));
            assert_eq!(params.conn_count, 1);
        }
    }
}
