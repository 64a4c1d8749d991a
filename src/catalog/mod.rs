//! # Pathway Catalog
//!
//! Merged anatomy + physiology statistics, indexed by ordered cell-type pair.
//!
//! The catalog is built once per data load and is read-only afterwards, so a
//! single instance can be shared by any number of concurrent generation
//! requests without locking.
//!
//! ```text
//! anatomy.json ─┐
//!               ├─ key "Pre:Post" ─→ Pathway { pre, post, anatomy, physiology, class }
//! physiology.json ┘
//! ```

pub mod registry;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::*;
use crate::{Error, Result};

pub use registry::TypeRegistry;

// ============================================================================
// Options
// ============================================================================

/// Construction-time catalog options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogOptions {
    /// Drop every pathway not classified as excitatory.
    pub excitatory_only: bool,
}

// ============================================================================
// PathwayCatalog
// ============================================================================

/// Read-only index of pathway statistics.
#[derive(Debug, Clone, Default)]
pub struct PathwayCatalog {
    registry: TypeRegistry,
    /// pre → post → pathway
    outgoing: BTreeMap<CellTypeId, BTreeMap<CellTypeId, Pathway>>,
    /// post → set of pre ids with a pathway into it
    incoming: BTreeMap<CellTypeId, BTreeSet<CellTypeId>>,
    pathway_count: usize,
}

impl PathwayCatalog {
    /// Load and merge the anatomy and physiology files.
    ///
    /// Every anatomy key must have a physiology entry; otherwise the whole
    /// load fails with [`Error::DataIntegrity`] and no catalog is produced.
    pub fn load(
        anatomy_path: impl AsRef<Path>,
        physiology_path: impl AsRef<Path>,
        options: &CatalogOptions,
    ) -> Result<Self> {
        let anatomy = std::fs::read_to_string(anatomy_path.as_ref())?;
        let physiology = std::fs::read_to_string(physiology_path.as_ref())?;
        Self::from_json_str(&anatomy, &physiology, options)
    }

    /// Same as [`load`](Self::load), from in-memory JSON text.
    pub fn from_json_str(anatomy: &str, physiology: &str, options: &CatalogOptions) -> Result<Self> {
        let anatomy: BTreeMap<String, serde_json::Value> = serde_json::from_str(anatomy)?;
        let physiology: BTreeMap<String, serde_json::Value> = serde_json::from_str(physiology)?;
        Self::from_records(anatomy, physiology, options)
    }

    fn from_records(
        anatomy: BTreeMap<String, serde_json::Value>,
        mut physiology: BTreeMap<String, serde_json::Value>,
        options: &CatalogOptions,
    ) -> Result<Self> {
        let mut catalog = Self::default();
        let mut filtered = 0usize;

        for (key, an_value) in anatomy {
            let ph_value = physiology.remove(&key).ok_or_else(|| {
                Error::DataIntegrity(format!("no physiology entry for pathway {key}"))
            })?;
            let (pre_name, post_name) = split_pathway_key(&key)?;

            let an_stats: AnatomyStats = serde_json::from_value(an_value)
                .map_err(|e| Error::DataIntegrity(format!("anatomy entry {key}: {e}")))?;
            let ph_stats: PhysiologyStats = serde_json::from_value(ph_value)
                .map_err(|e| Error::DataIntegrity(format!("physiology entry {key}: {e}")))?;

            let class = SynapseClass::classify(&ph_stats.synapse_type);
            if class == SynapseClass::Unknown {
                warn!(
                    pathway = %key,
                    synapse_type = %ph_stats.synapse_type,
                    "synapse type matches neither excitatory nor inhibitory"
                );
            }
            // Filtered pathways never allocate type ids.
            if options.excitatory_only && class != SynapseClass::Excitatory {
                debug!(pathway = %key, class = ?class, "excluded by excitatory-only filter");
                filtered += 1;
                continue;
            }

            let pre = catalog.registry.get_or_assign(pre_name);
            let post = catalog.registry.get_or_assign(post_name);
            catalog.insert(Pathway::new(pre, post, an_stats, ph_stats));
        }

        info!(
            pathways = catalog.pathway_count,
            types = catalog.registry.len(),
            filtered,
            "loaded pathway catalog"
        );
        Ok(catalog)
    }

    fn insert(&mut self, pathway: Pathway) {
        let (pre, post) = (pathway.pre, pathway.post);
        if self.outgoing.entry(pre).or_default().insert(post, pathway).is_none() {
            self.pathway_count += 1;
        }
        self.incoming.entry(post).or_default().insert(pre);
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Existing id for `name`, or a freshly allocated one.
    pub fn get_or_assign_type_id(&mut self, name: &str) -> CellTypeId {
        self.registry.get_or_assign(name)
    }

    pub fn type_id(&self, name: &str) -> Option<CellTypeId> {
        self.registry.id(name)
    }

    pub fn type_name(&self, id: CellTypeId) -> Option<&str> {
        self.registry.name(id)
    }

    pub fn types(&self) -> impl Iterator<Item = (CellTypeId, &str)> + '_ {
        self.registry.iter()
    }

    pub fn type_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Keyword classification of a free-form synapse type string.
    pub fn classify_synapse(synapse_type: &str) -> SynapseClass {
        SynapseClass::classify(synapse_type)
    }

    // ========================================================================
    // Pathways
    // ========================================================================

    pub fn lookup(&self, pre: CellTypeId, post: CellTypeId) -> Option<&Pathway> {
        self.outgoing.get(&pre).and_then(|row| row.get(&post))
    }

    /// Pathways leaving `pre`, ordered by post id.
    pub fn outgoing(&self, pre: CellTypeId) -> impl Iterator<Item = &Pathway> + '_ {
        self.outgoing.get(&pre).into_iter().flat_map(|row| row.values())
    }

    /// Pathways entering `post`, ordered by pre id.
    pub fn incoming(&self, post: CellTypeId) -> impl Iterator<Item = &Pathway> + '_ {
        self.incoming
            .get(&post)
            .into_iter()
            .flat_map(|pres| pres.iter())
            .filter_map(move |pre| self.lookup(*pre, post))
    }

    pub fn has_outgoing(&self, pre: CellTypeId) -> bool {
        self.outgoing.get(&pre).is_some_and(|row| !row.is_empty())
    }

    pub fn pathway_count(&self) -> usize {
        self.pathway_count
    }

    /// `"Pre:Post"` label for a pathway, as keyed in the data files.
    pub fn pathway_key(&self, pathway: &Pathway) -> String {
        format!(
            "{}:{}",
            self.type_name(pathway.pre).unwrap_or("?"),
            self.type_name(pathway.post).unwrap_or("?"),
        )
    }

    /// Text grid of which ordered pairs have a pathway.
    ///
    /// Rows are pre ids, columns post ids; `x` marks a pathway.
    pub fn render_connection_matrix(&self) -> String {
        let n = self.type_count();
        let mut out = String::from("   ");
        for col in 0..n {
            let _ = write!(out, "{col:<2} ");
        }
        out.push('\n');
        for row in 0..n {
            let _ = write!(out, "{row:<2} ");
            for col in 0..n {
                let present = self.lookup(CellTypeId(row as u32), CellTypeId(col as u32)).is_some();
                out.push_str(if present { "x  " } else { "   " });
            }
            out.push('\n');
        }
        out
    }
}

/// Split `"Pre:Post"` into its two type names.
fn split_pathway_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once(':') {
        Some((pre, post)) if !pre.is_empty() && !post.is_empty() && !post.contains(':') => {
            Ok((pre, post))
        }
        _ => Err(Error::DataIntegrity(format!(
            "malformed pathway key '{key}', expected 'Pre:Post'"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small synthetic statistics files for unit tests.

    use serde_json::{json, Map, Value};

    pub fn anatomy_entry(probability: f64, syn_mean: f64, syn_std: f64) -> Value {
        json!({
            "connection_probability": probability,
            "total_synapse_count": 100.0,
            "mean_number_of_synapse_per_connection": syn_mean,
            "number_of_synapse_per_connection_std": syn_std,
            "number_of_convergent_neuron_mean": 10.0,
            "number_of_convergent_neuron_std": 2.0,
            "number_of_divergent_neuron_mean": 12.0,
            "number_of_divergent_neuron_std": 3.0,
            "common_neighbor_bias": 1.0
        })
    }

    pub fn physiology_entry(synapse_type: &str, latency_mean: f64, latency_std: f64) -> Value {
        json!({
            "gsyn_mean": 0.5, "gsyn_std": 0.1,
            "epsp_mean": 1.2, "epsp_std": 0.3,
            "decay_mean": 10.0, "decay_std": 1.0,
            "latency_mean": latency_mean, "latency_std": latency_std,
            "risetime_mean": 0.8, "risetime_std": 0.1,
            "failures_mean": 0.05, "failures_std": 0.01,
            "u_mean": 0.4, "u_std": 0.05,
            "d_mean": 600.0, "d_std": 50.0,
            "f_mean": 20.0, "f_std": 5.0,
            "cv_psp_amplitude_mean": 0.3, "cv_psp_amplitude_std": 0.05,
            "synapse_type": synapse_type,
            "space_clamp_correction_factor": 2.5
        })
    }

    /// `(pre, post, connection_probability, synapse_type)` rows → JSON texts.
    pub fn files(rows: &[(&str, &str, f64, &str)]) -> (String, String) {
        let mut anatomy = Map::new();
        let mut physiology = Map::new();
        for (pre, post, p, syn) in rows {
            let key = format!("{pre}:{post}");
            anatomy.insert(key.clone(), anatomy_entry(*p, 4.0, 1.0));
            physiology.insert(key, physiology_entry(syn, 1.5, 0.5));
        }
        (Value::Object(anatomy).to_string(), Value::Object(physiology).to_string())
    }

    pub fn catalog(rows: &[(&str, &str, f64, &str)]) -> super::PathwayCatalog {
        let (an, ph) = files(rows);
        super::PathwayCatalog::from_json_str(&an, &ph, &Default::default())
            .expect("fixture catalog must load")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::fixtures::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_load_merges_matching_keys() {
        let catalog = catalog(&[
            ("L1_DAC", "L23_PC", 0.1, "Inhibitory, depressing"),
            ("L23_PC", "L23_PC", 0.2, "Excitatory, depressing"),
        ]);
        assert_eq!(catalog.pathway_count(), 2);
        assert_eq!(catalog.type_count(), 2);

        let dac = catalog.type_id("L1_DAC").unwrap();
        let pc = catalog.type_id("L23_PC").unwrap();
        let p = catalog.lookup(dac, pc).unwrap();
        assert_eq!(p.class, SynapseClass::Inhibitory);
        assert_eq!(p.connection_probability(), 0.1);
        assert!(catalog.lookup(pc, dac).is_none());
    }

    #[test]
    fn test_missing_physiology_is_fatal() {
        let an = json!({
            "A:B": anatomy_entry(0.1, 3.0, 1.0),
            "B:C": anatomy_entry(0.1, 3.0, 1.0),
        });
        let ph = json!({ "A:B": physiology_entry("Excitatory", 1.0, 0.1) });
        let err = PathwayCatalog::from_json_str(&an.to_string(), &ph.to_string(), &Default::default())
            .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(ref m) if m.contains("B:C")), "{err}");
    }

    #[test]
    fn test_physiology_only_keys_are_ignored() {
        let an = json!({ "A:B": anatomy_entry(0.1, 3.0, 1.0) });
        let ph = json!({
            "A:B": physiology_entry("Excitatory", 1.0, 0.1),
            "X:Y": physiology_entry("Excitatory", 1.0, 0.1),
        });
        let catalog = PathwayCatalog::from_json_str(&an.to_string(), &ph.to_string(), &Default::default())
            .unwrap();
        assert_eq!(catalog.pathway_count(), 1);
        assert_eq!(catalog.type_id("X"), None);
    }

    #[test]
    fn test_malformed_key() {
        let an = json!({ "AB": anatomy_entry(0.1, 3.0, 1.0) });
        let ph = json!({ "AB": physiology_entry("Excitatory", 1.0, 0.1) });
        let err = PathwayCatalog::from_json_str(&an.to_string(), &ph.to_string(), &Default::default())
            .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }

    #[test]
    fn test_non_numeric_field_is_integrity_error() {
        let mut entry = anatomy_entry(0.1, 3.0, 1.0);
        entry["connection_probability"] = json!("high");
        let an = json!({ "A:B": entry });
        let ph = json!({ "A:B": physiology_entry("Excitatory", 1.0, 0.1) });
        let err = PathwayCatalog::from_json_str(&an.to_string(), &ph.to_string(), &Default::default())
            .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(ref m) if m.contains("anatomy entry A:B")));
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let mut entry = anatomy_entry(0.1, 3.0, 1.0);
        entry["layer_depth"] = json!(412.0);
        let an = json!({ "A:B": entry });
        let ph = json!({ "A:B": physiology_entry("Excitatory", 1.0, 0.1) });
        let catalog = PathwayCatalog::from_json_str(&an.to_string(), &ph.to_string(), &Default::default())
            .unwrap();
        let p = catalog.lookup(CellTypeId(0), CellTypeId(1)).unwrap();
        assert_eq!(p.anatomy.extra.get("layer_depth"), Some(&json!(412.0)));
        assert_eq!(p.physiology.space_clamp_correction_factor, Some(json!(2.5)));
    }

    #[test]
    fn test_excitatory_only_filter() {
        let (an, ph) = files(&[
            ("A", "B", 0.1, "Excitatory"),
            ("B", "A", 0.1, "Inhibitory"),
            ("A", "A", 0.1, "mystery"),
        ]);
        let options = CatalogOptions { excitatory_only: true };
        let catalog = PathwayCatalog::from_json_str(&an, &ph, &options).unwrap();
        assert_eq!(catalog.pathway_count(), 1);
        let a = catalog.type_id("A").unwrap();
        let b = catalog.type_id("B").unwrap();
        assert!(catalog.lookup(a, b).is_some());
        assert!(catalog.lookup(b, a).is_none());
        assert!(catalog.lookup(a, a).is_none());
    }

    #[test]
    fn test_filtered_pathway_registers_no_types() {
        let (an, ph) = files(&[
            ("A", "B", 0.1, "Excitatory"),
            ("B", "C", 0.1, "Inhibitory"),
        ]);
        let options = CatalogOptions { excitatory_only: true };
        let catalog = PathwayCatalog::from_json_str(&an, &ph, &options).unwrap();
        assert_eq!(catalog.pathway_count(), 1);
        assert_eq!(catalog.type_count(), 2);
        assert_eq!(catalog.type_id("C"), None);
        let names: Vec<&str> = catalog.types().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_ids_follow_sorted_key_order() {
        let catalog = catalog(&[
            ("Z", "Y", 0.1, "Excitatory"),
            ("A", "Z", 0.1, "Excitatory"),
        ]);
        // "A:Z" sorts first: A=0, Z=1, then "Z:Y": Y=2.
        assert_eq!(catalog.type_id("A"), Some(CellTypeId(0)));
        assert_eq!(catalog.type_id("Z"), Some(CellTypeId(1)));
        assert_eq!(catalog.type_id("Y"), Some(CellTypeId(2)));
    }

    #[test]
    fn test_incoming_and_outgoing() {
        let catalog = catalog(&[
            ("A", "C", 0.1, "Excitatory"),
            ("B", "C", 0.3, "Excitatory"),
            ("C", "A", 0.2, "Inhibitory"),
        ]);
        let c = catalog.type_id("C").unwrap();
        let pres: Vec<&str> = catalog
            .incoming(c)
            .map(|p| catalog.type_name(p.pre).unwrap())
            .collect();
        assert_eq!(pres, vec!["A", "B"]);
        assert_eq!(catalog.outgoing(c).count(), 1);
        assert!(catalog.has_outgoing(catalog.type_id("B").unwrap()));
    }

    #[test]
    fn test_connection_matrix() {
        let catalog = catalog(&[("A", "B", 0.1, "Excitatory")]);
        let matrix = catalog.render_connection_matrix();
        let lines: Vec<&str> = matrix.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0     x  ");
        assert_eq!(lines[2], format!("1{}", " ".repeat(8)));
    }

    #[test]
    fn test_classify_synapse_is_case_insensitive() {
        assert_eq!(PathwayCatalog::classify_synapse("eXcItAtOrY"), SynapseClass::Excitatory);
    }
}
