//! # Topology Templates
//!
//! The graph skeleton a request asks for: nodes with type constraints, the
//! edges between them, and the stimuli and probes to attach.
//!
//! Templates are immutable once parsed. Per-request resolution state lives in
//! the resolver, so one template can serve any number of requests.

pub mod constraint;

use std::path::Path;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub use constraint::{NodeStatus, TypeConstraint, TypePattern};

/// Stimulus file used when a template leaves `stimFile` empty.
pub const DEFAULT_STIM_FILE: &str = "./current_amps.dat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub id: String,
    #[serde(default)]
    pub type_constraint: TypeConstraint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusSpec {
    pub target: String,
    #[serde(default)]
    pub stim_file: String,
    pub delay: f64,
    pub dur: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub id: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// On-disk shape of a template, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub nodes: Vec<TemplateNode>,
    #[serde(default)]
    pub edges: Vec<TemplateEdge>,
    #[serde(default)]
    pub stimuli: Vec<StimulusSpec>,
    #[serde(default)]
    pub probes: Vec<ProbeSpec>,
}

/// A validated template: ids are unique and every reference resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyTemplate {
    nodes: Vec<TemplateNode>,
    edges: Vec<TemplateEdge>,
    stimuli: Vec<StimulusSpec>,
    probes: Vec<ProbeSpec>,
    node_index: HashMap<String, usize>,
}

impl TopologyTemplate {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: TemplateDocument = serde_json::from_str(text)?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: TemplateDocument) -> Result<Self> {
        let mut node_index = HashMap::with_capacity(doc.nodes.len());
        for (i, node) in doc.nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), i).is_some() {
                return Err(Error::InvalidTemplate(format!("duplicate node id '{}'", node.id)));
            }
        }

        // The id sets borrow from `doc`; they must drop before it is moved.
        {
            let known = |what: &str, owner: &str, id: &str| -> Result<()> {
                if node_index.contains_key(id) {
                    Ok(())
                } else {
                    Err(Error::InvalidTemplate(format!(
                        "{what} '{owner}' references unknown node '{id}'"
                    )))
                }
            };

            let mut edge_ids = HashSet::with_capacity(doc.edges.len());
            for edge in &doc.edges {
                if !edge_ids.insert(edge.id.as_str()) {
                    return Err(Error::InvalidTemplate(format!("duplicate edge id '{}'", edge.id)));
                }
                known("edge", &edge.id, &edge.source)?;
                known("edge", &edge.id, &edge.target)?;
            }
            for stim in &doc.stimuli {
                known("stimulus", &stim.target, &stim.target)?;
            }
            let mut probe_ids = HashSet::with_capacity(doc.probes.len());
            for probe in &doc.probes {
                if !probe_ids.insert(probe.id.as_str()) {
                    return Err(Error::InvalidTemplate(format!("duplicate probe id '{}'", probe.id)));
                }
                known("probe", &probe.id, &probe.target)?;
            }
        }

        Ok(Self {
            nodes: doc.nodes,
            edges: doc.edges,
            stimuli: doc.stimuli,
            probes: doc.probes,
            node_index,
        })
    }

    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::default()
    }

    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TemplateEdge] {
        &self.edges
    }

    pub fn stimuli(&self) -> &[StimulusSpec] {
        &self.stimuli
    }

    pub fn probes(&self) -> &[ProbeSpec] {
        &self.probes
    }

    /// Position of a node in [`nodes`](Self::nodes).
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&TemplateNode> {
        self.node_index(id).map(|i| &self.nodes[i])
    }
}

/// Programmatic template construction; validation runs in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    doc: TemplateDocument,
}

impl TemplateBuilder {
    pub fn node(mut self, id: impl Into<String>, constraint: TypeConstraint) -> Self {
        self.doc.nodes.push(TemplateNode {
            id: id.into(),
            type_constraint: constraint,
            label: None,
        });
        self
    }

    pub fn labeled_node(
        mut self,
        id: impl Into<String>,
        constraint: TypeConstraint,
        label: impl Into<String>,
    ) -> Self {
        self.doc.nodes.push(TemplateNode {
            id: id.into(),
            type_constraint: constraint,
            label: Some(label.into()),
        });
        self
    }

    pub fn edge(
        mut self,
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.doc.edges.push(TemplateEdge {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        });
        self
    }

    pub fn stimulus(mut self, target: impl Into<String>, stim_file: impl Into<String>, delay: f64, dur: f64) -> Self {
        self.doc.stimuli.push(StimulusSpec {
            target: target.into(),
            stim_file: stim_file.into(),
            delay,
            dur,
        });
        self
    }

    pub fn probe(mut self, id: impl Into<String>, target: impl Into<String>, tag: Option<&str>) -> Self {
        self.doc.probes.push(ProbeSpec {
            id: id.into(),
            target: target.into(),
            tag: tag.map(str::to_owned),
        });
        self
    }

    pub fn build(self) -> Result<TopologyTemplate> {
        TopologyTemplate::from_document(self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = r#"{
        "nodes": [
            {"id": "a", "typeConstraint": {"exact": "L5_TTPC1"}, "label": "Head"},
            {"id": "b", "typeConstraint": {"pattern": "^L23_"}},
            {"id": "c"}
        ],
        "edges": [
            {"id": "e0", "source": "a", "target": "b"},
            {"id": "e1", "source": "b", "target": "c"}
        ],
        "stimuli": [{"target": "a", "stimFile": "amps.dat", "delay": 700.0, "dur": 2000.0}],
        "probes": [{"id": "p0", "target": "c"}]
    }"#;

    #[test]
    fn test_parse_template() {
        let t = TopologyTemplate::from_json_str(TEMPLATE).unwrap();
        assert_eq!(t.nodes().len(), 3);
        assert_eq!(t.edges().len(), 2);
        assert_eq!(t.node("a").unwrap().label.as_deref(), Some("Head"));
        assert_eq!(t.node("c").unwrap().type_constraint, TypeConstraint::Any);
        assert_eq!(t.node_index("b"), Some(1));
        assert_eq!(t.stimuli()[0].stim_file, "amps.dat");
        assert_eq!(t.probes()[0].tag, None);
    }

    #[test]
    fn test_unknown_edge_endpoint() {
        let err = TopologyTemplate::builder()
            .node("a", TypeConstraint::Any)
            .edge("e0", "a", "ghost")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(ref m) if m.contains("ghost")));
    }

    #[test]
    fn test_duplicate_node_id() {
        let err = TopologyTemplate::builder()
            .node("a", TypeConstraint::Any)
            .node("a", TypeConstraint::Any)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
    }

    #[test]
    fn test_duplicate_edge_id() {
        let err = TopologyTemplate::builder()
            .node("a", TypeConstraint::Any)
            .edge("e0", "a", "a")
            .edge("e0", "a", "a")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(ref m) if m.contains("duplicate edge")));
    }

    #[test]
    fn test_edges_kept_after_validation() {
        let t = TopologyTemplate::from_json_str(
            r#"{
                "nodes": [{"id": "a"}, {"id": "b"}],
                "edges": [
                    {"id": "e0", "source": "a", "target": "b"},
                    {"id": "e1", "source": "b", "target": "a"}
                ]
            }"#,
        )
        .unwrap();
        let edges: Vec<(&str, &str, &str)> = t
            .edges()
            .iter()
            .map(|e| (e.id.as_str(), e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(edges, vec![("e0", "a", "b"), ("e1", "b", "a")]);
    }

    #[test]
    fn test_duplicate_probe_id() {
        let err = TopologyTemplate::builder()
            .node("a", TypeConstraint::Any)
            .node("b", TypeConstraint::Any)
            .probe("p0", "a", None)
            .probe("p0", "b", Some("soma_b"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(ref m) if m.contains("duplicate probe id 'p0'")));
    }

    #[test]
    fn test_probe_and_stimulus_targets_checked() {
        let err = TopologyTemplate::builder()
            .node("a", TypeConstraint::Any)
            .probe("p0", "b", None)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));

        let err = TopologyTemplate::builder()
            .node("a", TypeConstraint::Any)
            .stimulus("b", "", 0.0, 1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
    }

    #[test]
    fn test_bad_pattern_is_json_error() {
        let err = TopologyTemplate::from_json_str(
            r#"{"nodes": [{"id": "a", "typeConstraint": {"pattern": "("}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
