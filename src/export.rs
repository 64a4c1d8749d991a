//! Network document export: serialize a resolved network for a simulator.
//!
//! Produces the four-section document (cells, edges, stimuli, probes) of
//! flat records whose fields are all strings:
//!
//! ```text
//! ResolvedNetwork → emit() → NetworkDocument → to_json_pretty() / write_to()
//!   → hand to the simulation engine, or from_json_str() → into_network()
//! ```
//!
//! Floats are written with Rust's shortest round-trip formatting, so parsing
//! a document back yields the exact in-memory values.

use std::io::Write;
use std::str::FromStr;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub cell_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
    pub conn_type: String,
    pub conn_count: String,
    pub weight: String,
    pub delay: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusRecord {
    pub target: String,
    pub stim_file: String,
    pub delay: String,
    pub dur: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub id: String,
    pub target: String,
    pub tag: String,
}

/// The output document. Section order is fixed: cells, edges, stimuli, probes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDocument {
    pub cells: Vec<CellRecord>,
    pub edges: Vec<EdgeRecord>,
    pub stimuli: Vec<StimulusRecord>,
    pub probes: Vec<ProbeRecord>,
}

/// Serialize a network into its document form.
///
/// Pure: no randomness, no I/O. Fails only on a structurally invalid
/// network (duplicate cell ids, dangling references, zero synapse count).
pub fn emit(network: &ResolvedNetwork) -> Result<NetworkDocument> {
    let mut ids = HashSet::with_capacity(network.cells.len());
    for cell in &network.cells {
        if !ids.insert(cell.id.as_str()) {
            return Err(Error::Document(format!("duplicate cell id '{}'", cell.id)));
        }
    }
    let check = |what: &str, owner: &str, target: &str| -> Result<()> {
        if ids.contains(target) {
            Ok(())
        } else {
            Err(Error::Document(format!("{what} '{owner}' references unknown cell '{target}'")))
        }
    };

    let cells = network
        .cells
        .iter()
        .map(|c| CellRecord {
            id: c.id.clone(),
            label: c.label.clone(),
            cell_type: c.cell_type.clone(),
            variant: c.variant.clone(),
        })
        .collect();

    let mut edges = Vec::with_capacity(network.edges.len());
    for e in &network.edges {
        check("edge", &e.id, &e.source)?;
        check("edge", &e.id, &e.target)?;
        if e.conn_count == 0 {
            return Err(Error::Document(format!("edge '{}' has zero synapse count", e.id)));
        }
        edges.push(EdgeRecord {
            id: e.id.clone(),
            source: e.source.clone(),
            target: e.target.clone(),
            conn_type: e.conn_type().to_string(),
            conn_count: e.conn_count.to_string(),
            weight: e.weight.to_string(),
            delay: e.delay.to_string(),
        });
    }

    let mut stimuli = Vec::with_capacity(network.stimuli.len());
    for s in &network.stimuli {
        check("stimulus", &s.stim_file, &s.target)?;
        stimuli.push(StimulusRecord {
            target: s.target.clone(),
            stim_file: s.stim_file.clone(),
            delay: s.delay.to_string(),
            dur: s.dur.to_string(),
        });
    }

    let mut probes = Vec::with_capacity(network.probes.len());
    for p in &network.probes {
        check("probe", &p.id, &p.target)?;
        probes.push(ProbeRecord {
            id: p.id.clone(),
            target: p.target.clone(),
            tag: p.tag.clone(),
        });
    }

    Ok(NetworkDocument { cells, edges, stimuli, probes })
}

impl NetworkDocument {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse the string fields back into a typed network.
    pub fn into_network(self) -> Result<ResolvedNetwork> {
        let cells = self
            .cells
            .into_iter()
            .map(|c| Cell {
                id: c.id,
                label: c.label,
                cell_type: c.cell_type,
                variant: c.variant,
            })
            .collect();

        let edges = self
            .edges
            .into_iter()
            .map(|e| {
                let code: u8 = parse_field(&e.id, "connType", &e.conn_type)?;
                let polarity = Polarity::from_code(code).ok_or_else(|| {
                    Error::Document(format!("edge '{}': connType must be 0 or 1, got {code}", e.id))
                })?;
                let conn_count: u32 = parse_field(&e.id, "connCount", &e.conn_count)?;
                if conn_count == 0 {
                    return Err(Error::Document(format!("edge '{}' has zero synapse count", e.id)));
                }
                Ok(Edge {
                    polarity,
                    conn_count,
                    weight: parse_field(&e.id, "weight", &e.weight)?,
                    delay: parse_field(&e.id, "delay", &e.delay)?,
                    id: e.id,
                    source: e.source,
                    target: e.target,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let stimuli = self
            .stimuli
            .into_iter()
            .map(|s| {
                Ok(Stimulus {
                    delay: parse_field(&s.target, "delay", &s.delay)?,
                    dur: parse_field(&s.target, "dur", &s.dur)?,
                    target: s.target,
                    stim_file: s.stim_file,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let probes = self
            .probes
            .into_iter()
            .map(|p| Probe { id: p.id, target: p.target, tag: p.tag })
            .collect();

        Ok(ResolvedNetwork { cells, edges, stimuli, probes })
    }
}

fn parse_field<T: FromStr>(owner: &str, field: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Document(format!("'{owner}': {field} '{raw}' is not a valid number")))
}
