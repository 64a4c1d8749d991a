//! # Resolver
//!
//! Turns a [`TopologyTemplate`] into one concrete [`ResolvedNetwork`].
//!
//! ## Template mode
//!
//! Edges are visited once, in template order. Each visit pins whichever
//! endpoint is still open, sampling among the catalog pathways that connect
//! it to the already-pinned side and that satisfy its own constraint:
//!
//! | source | target | action |
//! |--------|--------|--------|
//! | pinned | pinned | nothing (parameterized at the end) |
//! | pinned | open   | weighted pick over `outgoing(source)` matching target |
//! | open   | pinned | weighted pick over `incoming(target)` matching source |
//! | open   | open   | uniform feasible source, then as row 2 |
//!
//! Propagation is local and forward-only. A node pinned by an earlier edge
//! is never revisited; if a later edge cannot be satisfied the whole request
//! fails with [`Error::UnsatisfiableTemplate`]. No partial network is ever
//! returned.
//!
//! ## Chain mode
//!
//! See [`Resolver::generate_chain`].

pub mod chain;
pub mod params;
pub mod sampling;

use rand::Rng;
use smallvec::SmallVec;
use tracing::debug;

use crate::catalog::PathwayCatalog;
use crate::etype::ETypeIndex;
use crate::model::*;
use crate::template::{DEFAULT_STIM_FILE, NodeStatus, TopologyTemplate, TypeConstraint};
use crate::{Error, Result};

pub use chain::ChainConfig;
pub use params::{EdgeParams, SamplingConfig, derive_edge_params};
pub use sampling::{Pick, weighted_index};

type Pool<T> = SmallVec<[T; 16]>;

// ============================================================================
// Per-request node state
// ============================================================================

/// Working state of one template node during a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeState {
    pub status: NodeStatus,
    pub resolved: Option<CellTypeId>,
}

impl NodeState {
    fn open(status: NodeStatus) -> Self {
        Self { status, resolved: None }
    }

    fn pinned(id: CellTypeId) -> Self {
        Self { status: NodeStatus::Resolved, resolved: Some(id) }
    }

    /// One-way transition to `Resolved`.
    fn resolve(&mut self, id: CellTypeId) {
        debug_assert!(self.resolved.is_none(), "node resolved twice");
        self.status = NodeStatus::Resolved;
        self.resolved = Some(id);
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves templates against a shared, read-only catalog and index.
///
/// A `Resolver` borrows its inputs and holds no mutable state, so one
/// instance can serve concurrent requests; each request brings its own RNG.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    catalog: &'a PathwayCatalog,
    etypes: Option<&'a ETypeIndex>,
    sampling: SamplingConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a PathwayCatalog) -> Self {
        Self {
            catalog,
            etypes: None,
            sampling: SamplingConfig::default(),
        }
    }

    /// Draw a concrete model variant for every cell from `etypes`.
    pub fn with_etypes(mut self, etypes: &'a ETypeIndex) -> Self {
        self.etypes = Some(etypes);
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn catalog(&self) -> &'a PathwayCatalog {
        self.catalog
    }

    /// Resolve every node of `template` and parameterize every edge.
    pub fn resolve<R: Rng + ?Sized>(&self, template: &TopologyTemplate, rng: &mut R) -> Result<Resolution> {
        let mut anomalies = Vec::new();
        let mut states = self.initial_states(template)?;

        for edge in template.edges() {
            let s = self.node_slot(template, &edge.source)?;
            let t = self.node_slot(template, &edge.target)?;
            let src_constraint = &template.nodes()[s].type_constraint;
            let dst_constraint = &template.nodes()[t].type_constraint;

            match (states[s].resolved, states[t].resolved) {
                (Some(_), Some(_)) => {}
                (None, None) if s == t => {
                    let ty = self.sample_self_loop(src_constraint, rng, &mut anomalies).ok_or_else(|| {
                        unsatisfiable(&edge.id, format!("no self-connecting type allowed for node '{}'", edge.source))
                    })?;
                    states[s].resolve(ty);
                }
                (Some(src), None) => {
                    let post = self.sample_target(src, dst_constraint, rng, &mut anomalies).ok_or_else(|| {
                        unsatisfiable(&edge.id, format!(
                            "no pathway from {} reaches a type allowed for node '{}'",
                            self.name(src), edge.target,
                        ))
                    })?;
                    states[t].resolve(post);
                }
                (None, Some(dst)) => {
                    let pre = self.sample_source(dst, src_constraint, rng, &mut anomalies).ok_or_else(|| {
                        unsatisfiable(&edge.id, format!(
                            "no pathway into {} starts from a type allowed for node '{}'",
                            self.name(dst), edge.source,
                        ))
                    })?;
                    states[s].resolve(pre);
                }
                (None, None) => {
                    let src = self.pick_feasible_source(src_constraint, dst_constraint, rng).ok_or_else(|| {
                        unsatisfiable(&edge.id, format!(
                            "no type allowed for node '{}' connects to a type allowed for node '{}'",
                            edge.source, edge.target,
                        ))
                    })?;
                    states[s].resolve(src);
                    let post = self.sample_target(src, dst_constraint, rng, &mut anomalies).ok_or_else(|| {
                        unsatisfiable(&edge.id, format!("no pathway from {} matches node '{}'", self.name(src), edge.target))
                    })?;
                    states[t].resolve(post);
                }
            }
            debug!(edge = %edge.id, source = ?states[s].resolved, target = ?states[t].resolved, "propagated edge");
        }

        // Nodes no edge touched.
        for (node, state) in template.nodes().iter().zip(states.iter_mut()) {
            if state.resolved.is_none() {
                let pool = self.candidate_types(&node.type_constraint);
                let i = sampling::uniform_index(pool.len(), rng).ok_or_else(|| {
                    Error::UnsatisfiableTemplate(format!("no cell type allowed for isolated node '{}'", node.id))
                })?;
                state.resolve(pool[i]);
            }
        }

        self.build_network(template, &states, rng, anomalies)
    }

    fn initial_states(&self, template: &TopologyTemplate) -> Result<Vec<NodeState>> {
        template
            .nodes()
            .iter()
            .map(|node| match &node.type_constraint {
                TypeConstraint::Exact(name) => self
                    .catalog
                    .type_id(name)
                    .map(NodeState::pinned)
                    .ok_or_else(|| Error::UnsatisfiableTemplate(format!(
                        "node '{}' requires cell type '{name}', which the catalog does not know",
                        node.id,
                    ))),
                other => Ok(NodeState::open(other.initial_status())),
            })
            .collect()
    }

    fn node_slot(&self, template: &TopologyTemplate, id: &str) -> Result<usize> {
        template
            .node_index(id)
            .ok_or_else(|| Error::InvalidTemplate(format!("unknown node '{id}'")))
    }

    // ========================================================================
    // Candidate pools
    // ========================================================================

    fn name(&self, id: CellTypeId) -> &'a str {
        self.catalog.type_name(id).unwrap_or("?")
    }

    fn allows(&self, constraint: &TypeConstraint, id: CellTypeId) -> bool {
        self.catalog.type_name(id).is_some_and(|name| constraint.matches(name))
    }

    /// Every catalog type satisfying `constraint`, in id order.
    fn candidate_types(&self, constraint: &TypeConstraint) -> Pool<CellTypeId> {
        self.catalog
            .types()
            .filter(|(_, name)| constraint.matches(name))
            .map(|(id, _)| id)
            .collect()
    }

    fn pick_weighted<R: Rng + ?Sized>(
        &self,
        pool: &[&'a Pathway],
        rng: &mut R,
        anomalies: &mut Vec<Anomaly>,
    ) -> Option<&'a Pathway> {
        let weights: Pool<f64> = pool.iter().map(|p| p.connection_probability()).collect();
        let pick = weighted_index(&weights, rng)?;
        if let Some(a) = pick.anomaly {
            anomalies.push(Anomaly::Sampling(a));
        }
        Some(pool[pick.index])
    }

    fn sample_target<R: Rng + ?Sized>(
        &self,
        src: CellTypeId,
        constraint: &TypeConstraint,
        rng: &mut R,
        anomalies: &mut Vec<Anomaly>,
    ) -> Option<CellTypeId> {
        let pool: Pool<&Pathway> = self
            .catalog
            .outgoing(src)
            .filter(|p| self.allows(constraint, p.post))
            .collect();
        self.pick_weighted(&pool, rng, anomalies).map(|p| p.post)
    }

    fn sample_source<R: Rng + ?Sized>(
        &self,
        dst: CellTypeId,
        constraint: &TypeConstraint,
        rng: &mut R,
        anomalies: &mut Vec<Anomaly>,
    ) -> Option<CellTypeId> {
        let pool: Pool<&Pathway> = self
            .catalog
            .incoming(dst)
            .filter(|p| self.allows(constraint, p.pre))
            .collect();
        self.pick_weighted(&pool, rng, anomalies).map(|p| p.pre)
    }

    /// A node connected to itself: weighted over the self-pathways it allows.
    fn sample_self_loop<R: Rng + ?Sized>(
        &self,
        constraint: &TypeConstraint,
        rng: &mut R,
        anomalies: &mut Vec<Anomaly>,
    ) -> Option<CellTypeId> {
        let pool: Pool<&Pathway> = self
            .candidate_types(constraint)
            .into_iter()
            .filter_map(|id| self.catalog.lookup(id, id))
            .collect();
        self.pick_weighted(&pool, rng, anomalies).map(|p| p.pre)
    }

    /// Uniformly try source candidates until one has a pathway into a type
    /// the target allows. Infeasible candidates are dropped, not retried.
    fn pick_feasible_source<R: Rng + ?Sized>(
        &self,
        src_constraint: &TypeConstraint,
        dst_constraint: &TypeConstraint,
        rng: &mut R,
    ) -> Option<CellTypeId> {
        let mut pool = self.candidate_types(src_constraint);
        while let Some(i) = sampling::uniform_index(pool.len(), rng) {
            let candidate = pool.swap_remove(i);
            if self
                .catalog
                .outgoing(candidate)
                .any(|p| self.allows(dst_constraint, p.post))
            {
                return Some(candidate);
            }
            debug!(candidate = self.name(candidate), "source candidate has no feasible pathway");
        }
        None
    }

    // ========================================================================
    // Concrete network
    // ========================================================================

    fn concrete_cell<R: Rng + ?Sized>(
        &self,
        id: &str,
        label: Option<&str>,
        ty: CellTypeId,
        rng: &mut R,
    ) -> Result<Cell> {
        let name = self.name(ty);
        let mut cell = Cell::new(id, name);
        cell.label = label.map(str::to_owned);
        if let Some(index) = self.etypes {
            cell.variant = Some(index.pick_variant(name, rng)?.to_owned());
        }
        Ok(cell)
    }

    #[allow(clippy::too_many_arguments)]
    fn concrete_edge<R: Rng + ?Sized>(
        &self,
        id: &str,
        source: &str,
        target: &str,
        pre: CellTypeId,
        post: CellTypeId,
        rng: &mut R,
        anomalies: &mut Vec<Anomaly>,
    ) -> Result<Edge> {
        let pathway = self.catalog.lookup(pre, post).ok_or_else(|| {
            unsatisfiable(id, format!("no pathway {}:{}", self.name(pre), self.name(post)))
        })?;
        let key = self.catalog.pathway_key(pathway);
        let params = derive_edge_params(id, &key, pathway, &self.sampling, rng);
        if let Some(a) = params.anomaly {
            anomalies.push(a);
        }
        Ok(Edge {
            id: id.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
            polarity: params.polarity,
            conn_count: params.conn_count,
            weight: params.weight,
            delay: params.delay,
        })
    }

    fn build_network<R: Rng + ?Sized>(
        &self,
        template: &TopologyTemplate,
        states: &[NodeState],
        rng: &mut R,
        mut anomalies: Vec<Anomaly>,
    ) -> Result<Resolution> {
        let mut types = Vec::with_capacity(states.len());
        for (node, state) in template.nodes().iter().zip(states) {
            let ty = state.resolved.ok_or_else(|| {
                Error::UnsatisfiableTemplate(format!("node '{}' left unresolved", node.id))
            })?;
            types.push(ty);
        }

        let mut network = ResolvedNetwork::new();
        for (node, ty) in template.nodes().iter().zip(&types) {
            network.cells.push(self.concrete_cell(&node.id, node.label.as_deref(), *ty, rng)?);
        }

        for edge in template.edges() {
            let pre = types[self.node_slot(template, &edge.source)?];
            let post = types[self.node_slot(template, &edge.target)?];
            network.edges.push(self.concrete_edge(
                &edge.id, &edge.source, &edge.target, pre, post, rng, &mut anomalies,
            )?);
        }

        network.stimuli = template
            .stimuli()
            .iter()
            .map(|s| Stimulus {
                target: s.target.clone(),
                stim_file: if s.stim_file.is_empty() {
                    DEFAULT_STIM_FILE.to_owned()
                } else {
                    s.stim_file.clone()
                },
                delay: s.delay,
                dur: s.dur,
            })
            .collect();

        network.probes = template
            .probes()
            .iter()
            .map(|p| {
                let tag = p.tag.clone().unwrap_or_else(|| {
                    let cell = network.cells.iter().find(|c| c.id == p.target);
                    let name = cell
                        .map(|c| c.variant.as_deref().unwrap_or(&c.cell_type))
                        .unwrap_or(&p.target);
                    format!("{name}_{}", p.id)
                });
                Probe { id: p.id.clone(), target: p.target.clone(), tag }
            })
            .collect();

        Ok(Resolution { network, anomalies })
    }
}

fn unsatisfiable(edge: &str, reason: String) -> Error {
    Error::UnsatisfiableTemplate(format!("edge '{edge}': {reason}"))
}
