//! Linear-chain generation: no template, just `N` cells in a row.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::*;
use crate::template::TypeConstraint;
use crate::{Error, Result};
use super::{Pool, Resolver, sampling};

/// Label carried by the first cell of a chain.
pub const HEAD_LABEL: &str = "Head";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainConfig {
    /// Types a chain may start from.
    pub roots: TypeConstraint,
    /// Fresh starts tried after the first one hits a dead end.
    pub max_restarts: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            roots: TypeConstraint::Any,
            max_restarts: 8,
        }
    }
}

impl<'a> Resolver<'a> {
    /// Generate a chain of `length` cells.
    ///
    /// The start type is drawn uniformly among the root types; every next
    /// type is a weighted pick over the current type's outgoing pathways.
    /// A type without outgoing pathways ends the attempt; the next attempt
    /// starts from a root not tried yet.
    pub fn generate_chain<R: Rng + ?Sized>(
        &self,
        length: usize,
        config: &ChainConfig,
        rng: &mut R,
    ) -> Result<Resolution> {
        if length == 0 {
            return Err(Error::InvalidRequest("a chain needs at least one cell".into()));
        }

        let mut roots = self.candidate_types(&config.roots);
        if roots.is_empty() {
            return Err(Error::UnsatisfiableTemplate("no cell type matches the chain roots".into()));
        }

        let mut attempts = 0;
        let mut dead_end = None;
        while attempts <= config.max_restarts {
            let Some(i) = sampling::uniform_index(roots.len(), rng) else {
                break;
            };
            let start = roots.swap_remove(i);
            attempts += 1;

            let mut anomalies = Vec::new();
            match self.walk_chain(start, length, rng, &mut anomalies) {
                Ok(types) => return self.build_chain(&types, rng, anomalies),
                Err(stuck) => {
                    warn!(
                        attempt = attempts,
                        start = self.name(start),
                        dead_end = self.name(stuck),
                        "chain reached a type with no outgoing pathways"
                    );
                    dead_end = Some(stuck);
                }
            }
        }

        Err(Error::DeadEnd {
            cell_type: dead_end.map(|id| self.name(id)).unwrap_or("?").to_owned(),
            attempts,
        })
    }

    /// Type sequence from `start`, or the type that had nowhere to go.
    fn walk_chain<R: Rng + ?Sized>(
        &self,
        start: CellTypeId,
        length: usize,
        rng: &mut R,
        anomalies: &mut Vec<Anomaly>,
    ) -> std::result::Result<Vec<CellTypeId>, CellTypeId> {
        let mut types = Vec::with_capacity(length);
        types.push(start);
        let mut current = start;
        while types.len() < length {
            let pool: Pool<&Pathway> = self.catalog.outgoing(current).collect();
            let next = self.pick_weighted(&pool, rng, anomalies).ok_or(current)?;
            debug!(from = self.name(current), to = self.name(next.post), "extended chain");
            current = next.post;
            types.push(current);
        }
        Ok(types)
    }

    fn build_chain<R: Rng + ?Sized>(
        &self,
        types: &[CellTypeId],
        rng: &mut R,
        mut anomalies: Vec<Anomaly>,
    ) -> Result<Resolution> {
        let mut network = ResolvedNetwork::new();
        for (i, ty) in types.iter().enumerate() {
            let label = (i == 0).then_some(HEAD_LABEL);
            network.cells.push(self.concrete_cell(&i.to_string(), label, *ty, rng)?);
        }
        for (i, pair) in types.windows(2).enumerate() {
            let edge = self.concrete_edge(
                &i.to_string(),
                &i.to_string(),
                &(i + 1).to_string(),
                pair[0],
                pair[1],
                rng,
                &mut anomalies,
            )?;
            network.edges.push(edge);
        }
        Ok(Resolution { network, anomalies })
    }
}
