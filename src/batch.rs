//! Batch generation.
//!
//! Requests are independent, so a batch is a parallel map over them. Every
//! request attempt gets its own RNG: with a base seed, request `i` attempt
//! `k` is seeded from a mix of `(seed, i, k)`, which keeps a batch
//! reproducible whatever thread runs which request. Without a base seed each
//! attempt draws fresh OS entropy.
//!
//! A failed request never stops the batch; it is reported in its outcome.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::Resolution;
use crate::template::TopologyTemplate;
use crate::{Error, NetworkGenerator, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchConfig {
    /// Base seed; `None` seeds every attempt from OS entropy.
    pub seed: Option<u64>,
    /// Attempts per request before it is reported as failed.
    pub max_attempts: usize,
    /// Worker threads; `None` uses rayon's global pool.
    pub workers: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { seed: None, max_attempts: 3, workers: None }
    }
}

/// One unit of work in a batch.
#[derive(Debug, Clone, Copy)]
pub enum GenerationRequest<'t> {
    Template(&'t TopologyTemplate),
    Chain { length: usize },
}

/// What happened to one request.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub attempts: usize,
    /// Seed of the last attempt, when the batch was seeded.
    pub seed: Option<u64>,
    pub result: Result<Resolution>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Derive an attempt seed from the base seed (splitmix64 finalizer).
pub fn attempt_seed(base: u64, index: usize, attempt: usize) -> u64 {
    let mut z = base
        ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (attempt as u64).wrapping_add(1).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl NetworkGenerator {
    /// Run every request, in parallel, and report one outcome per request
    /// in request order.
    ///
    /// Only a failure to build the worker pool is returned as an error.
    pub fn generate_batch(&self, requests: &[GenerationRequest<'_>]) -> Result<Vec<BatchOutcome>> {
        let run = || -> Vec<BatchOutcome> {
            requests
                .par_iter()
                .enumerate()
                .map(|(index, request)| self.run_request(index, request))
                .collect()
        };

        let outcomes = match self.batch_config().workers {
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| Error::Config(format!("cannot build worker pool: {e}")))?
                .install(run),
            None => run(),
        };

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(requests = outcomes.len(), failed, "batch finished");
        Ok(outcomes)
    }

    fn run_request(&self, index: usize, request: &GenerationRequest<'_>) -> BatchOutcome {
        let config = self.batch_config();
        let max_attempts = config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let seed = config.seed.map(|base| attempt_seed(base, index, attempt));
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            attempt += 1;

            let result = self.generate_with(request, &mut rng);
            match result {
                Err(ref e) if e.is_request_scoped() && attempt < max_attempts => {
                    warn!(request = index, attempt, error = %e, "request failed, retrying");
                }
                Err(ref e) => {
                    warn!(request = index, attempt, error = %e, "request failed, skipping");
                    return BatchOutcome { index, attempts: attempt, seed, result };
                }
                Ok(_) => return BatchOutcome { index, attempts: attempt, seed, result },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_seeds_differ() {
        let a = attempt_seed(42, 0, 0);
        assert_ne!(a, attempt_seed(42, 1, 0));
        assert_ne!(a, attempt_seed(42, 0, 1));
        assert_ne!(a, attempt_seed(43, 0, 0));
        assert_eq!(a, attempt_seed(42, 0, 0));
    }
}
