//! Random draws used by the resolver.
//!
//! Every function takes the caller's RNG; nothing here touches global state.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::warn;

use crate::model::SamplingAnomaly;

/// Result of a weighted draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub index: usize,
    /// Set when the draw fell back to a uniform choice.
    pub anomaly: Option<SamplingAnomaly>,
}

/// Effective weight: negative or non-finite weights count as zero.
fn effective(w: f64) -> f64 {
    if w.is_finite() && w > 0.0 { w } else { 0.0 }
}

/// Weighted choice over `weights`, proportional to each weight.
///
/// Draws `u` from `[0, total)` and returns the first index whose cumulative
/// upper bound exceeds `u`. When no index qualifies (floating-point drift, or
/// a zero / non-finite total) a uniform index is returned together with a
/// [`SamplingAnomaly`]. Returns `None` only for an empty slice.
pub fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<Pick> {
    if weights.is_empty() {
        return None;
    }

    let total: f64 = weights.iter().copied().map(effective).sum();
    let draw = if total.is_finite() && total > 0.0 {
        let u = rng.gen_range(0.0..total);
        let mut upper = 0.0;
        for (index, w) in weights.iter().copied().enumerate() {
            upper += effective(w);
            if upper > u {
                return Some(Pick { index, anomaly: None });
            }
        }
        Some(u)
    } else {
        None
    };

    let chosen = rng.gen_range(0..weights.len());
    let anomaly = SamplingAnomaly {
        candidates: weights.len(),
        total_weight: total,
        draw,
        chosen,
    };
    warn!(
        candidates = anomaly.candidates,
        total_weight = anomaly.total_weight,
        draw = ?anomaly.draw,
        chosen,
        "weighted sampling fell back to uniform choice"
    );
    Some(Pick { index: chosen, anomaly: Some(anomaly) })
}

/// Uniform index into a non-empty collection of `len` items.
pub fn uniform_index<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    (len > 0).then(|| rng.gen_range(0..len))
}

/// One draw from `Normal(mean, std)`.
///
/// A zero, negative or non-finite `std` collapses the distribution to `mean`.
pub fn sample_normal<R: Rng + ?Sized>(mean: f64, std: f64, rng: &mut R) -> f64 {
    if !(std.is_finite() && std > 0.0) {
        return mean;
    }
    match Normal::new(mean, std) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    }
}

/// `max(1, round(x))` as a synapse count. NaN becomes 1; huge values saturate.
pub fn synapse_count(x: f64) -> u32 {
    let rounded = x.round();
    if rounded.is_nan() || rounded < 1.0 {
        1
    } else if rounded >= u32::MAX as f64 {
        u32::MAX
    } else {
        rounded as u32
    }
}

/// Uniform draw from `[min, max)`; a degenerate range returns `min`.
pub fn sample_uniform<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    if max > min { rng.gen_range(min..max) } else { min }
}
