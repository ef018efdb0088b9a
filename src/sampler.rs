//! Duration sampling
//!
//! Draws nonnegative millisecond durations from a [`DurationDist`] given an
//! RNG. Negative normal draws are clamped (to 0, or to the configured `min`),
//! matching how simulated-latency samplers conventionally treat the normal
//! tail.

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use thiserror::Error;

use crate::model::DurationDist;

/// Sampling failure. Parameter errors indicate an unvalidated model and are
/// treated as invariant violations by the engines.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("invalid distribution parameters: {0}")]
    BadParams(String),

    #[error("sampled non-finite duration")]
    NonFinite,
}

/// Sample one duration in milliseconds. The result is finite and >= 0.
///
/// # Example
/// ```
/// use latencylab::model::DurationDist;
/// use latencylab::rng::rng_for_seed;
/// use latencylab::sampler::sample_ms;
///
/// let mut rng = rng_for_seed(1);
/// let d = sample_ms(&DurationDist::fixed(10.0), &mut rng).unwrap();
/// assert_eq!(d, 10.0);
/// ```
pub fn sample_ms<R: Rng>(dist: &DurationDist, rng: &mut R) -> Result<f64, SampleError> {
    let value = match dist {
        DurationDist::Fixed { value } => *value,
        DurationDist::Normal { mean, std, min } => {
            let normal = Normal::new(*mean, *std)
                .map_err(|e| SampleError::BadParams(format!("normal: {e}")))?;
            let draw: f64 = normal.sample(rng);
            draw.max(min.unwrap_or(0.0).max(0.0))
        }
        DurationDist::Lognormal { mu, sigma } => {
            let lognormal = LogNormal::new(*mu, *sigma)
                .map_err(|e| SampleError::BadParams(format!("lognormal: {e}")))?;
            lognormal.sample(rng)
        }
    };

    if !value.is_finite() || value < 0.0 {
        return Err(SampleError::NonFinite);
    }
    Ok(value)
}
