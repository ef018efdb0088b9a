//! Duration distributions
//!
//! Task durations and wiring delays are sampled from one of three
//! distribution shapes. The JSON form is internally tagged, e.g.
//! `{"dist": "normal", "mean": 10.0, "std": 2.0}`.

use serde::{Deserialize, Serialize};

/// A nonnegative duration distribution in simulated milliseconds.
///
/// # Example
/// ```
/// use latencylab::model::DurationDist;
///
/// let d: DurationDist = serde_json::from_str(r#"{"dist": "fixed", "value": 5.0}"#).unwrap();
/// assert_eq!(d, DurationDist::Fixed { value: 5.0 });
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dist", rename_all = "lowercase")]
pub enum DurationDist {
    /// Constant duration.
    Fixed { value: f64 },

    /// Normal draw, clamped below at `max(0, min)`.
    Normal {
        mean: f64,
        std: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
    },

    /// `exp(mu + sigma * Z)` with `Z ~ N(0, 1)`.
    Lognormal { mu: f64, sigma: f64 },
}

impl DurationDist {
    /// Shorthand for a fixed duration (common in tests and fixtures).
    pub fn fixed(value: f64) -> Self {
        DurationDist::Fixed { value }
    }
}
