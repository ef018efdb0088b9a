//! Flexible JSON input forms
//!
//! The wiring section accepts two spellings per target:
//!
//! ```json
//! {"wiring": {"e1": ["t1", {"task": "t2", "delay_ms": 5.0}]}}
//! ```
//!
//! A bare string is an undelayed edge; `delay_ms` may be a full distribution
//! object or a bare number (shorthand for a fixed delay).

use serde::{Deserialize, Deserializer};

use super::defs::WiringEdge;
use super::dist::DurationDist;

#[derive(Deserialize)]
#[serde(untagged)]
enum WiringTargetJson {
    Name(String),
    Edge {
        task: String,
        #[serde(default)]
        delay_ms: Option<DelayJson>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DelayJson {
    Millis(f64),
    Dist(DurationDist),
}

impl<'de> Deserialize<'de> for WiringEdge {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let edge = match WiringTargetJson::deserialize(deserializer)? {
            WiringTargetJson::Name(task) => WiringEdge {
                task,
                delay_ms: None,
            },
            WiringTargetJson::Edge { task, delay_ms } => WiringEdge {
                task,
                delay_ms: delay_ms.map(|d| match d {
                    DelayJson::Millis(value) => DurationDist::Fixed { value },
                    DelayJson::Dist(dist) => dist,
                }),
            },
        };
        Ok(edge)
    }
}
