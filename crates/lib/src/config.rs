//! Session configuration.
//!
//! A [`SessionConfig`] is plain data so it can be stored next to application settings
//! as JSON and loaded with [`SessionConfig::from_json`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::Result;

const DEFAULT_SWEEP_THRESHOLD: usize = 64;

fn default_sweep_threshold() -> usize {
    DEFAULT_SWEEP_THRESHOLD
}

/// A threshold of zero would sweep on every insert; it is raised to one.
fn clamp_sweep_threshold(sweep_threshold: usize) -> usize {
    sweep_threshold.max(1)
}

fn deserialize_sweep_threshold<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    usize::deserialize(deserializer).map(clamp_sweep_threshold)
}

/// Configuration for a [`Session`](crate::Session).
///
/// # Example
///
/// ```
/// use yproxy::SessionConfig;
///
/// let config = SessionConfig::from_json(r#"{ "tracking": true }"#).unwrap();
/// assert!(config.tracking);
/// assert_eq!(config.sweep_threshold, SessionConfig::default().sweep_threshold);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Initial value of the session-wide tracking toggle.
    ///
    /// When enabled, newly wrapped containers get an engine observer that revokes
    /// their wrapper on change. Wrappers created with an explicit tracking flag
    /// ignore this value.
    #[serde(default)]
    pub tracking: bool,

    /// Number of identity cache entries that may accumulate before dead entries
    /// and idle tracking metadata are pruned. Never less than one.
    #[serde(
        default = "default_sweep_threshold",
        deserialize_with = "deserialize_sweep_threshold"
    )]
    pub sweep_threshold: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tracking: false,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from its JSON form. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns this configuration with the tracking toggle set.
    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }

    /// Returns this configuration with a different sweep threshold.
    pub fn with_sweep_threshold(mut self, sweep_threshold: usize) -> Self {
        self.sweep_threshold = clamp_sweep_threshold(sweep_threshold);
        self
    }
}
