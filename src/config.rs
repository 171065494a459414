//! Configuration for descriptor extraction.
//!
//! All fields have defaults, so a partial JSON document (or an empty one)
//! is a valid configuration.

use serde::{Deserialize, Serialize};

/// Master configuration for [`DescriptorBuilder`](crate::extract::DescriptorBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Query the OS for the subject's trust provider.
    pub resolve_trust_provider: bool,
    /// Fail embedded-signed files whose trust lookup errors, instead of
    /// leaving the provider absent.
    pub require_trust_provider: bool,
    /// Batch extraction settings.
    pub batch: BatchConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            resolve_trust_provider: true,
            require_trust_provider: false,
            batch: BatchConfig::default(),
        }
    }
}

impl ExtractConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Configuration that never touches the OS trust layer.
    pub fn offline() -> Self {
        Self {
            resolve_trust_provider: false,
            ..Self::default()
        }
    }
}

/// Settings for [`DescriptorBuilder::build_batch`](crate::extract::DescriptorBuilder::build_batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Extract files on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Size of a dedicated pool. `None` uses the global rayon pool.
    pub max_threads: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: None,
        }
    }
}
