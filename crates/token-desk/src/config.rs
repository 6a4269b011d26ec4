use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::history::DEFAULT_CAPACITY;
use crate::watcher::FALLBACK_DECIMALS;

/// Session tunables. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Maximum number of history entries kept. Must be at least 1.
    #[serde(deserialize_with = "nonzero_capacity")]
    pub history_capacity: usize,

    /// Precision used to render event amounts before metadata has loaded.
    pub fallback_decimals: u8,

    /// How long to wait for a receipt before reporting the transfer as
    /// still pending. Unset means wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            fallback_decimals: FALLBACK_DECIMALS,
            confirmation_timeout_secs: None,
        }
    }
}

impl Config {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

fn nonzero_capacity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    match usize::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("historyCapacity must be at least 1")),
        n => Ok(n),
    }
}
