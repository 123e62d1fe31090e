use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct TelemetryConfig {
    /// Initial interval between two telemetry messages
    /// Default: 3000
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Lower bound applied to remote `telemetryInterval` updates
    /// Default: 1000
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Upper bound applied to remote `telemetryInterval` updates
    /// Default: 60000
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "telemetry.min_interval_ms must be greater than 0".into(),
            ));
        }
        if self.min_interval_ms > self.max_interval_ms {
            return Err(Error::InvalidConfig(format!(
                "telemetry.min_interval_ms ({}) exceeds max_interval_ms ({})",
                self.min_interval_ms, self.max_interval_ms
            )));
        }
        if !(self.min_interval_ms..=self.max_interval_ms).contains(&self.interval_ms) {
            return Err(Error::InvalidConfig(format!(
                "telemetry.interval_ms ({}) must lie within [{}, {}]",
                self.interval_ms, self.min_interval_ms, self.max_interval_ms
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    3000
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_max_interval_ms() -> u64 {
    60000
}
