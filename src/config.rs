//! File-based configuration.
//!
//! Every section has defaults, so an empty file (or no file) is valid.
//!
//! ```toml
//! [watch]
//! interval_ms = 3000
//! max_attempts = 20
//!
//! [arrival]
//! grace_period_ms = 3000
//!
//! [delivery]
//! base_fee = "5"
//! per_km = "1"
//! ```

use crate::application::watch::WatchConfig;
use crate::domain::delivery::DeliveryFeeSchedule;
use crate::error::{Result, StatusError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalConfig {
    /// How long to show the "nothing to check" state before navigating away.
    pub grace_period_ms: u64,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 3000,
        }
    }
}

impl ArrivalConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watch: WatchConfig,
    pub arrival: ArrivalConfig,
    pub delivery: DeliveryFeeSchedule,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| StatusError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.watch.validate()?;
        if self.delivery.base_fee.is_sign_negative() || self.delivery.per_km.is_sign_negative() {
            return Err(StatusError::ConfigError(
                "delivery fees must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
