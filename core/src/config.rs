//! Ledger configuration file (TOML) support
//!
//! Example:
//! ```toml
//! lockup_time = 1296000   # 15 days
//! lockup_unit = 432000    # 5 days
//! income_account = "income"
//!
//! [distribution]
//! operator_bps = 1000
//! parent_bps = 1000
//! grandparent_bps = 500
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::clock::DAY;
use crate::distribution::DistributionConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parameters fixed at ledger initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Total vesting duration in seconds
    #[serde(default = "default_lockup_time")]
    pub lockup_time: u64,

    /// Width of a maturity bucket in seconds
    #[serde(default = "default_lockup_unit")]
    pub lockup_unit: u64,

    /// Account receiving the residual share of every spend
    #[serde(default)]
    pub income_account: Option<String>,

    #[serde(default)]
    pub distribution: DistributionConfig,
}

fn default_lockup_time() -> u64 {
    15 * DAY
}

fn default_lockup_unit() -> u64 {
    5 * DAY
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lockup_time: default_lockup_time(),
            lockup_unit: default_lockup_unit(),
            income_account: None,
            distribution: DistributionConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn new(lockup_time: u64, lockup_unit: u64) -> Self {
        Self {
            lockup_time,
            lockup_unit,
            ..Self::default()
        }
    }

    pub fn with_income_account(mut self, account: &str) -> Self {
        self.income_account = Some(account.to_string());
        self
    }

    pub fn with_distribution(mut self, distribution: DistributionConfig) -> Self {
        self.distribution = distribution;
        self
    }

    /// Load and validate configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lockup_unit == 0 {
            return Err(ConfigError::Invalid(
                "lockup_unit must be positive".to_string(),
            ));
        }

        if self.lockup_time == 0 {
            return Err(ConfigError::Invalid(
                "lockup_time must be positive".to_string(),
            ));
        }

        if self.lockup_unit > self.lockup_time {
            return Err(ConfigError::Invalid(format!(
                "lockup_unit ({}) exceeds lockup_time ({})",
                self.lockup_unit, self.lockup_time
            )));
        }

        if matches!(&self.income_account, Some(account) if account.is_empty()) {
            return Err(ConfigError::Invalid(
                "income_account must not be empty".to_string(),
            ));
        }

        self.distribution.validate()
    }
}
