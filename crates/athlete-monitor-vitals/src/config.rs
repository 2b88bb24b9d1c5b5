//! Monitor configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::DEFAULT_ESCALATION_SECS;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::ranges::VitalRangeTable;
use crate::simulator::SimulatorConfig;
use crate::{Result, VitalsError};

/// Configuration for the simulation orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Readings retained per subject
    pub history_capacity: usize,
    /// Seconds of continuous alert before escalating to infection
    pub escalation_secs: f64,
    /// Tick interval in milliseconds
    pub tick_interval_ms: u64,
    /// Seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
    /// Advisory call timeout in milliseconds
    pub advisory_timeout_ms: u64,
    /// Normal/warning/alert bands
    pub ranges: VitalRangeTable,
    /// Simulator tunables
    pub simulator: SimulatorConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            escalation_secs: DEFAULT_ESCALATION_SECS,
            tick_interval_ms: 1000,
            seed: None,
            advisory_timeout_ms: 500,
            ranges: VitalRangeTable::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Create a new configuration builder
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// Reject configurations that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(VitalsError::Config("history_capacity must be at least 1".into()));
        }
        if !self.escalation_secs.is_finite() || self.escalation_secs < 0.0 {
            return Err(VitalsError::Config(format!(
                "escalation_secs must be a non-negative number, got {}",
                self.escalation_secs
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(VitalsError::Config("tick_interval_ms must be positive".into()));
        }
        self.ranges.validate()?;
        self.simulator.validate()
    }

    /// Parse and validate a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VitalsError::Config(format!("invalid monitor config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Builder for MonitorConfig
#[derive(Debug, Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// Set per-subject history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity.max(1);
        self
    }

    /// Set alert escalation window
    pub fn escalation_secs(mut self, secs: f64) -> Self {
        self.config.escalation_secs = secs.max(0.0);
        self
    }

    /// Set tick interval
    pub fn tick_interval_ms(mut self, interval: u64) -> Self {
        self.config.tick_interval_ms = interval.max(10);
        self
    }

    /// Set RNG seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set advisory timeout
    pub fn advisory_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.advisory_timeout_ms = timeout.max(1);
        self
    }

    /// Set range table
    pub fn ranges(mut self, ranges: VitalRangeTable) -> Self {
        self.config.ranges = ranges;
        self
    }

    /// Set simulator tunables
    pub fn simulator(mut self, simulator: SimulatorConfig) -> Self {
        self.config.simulator = simulator;
        self
    }

    /// Build the configuration
    pub fn build(self) -> MonitorConfig {
        self.config
    }
}
