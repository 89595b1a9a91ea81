//! Controller configuration types.
//!
//! This module contains the configuration loaded from `controller.toml`:
//! - `ControllerConfig` - Main configuration
//! - `StoreConfig` - Persistent medium geometry
//! - `TimingConfig` - Cycle, indicator and confirmation window timing
//! - `WipeConfig` - Scope of a wipe confirmed during the run loop
//! - `SimulationConfig` - Simulation driver settings and event script

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_CYCLE_TIME_MS, DEFAULT_STORE_CAPACITY, DEFAULT_WIPE_CONFIRM_MS, DEFAULT_WIPE_POLL_MS,
    MAX_STORE_CAPACITY, MIN_STORE_CAPACITY,
};
use crate::credential::Identifier;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_driver() -> String {
    "simulation".to_string()
}

fn default_capacity() -> usize {
    DEFAULT_STORE_CAPACITY
}

fn default_cycle_time_ms() -> u64 {
    DEFAULT_CYCLE_TIME_MS
}

fn default_blink_ms() -> u64 {
    200
}

fn default_hold_ms() -> u64 {
    1000
}

fn default_wipe_confirm_ms() -> u64 {
    DEFAULT_WIPE_CONFIRM_MS
}

fn default_wipe_poll_ms() -> u64 {
    DEFAULT_WIPE_POLL_MS
}

fn default_reader_version() -> u8 {
    0x92
}

/// Main configuration loaded from `controller.toml`.
///
/// # TOML Example
///
/// ```toml
/// driver = "simulation"
///
/// [shared]
/// service_name = "front-door"
///
/// [store]
/// capacity = 1024
///
/// [timing]
/// wipe_confirm_ms = 10000
///
/// [wipe]
/// runtime_scope = "full"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Name of the driver providing the collaborators.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Common service settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Persistent store geometry.
    #[serde(default)]
    pub store: StoreConfig,

    /// Timing parameters.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Wipe behaviour.
    #[serde(default)]
    pub wipe: WipeConfig,

    /// Simulation driver settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            shared: SharedConfig::default(),
            store: StoreConfig::default(),
            timing: TimingConfig::default(),
            wipe: WipeConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// 1. `shared.service_name` not empty
    /// 2. `driver` not empty
    /// 3. `MIN_STORE_CAPACITY <= store.capacity <= MAX_STORE_CAPACITY`
    /// 4. `cycle_time_ms` > 0 and `wipe_poll_ms` > 0
    /// 5. `wipe_poll_ms <= wipe_confirm_ms`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver cannot be empty".to_string(),
            ));
        }

        if !(MIN_STORE_CAPACITY..=MAX_STORE_CAPACITY).contains(&self.store.capacity) {
            return Err(ConfigError::ValidationError(format!(
                "store.capacity {} outside [{}, {}]",
                self.store.capacity, MIN_STORE_CAPACITY, MAX_STORE_CAPACITY
            )));
        }

        if self.timing.cycle_time_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timing.cycle_time_ms must be greater than 0".to_string(),
            ));
        }

        if self.timing.wipe_poll_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timing.wipe_poll_ms must be greater than 0".to_string(),
            ));
        }

        if self.timing.wipe_poll_ms > self.timing.wipe_confirm_ms {
            return Err(ConfigError::ValidationError(format!(
                "timing.wipe_poll_ms ({}) exceeds timing.wipe_confirm_ms ({})",
                self.timing.wipe_poll_ms, self.timing.wipe_confirm_ms
            )));
        }

        Ok(())
    }
}

/// Persistent store geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Total capacity in bytes.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Timing parameters, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// Control loop period.
    #[serde(default = "default_cycle_time_ms")]
    pub cycle_time_ms: u64,

    /// Indicator blink step.
    #[serde(default = "default_blink_ms")]
    pub blink_ms: u64,

    /// How long the actuator stays open after a grant.
    #[serde(default = "default_hold_ms")]
    pub grant_hold_ms: u64,

    /// How long the denied indication is held.
    #[serde(default = "default_hold_ms")]
    pub deny_hold_ms: u64,

    /// Wipe confirmation window.
    #[serde(default = "default_wipe_confirm_ms")]
    pub wipe_confirm_ms: u64,

    /// Wipe control sampling interval inside the window.
    #[serde(default = "default_wipe_poll_ms")]
    pub wipe_poll_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: default_cycle_time_ms(),
            blink_ms: default_blink_ms(),
            grant_hold_ms: default_hold_ms(),
            deny_hold_ms: default_hold_ms(),
            wipe_confirm_ms: default_wipe_confirm_ms(),
            wipe_poll_ms: default_wipe_poll_ms(),
        }
    }
}

impl TimingConfig {
    /// Control loop period.
    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(self.cycle_time_ms)
    }

    /// Wipe confirmation window.
    pub fn wipe_confirm(&self) -> Duration {
        Duration::from_millis(self.wipe_confirm_ms)
    }

    /// Wipe control sampling interval.
    pub fn wipe_poll(&self) -> Duration {
        Duration::from_millis(self.wipe_poll_ms)
    }
}

/// What a wipe confirmed during the run loop destroys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WipeScope {
    /// Zero the entire store.
    #[default]
    Full,
    /// Clear the init marker only; enrolled slots survive.
    MasterOnly,
}

/// Wipe behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WipeConfig {
    /// Scope of a wipe confirmed while running. A wipe at boot is always full.
    #[serde(default)]
    pub runtime_scope: WipeScope,
}

/// Scripted input for the simulation driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// Present a tag at `at_ms` after boot.
    Scan {
        /// Offset from driver start.
        at_ms: u64,
        /// Tag identifier.
        id: Identifier,
    },
    /// Hold the wipe control from `at_ms` for `hold_ms`.
    WipeHold {
        /// Offset from driver start.
        at_ms: u64,
        /// Hold duration.
        hold_ms: u64,
    },
}

/// Simulation driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Backing file for the store image. In-memory when absent.
    #[serde(default)]
    pub image_path: Option<PathBuf>,

    /// Firmware version the simulated reader reports.
    #[serde(default = "default_reader_version")]
    pub reader_version: u8,

    /// Scripted scans and wipe holds.
    #[serde(default)]
    pub events: Vec<SimulationEvent>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            reader_version: default_reader_version(),
            events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::parse("").unwrap();
        assert_eq!(config.driver, "simulation");
        assert_eq!(config.store.capacity, DEFAULT_STORE_CAPACITY);
        assert_eq!(config.timing.wipe_confirm_ms, 10_000);
        assert_eq!(config.timing.wipe_poll_ms, 500);
        assert_eq!(config.wipe.runtime_scope, WipeScope::Full);
        assert_eq!(config.simulation.reader_version, 0x92);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_simulation_events() {
        let config = ControllerConfig::parse(
            r#"
[[simulation.events]]
kind = "scan"
at_ms = 100
id = "11:22:33:44"

[[simulation.events]]
kind = "wipe_hold"
at_ms = 2000
hold_ms = 11000
"#,
        )
        .unwrap();

        assert_eq!(
            config.simulation.events,
            vec![
                SimulationEvent::Scan {
                    at_ms: 100,
                    id: Identifier::new([0x11, 0x22, 0x33, 0x44]),
                },
                SimulationEvent::WipeHold {
                    at_ms: 2000,
                    hold_ms: 11000,
                },
            ]
        );
    }

    #[test]
    fn test_capacity_bounds() {
        let mut config = ControllerConfig::parse("").unwrap();
        config.store.capacity = MIN_STORE_CAPACITY - 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        config.store.capacity = MAX_STORE_CAPACITY + 1;
        assert!(config.validate().is_err());

        config.store.capacity = MIN_STORE_CAPACITY;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_longer_than_window_rejected() {
        let mut config = ControllerConfig::parse("").unwrap();
        config.timing.wipe_confirm_ms = 100;
        config.timing.wipe_poll_ms = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cycle_time_rejected() {
        let mut config = ControllerConfig::parse("").unwrap();
        config.timing.cycle_time_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(ControllerConfig::parse("[store]\nsize = 12\n").is_err());
        assert!(ControllerConfig::parse("bogus = true\n").is_err());
    }

    #[test]
    fn test_wipe_scope_parsing() {
        let config = ControllerConfig::parse("[wipe]\nruntime_scope = \"master_only\"\n").unwrap();
        assert_eq!(config.wipe.runtime_scope, WipeScope::MasterOnly);
    }
}
