//! Access driver selection.
//!
//! The binary resolves the `driver` named in [`ControllerConfig`] here and
//! receives the opened [`Peripherals`]. `--inspect` lists the known drivers
//! next to the stored registry.

use gate_common::hal::config::ControllerConfig;
use gate_common::hal::driver::{AccessDriver, ByteStore, DriverFactory, HalError};
use gate_common::hal::types::Peripherals;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One known driver as reported by `--inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    /// Name used in the `driver` config key.
    pub name: &'static str,
    /// Version reported by the driver.
    pub version: &'static str,
    /// Selected by the current configuration.
    pub active: bool,
}

/// Drivers the controller can boot with, keyed by config name.
pub struct DriverRegistry {
    factories: BTreeMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Create a registry holding every built-in driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory under `name`.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.insert(name, factory).is_some() {
            panic!("Driver '{name}' is already registered");
        }
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn AccessDriver>, HalError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// Create the driver selected by `config` and open its peripherals.
    ///
    /// # Errors
    /// `DriverNotFound` for an unknown name, otherwise whatever the driver's
    /// `open` reports.
    pub fn open(
        &self,
        config: &ControllerConfig,
    ) -> Result<(Box<dyn AccessDriver>, Peripherals), HalError> {
        let mut driver = self.create_driver(&config.driver)?;
        info!("Created driver: {} v{}", driver.name(), driver.version());

        let peripherals = driver.open(config)?;
        debug!(
            "Driver {} opened a {} byte store",
            driver.name(),
            peripherals.store.capacity()
        );
        Ok((driver, peripherals))
    }

    /// Registered driver names in sorted order.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Describe every registered driver, marking the one named `active`.
    pub fn describe(&self, active: &str) -> Vec<DriverInfo> {
        self.factories
            .iter()
            .map(|(&name, factory)| DriverInfo {
                name,
                version: factory().version(),
                active: name == active,
            })
            .collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
