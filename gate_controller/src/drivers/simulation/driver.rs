//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `AccessDriver` trait to provide a
//! software store, a scripted reader and wipe button and an LED/relay model
//! for development and testing without physical hardware.

use super::io::{LedAnnunciator, ScriptedReader, ScriptedWipeControl};
use super::store::{FileStore, MemoryStore};
use gate_common::hal::config::ControllerConfig;
use gate_common::hal::driver::{AccessDriver, ByteStore, HalError, SystemClock};
use gate_common::hal::types::Peripherals;
use tracing::info;

/// Simulation driver implementing the AccessDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Peripherals handed out
    opened: bool,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            opened: false,
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn open(&mut self, config: &ControllerConfig) -> Result<Peripherals, HalError> {
        if self.opened {
            return Err(HalError::InitFailed(
                "simulation peripherals already opened".to_string(),
            ));
        }

        let sim = &config.simulation;
        info!(
            "Opening simulation driver: {} byte store ({}), {} scripted event(s)",
            config.store.capacity,
            sim.image_path
                .as_ref()
                .map_or_else(|| "in-memory".to_string(), |p| p.display().to_string()),
            sim.events.len()
        );

        let store: Box<dyn ByteStore> = match &sim.image_path {
            Some(path) => Box::new(FileStore::open(path, config.store.capacity)?),
            None => Box::new(MemoryStore::new(config.store.capacity)),
        };

        // One origin for every component so scripted offsets line up.
        let clock = SystemClock::new();

        self.opened = true;
        Ok(Peripherals {
            store,
            reader: Box::new(ScriptedReader::from_events(
                &sim.events,
                clock,
                sim.reader_version,
            )),
            wipe_control: Box::new(ScriptedWipeControl::from_events(&sim.events, clock)),
            annunciator: Box::new(LedAnnunciator::new(config.timing.clone(), clock)),
            clock: Box::new(clock),
        })
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Simulation driver shut down");
        self.opened = false;
        Ok(())
    }
}
