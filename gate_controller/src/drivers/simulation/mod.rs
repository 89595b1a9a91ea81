//! Simulation driver module.
//!
//! This module provides a software backend for development and testing
//! without a physical reader, EEPROM or indicator board.

mod driver;
mod io;
mod store;

pub use driver::SimulationDriver;
pub use io::{Indicators, LedAnnunciator, ManualClock, ScriptedReader, ScriptedWipeControl};
pub use store::{FileStore, MemoryStore};

use gate_common::hal::driver::AccessDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn AccessDriver> {
    Box::new(SimulationDriver::new())
}
