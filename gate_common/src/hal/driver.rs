//! Collaborator traits and error types.
//!
//! This module defines:
//! - `ByteStore` - Byte-addressable persistent medium without transactions
//! - `CredentialReader` - Tag reader producing fully read identifiers
//! - `WipeControl` - Physical control that arms a destructive wipe
//! - `Annunciator` - Indicator/actuator/log sink for controller outcomes
//! - `Clock` - Monotonic time and cooperative sleeping
//! - `AccessDriver` trait - Backend that opens all of the above
//! - `HalError` enum - Error types for collaborator operations
//! - `DriverFactory` type alias - Factory function type

use crate::credential::Identifier;
use crate::hal::config::ControllerConfig;
use crate::hal::types::{Annunciation, Peripherals, ReaderInfo};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error types for collaborator operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Backend initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Persistent medium I/O error
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// Store address outside the medium
    #[error("Address {address} out of range (capacity {capacity})")]
    AddressOutOfRange {
        /// Requested address.
        address: usize,
        /// Store capacity in bytes.
        capacity: usize,
    },
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn AccessDriver>;

/// Byte-addressable persistent medium.
///
/// Every `write` is durable on return; there are no transactions and no
/// atomicity across writes.
pub trait ByteStore {
    /// Total capacity in bytes.
    fn capacity(&self) -> usize;

    /// Read one byte.
    fn read(&self, address: usize) -> Result<u8, HalError>;

    /// Write one byte.
    fn write(&mut self, address: usize, value: u8) -> Result<(), HalError>;

    /// Write `value` only if the stored byte differs.
    ///
    /// Returns true if a write was issued.
    fn update(&mut self, address: usize, value: u8) -> Result<bool, HalError> {
        if self.read(address)? == value {
            return Ok(false);
        }
        self.write(address, value)?;
        Ok(true)
    }

    /// Bounds check shared by implementations.
    fn check_address(&self, address: usize) -> Result<(), HalError> {
        if address >= self.capacity() {
            return Err(HalError::AddressOutOfRange {
                address,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }
}

impl<S: ByteStore + ?Sized> ByteStore for Box<S> {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn read(&self, address: usize) -> Result<u8, HalError> {
        (**self).read(address)
    }

    fn write(&mut self, address: usize, value: u8) -> Result<(), HalError> {
        (**self).write(address, value)
    }

    fn update(&mut self, address: usize, value: u8) -> Result<bool, HalError> {
        (**self).update(address, value)
    }
}

/// Tag reader.
pub trait CredentialReader {
    /// Initialize the transceiver and report its firmware version.
    fn init(&mut self) -> Result<ReaderInfo, HalError>;

    /// Non-blocking poll.
    ///
    /// Returns an identifier only once a new tag has been fully read and
    /// halted. Partial reads are never reported.
    fn poll(&mut self) -> Option<Identifier>;
}

/// Physical wipe control (held = asserted).
pub trait WipeControl {
    /// Returns true while the control is held.
    fn is_held(&mut self) -> bool;
}

/// Indicator, actuator and log sink.
///
/// Pattern timing (pulse widths, hold durations) is owned by the
/// implementation and may block for its duration.
pub trait Annunciator {
    /// Render one command.
    fn annunciate(&mut self, command: &Annunciation);
}

/// Monotonic clock with cooperative sleep.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Suspend the control loop for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Backend that provides every collaborator of the controller.
///
/// # Lifecycle
///
/// 1. `open()` - Called once at boot; returns the peripherals
/// 2. `shutdown()` - Called when the controller is stopping
pub trait AccessDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Open the store, reader, wipe control, annunciator and clock.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` or `HalError::PersistenceError` if the
    /// medium cannot be brought up.
    fn open(&mut self, config: &ControllerConfig) -> Result<Peripherals, HalError>;

    /// Release backend resources.
    fn shutdown(&mut self) -> Result<(), HalError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecStore(Vec<u8>, usize);

    impl ByteStore for VecStore {
        fn capacity(&self) -> usize {
            self.0.len()
        }

        fn read(&self, address: usize) -> Result<u8, HalError> {
            self.check_address(address)?;
            Ok(self.0[address])
        }

        fn write(&mut self, address: usize, value: u8) -> Result<(), HalError> {
            self.check_address(address)?;
            self.1 += 1;
            self.0[address] = value;
            Ok(())
        }
    }

    #[test]
    fn test_hal_error_display() {
        let err = HalError::InitFailed("reader silent".to_string());
        assert!(err.to_string().contains("reader silent"));

        let err = HalError::AddressOutOfRange {
            address: 12,
            capacity: 10,
        };
        assert_eq!(err.to_string(), "Address 12 out of range (capacity 10)");
    }

    #[test]
    fn test_update_skips_unchanged_bytes() {
        let mut store = VecStore(vec![0; 8], 0);
        assert!(!store.update(3, 0).unwrap());
        assert_eq!(store.1, 0);
        assert!(store.update(3, 7).unwrap());
        assert!(!store.update(3, 7).unwrap());
        assert_eq!(store.1, 1);
    }

    #[test]
    fn test_boxed_store_delegates() {
        let mut store: Box<dyn ByteStore> = Box::new(VecStore(vec![0; 4], 0));
        store.write(1, 9).unwrap();
        assert_eq!(store.read(1).unwrap(), 9);
        assert_eq!(store.capacity(), 4);
        assert!(matches!(
            store.read(4),
            Err(HalError::AddressOutOfRange { address: 4, .. })
        ));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
