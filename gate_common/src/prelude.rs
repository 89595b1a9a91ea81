//! Prelude module for common re-exports.
//!
//! Consumers can do `use gate_common::prelude::*;` and get the most
//! important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use gate_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::hal::config::{ControllerConfig, WipeScope};

// ─── Layout ─────────────────────────────────────────────────────────
pub use crate::consts::{ID_LEN, INIT_MARKER, MAX_SLOTS, max_slots_for};

// ─── Credentials & collaborators ────────────────────────────────────
pub use crate::credential::Identifier;
pub use crate::hal::driver::{
    AccessDriver, Annunciator, ByteStore, Clock, CredentialReader, HalError, SystemClock,
    WipeControl,
};
pub use crate::hal::types::{Annunciation, FailureReason, Peripherals, ReaderInfo};
