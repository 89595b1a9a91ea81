//! # Gate Controller Library
//!
//! Access controller with a persistent credential registry and pluggable
//! collaborator backends.
//!
//! This crate provides the controller binary and the modules it is built
//! from. Backends implement the `AccessDriver` trait defined in
//! `gate_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`registry`] - Credential registry over a byte-addressed store
//! - [`state`] - Normal / Enrollment mode state machine
//! - [`wipe`] - Wipe confirmation window
//! - [`core`] - ControllerCore struct, boot sequence and control loop
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Backend implementations
//! - [`error`] - Controller error taxonomy
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    gate_controller (single crate)                │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │ Mode State  │◄──►│ControllerCore│◄──►│  Driver Registry    │  │
//! │  │  Machine    │    │ (poll loop)  │    │                     │  │
//! │  └──────┬──────┘    └──────┬───────┘    └─────────────────────┘  │
//! │         ▼                  ▼                                     │
//! │  ┌─────────────┐   ┌────────────────┐                            │
//! │  │ Credential  │   │  Peripherals   │ (trait objects)            │
//! │  │  Registry   │──►│ store, reader, │                            │
//! │  └─────────────┘   │ wipe, annunc.  │                            │
//! │                    └────────────────┘                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod error;
pub mod registry;
pub mod state;
pub mod wipe;

// Re-export key types for convenience
pub use crate::core::{ControllerCore, CycleReport, CycleStats};
pub use crate::driver_registry::{DriverInfo, DriverRegistry};
pub use crate::error::ControllerError;
pub use crate::registry::{CredentialRegistry, RegistryError, RegistrySnapshot};
pub use crate::state::{Mode, ModeStateMachine};
pub use crate::wipe::{WipeDecision, WipeGuard};
