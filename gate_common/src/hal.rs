//! Hardware abstraction for the controller's collaborators.
//!
//! This module contains the traits a backend implements (store, reader,
//! wipe control, annunciator, clock), the commands exchanged with them and
//! the controller configuration.

pub mod config;
pub mod driver;
pub mod types;
