//! Gate Common Library
//!
//! This crate provides the shared building blocks for the gate workspace:
//! the on-medium registry layout, the credential identifier type, the
//! collaborator traits implemented by hardware backends and the
//! configuration loading utilities.
//!
//! # Module Structure
//!
//! - [`consts`] - Registry layout constants and default limits
//! - [`credential`] - Fixed-length credential identifier
//! - [`hal`] - Collaborator traits, annunciation types and controller configuration
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! gate_common = { path = "../gate_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use gate_common::consts::*;
//! use gate_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod credential;
pub mod hal;
pub mod prelude;
