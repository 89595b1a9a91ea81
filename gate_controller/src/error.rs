//! Controller error taxonomy.
//!
//! Recoverable registry outcomes (`DuplicateCredential`, `NotFound`,
//! `RegistryFull`) never reach this type during the run loop: the mode
//! state machine turns them into annunciations. What is left is fatal.

use crate::registry::RegistryError;
use gate_common::config::ConfigError;
use gate_common::hal::driver::HalError;
use thiserror::Error;

/// Fatal controller errors.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    /// Store or reader not usable. Halts the control loop.
    #[error("Medium unavailable: {0}")]
    MediumUnavailable(String),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Driver lookup or backend error outside the medium.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Registry operation rejected outside the enrollment protocol.
    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for ControllerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Store(e) => Self::MediumUnavailable(e.to_string()),
            other => Self::Registry(other),
        }
    }
}

impl ControllerError {
    /// Returns true if the loop must halt until physical reset.
    pub const fn is_medium_failure(&self) -> bool {
        matches!(self, Self::MediumUnavailable(_))
    }
}
