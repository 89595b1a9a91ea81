//! Normal / Enrollment mode transitions.
//!
//! Each scanned identifier is interpreted by mode:
//!
//! | Mode | Scan | Outcome | Next mode |
//! |------|------|---------|-----------|
//! | Normal | master | `EnrollEntered` | Enrollment |
//! | Normal | enrolled | `GrantedPulse` | Normal |
//! | Normal | unknown | `DeniedHold` | Normal |
//! | Enrollment | master | `EnrollExited` | Normal |
//! | Enrollment | enrolled | `EnrollRemoved` | Enrollment |
//! | Enrollment | unknown | `EnrollAdded` / `EnrollFailed` | Enrollment |

use crate::registry::{CredentialRegistry, RegistryError};
use gate_common::credential::Identifier;
use gate_common::hal::driver::ByteStore;
use gate_common::hal::types::Annunciation;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Controller operating mode. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Grant or deny access.
    #[default]
    Normal,
    /// Add or remove credentials.
    Enrollment,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Enrollment => f.write_str("enrollment"),
        }
    }
}

/// Mode manager holding the current mode.
#[derive(Debug, Clone, Default)]
pub struct ModeStateMachine {
    mode: Mode,
}

impl ModeStateMachine {
    /// Create a new state machine in Normal mode.
    pub const fn new() -> Self {
        Self { mode: Mode::Normal }
    }

    /// Current mode.
    #[inline]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Check if enrollment mode is active.
    #[inline]
    pub const fn is_enrollment(&self) -> bool {
        matches!(self.mode, Mode::Enrollment)
    }

    /// Force Normal mode (after a wipe).
    #[inline]
    pub fn reset(&mut self) {
        self.mode = Mode::Normal;
    }

    /// Annunciation for a cycle without a scan.
    pub const fn idle_annunciation(&self) -> Annunciation {
        match self.mode {
            Mode::Normal => Annunciation::IdleNormal,
            Mode::Enrollment => Annunciation::IdleEnrollmentCycle,
        }
    }

    /// Interpret one scanned identifier.
    ///
    /// Recoverable registry refusals are returned as `EnrollFailed` with the
    /// mode unchanged. Only medium failures come back as `Err`.
    pub fn handle_scan<S: ByteStore>(
        &mut self,
        registry: &mut CredentialRegistry<S>,
        id: Identifier,
    ) -> Result<Annunciation, RegistryError> {
        if registry.is_master(&id) {
            return Ok(match self.mode {
                Mode::Enrollment => {
                    info!("Master scanned, leaving enrollment mode");
                    self.mode = Mode::Normal;
                    Annunciation::EnrollExited
                }
                Mode::Normal => {
                    let slot_count = u8::try_from(registry.slot_count()?).unwrap_or(u8::MAX);
                    info!("Master scanned, entering enrollment mode");
                    self.mode = Mode::Enrollment;
                    Annunciation::EnrollEntered { slot_count }
                }
            });
        }

        match self.mode {
            Mode::Normal => {
                if registry.contains(&id)? {
                    info!(credential = %id, "Access granted");
                    Ok(Annunciation::GrantedPulse)
                } else {
                    info!(credential = %id, "Access denied");
                    Ok(Annunciation::DeniedHold)
                }
            }
            Mode::Enrollment => {
                let outcome = if registry.contains(&id)? {
                    registry.remove(&id).map(|slot| {
                        info!(credential = %id, slot, "Credential removed");
                        Annunciation::EnrollRemoved
                    })
                } else {
                    registry.add(id).map(|slot| {
                        info!(credential = %id, slot, "Credential added");
                        Annunciation::EnrollAdded
                    })
                };
                recover(outcome)
            }
        }
    }
}

/// Turn recoverable refusals into a failure annunciation.
fn recover(outcome: Result<Annunciation, RegistryError>) -> Result<Annunciation, RegistryError> {
    match outcome {
        Ok(annunciation) => Ok(annunciation),
        Err(err) => match err.failure_reason() {
            Some(reason) => {
                debug!("Enrollment refused: {err}");
                Ok(Annunciation::EnrollFailed { reason })
            }
            None => Err(err),
        },
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
