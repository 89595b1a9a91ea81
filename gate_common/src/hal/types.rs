//! Annunciation commands and collaborator data types.
//!
//! This module defines:
//! - `Annunciation` - Commands from the controller to the annunciator
//! - `FailureReason` - Why an enrollment operation was refused
//! - `ReaderInfo` - Reader self-check result
//! - `Peripherals` - The set of collaborators opened by a driver

use crate::hal::driver::{Annunciator, ByteStore, Clock, CredentialReader, WipeControl};
use std::fmt;

/// Why an enrollment add/remove was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Identifier already enrolled or equal to the master.
    DuplicateCredential,
    /// Identifier not enrolled.
    NotFound,
    /// No free slot left.
    RegistryFull,
    /// Identifier equals the empty-slot pattern and cannot be stored.
    Unstorable,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DuplicateCredential => "credential already known",
            Self::NotFound => "credential not enrolled",
            Self::RegistryFull => "registry full",
            Self::Unstorable => "credential cannot be stored",
        };
        f.write_str(text)
    }
}

/// Command sent from the controller to the annunciator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annunciation {
    /// Steady idle indication, actuator locked.
    IdleNormal,
    /// Colour cycle while in enrollment mode.
    IdleEnrollmentCycle,
    /// Access granted, actuator pulsed open.
    GrantedPulse,
    /// Access denied, actuator held locked.
    DeniedHold,
    /// Master scanned in normal mode.
    EnrollEntered {
        /// Enrolled credentials currently stored.
        slot_count: u8,
    },
    /// Master scanned in enrollment mode.
    EnrollExited,
    /// Credential added to the registry.
    EnrollAdded,
    /// Credential removed from the registry.
    EnrollRemoved,
    /// Add or remove refused.
    EnrollFailed {
        /// Refusal reason.
        reason: FailureReason,
    },
    /// Wipe control held, confirmation window open.
    WipeArmed,
    /// Wipe executed.
    WipeDone,
    /// Wipe control released before the window elapsed.
    WipeCancelled,
    /// Store unprovisioned, waiting for the master scan.
    MasterUndefinedPrompt,
    /// Master credential stored.
    MasterDefined,
    /// Fatal condition, control loop stopped.
    Halted,
}

impl Annunciation {
    /// Human-readable log line for this command.
    pub fn message(&self) -> String {
        match self {
            Self::IdleNormal => "Waiting for credentials".to_string(),
            Self::IdleEnrollmentCycle => "Enrollment mode: scan a credential to add or remove".to_string(),
            Self::GrantedPulse => "Access granted".to_string(),
            Self::DeniedHold => "Access denied".to_string(),
            Self::EnrollEntered { slot_count } => {
                format!("Entered enrollment mode, {slot_count} record(s) stored")
            }
            Self::EnrollExited => "Exiting enrollment mode".to_string(),
            Self::EnrollAdded => "Credential added to registry".to_string(),
            Self::EnrollRemoved => "Credential removed from registry".to_string(),
            Self::EnrollFailed { reason } => format!("Enrollment failed: {reason}"),
            Self::WipeArmed => "Wipe control held, release to cancel".to_string(),
            Self::WipeDone => "Store wiped".to_string(),
            Self::WipeCancelled => "Wipe cancelled".to_string(),
            Self::MasterUndefinedPrompt => {
                "No master credential defined, scan a credential to define it".to_string()
            }
            Self::MasterDefined => "Master credential defined".to_string(),
            Self::Halted => "System halted, check reader connection".to_string(),
        }
    }

    /// Returns true for failure patterns.
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::DeniedHold | Self::EnrollFailed { .. } | Self::Halted
        )
    }
}

/// Reader self-check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderInfo {
    /// Firmware version register.
    pub firmware_version: u8,
}

impl ReaderInfo {
    /// `0x00` and `0xFF` mean the bus returned nothing.
    pub const fn is_responding(&self) -> bool {
        !matches!(self.firmware_version, 0x00 | 0xFF)
    }

    /// Firmware description for the boot log.
    pub const fn describe(&self) -> &'static str {
        match self.firmware_version {
            0x91 => "v1.0",
            0x92 => "v2.0",
            _ => "unknown",
        }
    }
}

/// Collaborators opened by a driver.
pub struct Peripherals {
    /// Persistent registry medium.
    pub store: Box<dyn ByteStore>,
    /// Tag reader.
    pub reader: Box<dyn CredentialReader>,
    /// Wipe control.
    pub wipe_control: Box<dyn WipeControl>,
    /// Indicator/actuator sink.
    pub annunciator: Box<dyn Annunciator>,
    /// Time source for cycle pacing and confirmation windows.
    pub clock: Box<dyn Clock>,
}

impl fmt::Debug for Peripherals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peripherals")
            .field("store_capacity", &self.store.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_info_responding() {
        assert!(!ReaderInfo { firmware_version: 0x00 }.is_responding());
        assert!(!ReaderInfo { firmware_version: 0xFF }.is_responding());
        assert!(ReaderInfo { firmware_version: 0x92 }.is_responding());
        assert!(ReaderInfo { firmware_version: 0x12 }.is_responding());
    }

    #[test]
    fn test_reader_info_describe() {
        assert_eq!(ReaderInfo { firmware_version: 0x91 }.describe(), "v1.0");
        assert_eq!(ReaderInfo { firmware_version: 0x92 }.describe(), "v2.0");
        assert_eq!(ReaderInfo { firmware_version: 0x88 }.describe(), "unknown");
    }

    #[test]
    fn test_annunciation_messages() {
        let msg = Annunciation::EnrollEntered { slot_count: 3 }.message();
        assert!(msg.contains("3 record(s)"));

        let msg = Annunciation::EnrollFailed {
            reason: FailureReason::RegistryFull,
        }
        .message();
        assert!(msg.contains("registry full"));
    }

    #[test]
    fn test_failure_classification() {
        assert!(Annunciation::DeniedHold.is_failure());
        assert!(
            Annunciation::EnrollFailed {
                reason: FailureReason::NotFound
            }
            .is_failure()
        );
        assert!(!Annunciation::GrantedPulse.is_failure());
        assert!(!Annunciation::WipeCancelled.is_failure());
    }
}
