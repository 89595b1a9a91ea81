//! Registry layout constants and system-wide defaults.
//!
//! Single source of truth for the persistent store layout. The layout is
//! bit-exact with already provisioned devices:
//!
//! ```text
//! addr 0      slot count
//! addr 1      init marker (143 = master defined)
//! addr 2..=5  master identifier
//! addr 6..    slot array, 4 bytes per slot, 1-indexed
//! ```

use static_assertions::const_assert;

/// Length of a credential identifier in bytes.
pub const ID_LEN: usize = 4;

/// Address of the enrolled slot count.
pub const SLOT_COUNT_ADDR: usize = 0;

/// Address of the init marker byte.
pub const INIT_MARKER_ADDR: usize = 1;

/// First address of the master identifier.
pub const MASTER_ADDR: usize = 2;

/// First address of slot 1.
pub const SLOTS_ADDR: usize = MASTER_ADDR + ID_LEN;

/// Marker value meaning "master identifier defined".
pub const INIT_MARKER: u8 = 143;

/// Upper bound on slots imposed by the one-byte slot count.
pub const MAX_SLOTS: usize = u8::MAX as usize;

/// Smallest store that can hold the header and one slot.
pub const MIN_STORE_CAPACITY: usize = SLOTS_ADDR + ID_LEN;

/// Largest store accepted by configuration validation.
pub const MAX_STORE_CAPACITY: usize = 65_536;

/// Default store capacity in bytes (ATmega328 EEPROM).
pub const DEFAULT_STORE_CAPACITY: usize = 1024;

/// Default control loop cycle time in milliseconds.
pub const DEFAULT_CYCLE_TIME_MS: u64 = 50;

/// Default wipe confirmation window in milliseconds.
pub const DEFAULT_WIPE_CONFIRM_MS: u64 = 10_000;

/// Default wipe button sampling interval in milliseconds.
pub const DEFAULT_WIPE_POLL_MS: u64 = 500;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gate/controller.toml";

/// Canonical controller service name (used for logging).
pub const CONTROLLER_SERVICE_NAME: &str = "gate";

const_assert!(SLOTS_ADDR == 6);
const_assert!(MIN_STORE_CAPACITY <= DEFAULT_STORE_CAPACITY);
const_assert!(DEFAULT_WIPE_POLL_MS <= DEFAULT_WIPE_CONFIRM_MS);

/// Number of slots a store of `capacity` bytes can hold.
///
/// `(capacity - 6) / 4`, bounded by [`MAX_SLOTS`].
pub const fn max_slots_for(capacity: usize) -> usize {
    if capacity < SLOTS_ADDR {
        return 0;
    }
    let slots = (capacity - SLOTS_ADDR) / ID_LEN;
    if slots > MAX_SLOTS { MAX_SLOTS } else { slots }
}

/// First address of 1-indexed `slot`.
#[inline]
pub const fn slot_addr(slot: usize) -> usize {
    SLOTS_ADDR + (slot - 1) * ID_LEN
}
