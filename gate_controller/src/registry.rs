//! Credential registry.
//!
//! The registry owns the on-medium layout described in
//! [`gate_common::consts`] and is the only code that writes to the store.
//! The store is the source of truth: the slot count is read back on every
//! operation, only the master identifier is mirrored in memory.
//!
//! # Write ordering
//!
//! The medium has no transactions and only single-byte writes are atomic.
//! Every mutation is ordered so that a sequence cut by power loss leaves a
//! state [`CredentialRegistry::open`] recognises and settles:
//!
//! | Operation | Order |
//! |-----------|-------|
//! | `add` | slot bytes, then count |
//! | `remove` | count lowered below the hole, then per slot: copy down, raise count; then zero trailing slot |
//! | `define_master` | identifier bytes, marker, then evict the identifier from the slots |
//! | `wipe` | marker, count, then every other byte |
//!
//! The count always stops short of the slot being rewritten, so a torn
//! identifier is never visible. Slots past the count are zero in a settled
//! store, which is why the all-zero identifier cannot be enrolled. On open:
//!
//! | Found | Meaning | Repair |
//! |-------|---------|--------|
//! | unprovisioned, nonzero slot past the count | cut `wipe` | zero it |
//! | nonzero slot at count + 2 | cut `remove` | resume compaction at count + 1 |
//! | nonzero slot at count + 1 only | cut `add` or tail zeroing | zero it |
//! | last two counted slots equal | remove cut after an unordered shift | lower the count |
//! | master in a slot | cut `define_master` | remove the slot |
//!
//! All writes go through [`ByteStore::update`], so bytes that already hold
//! the target value are not rewritten.

use gate_common::consts::{
    ID_LEN, INIT_MARKER, INIT_MARKER_ADDR, MASTER_ADDR, MAX_SLOTS, MIN_STORE_CAPACITY,
    SLOT_COUNT_ADDR, max_slots_for, slot_addr,
};
use gate_common::credential::Identifier;
use gate_common::hal::driver::{ByteStore, HalError};
use gate_common::hal::types::FailureReason;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Identifier already enrolled or equal to the master.
    #[error("credential already enrolled or equal to master")]
    DuplicateCredential,

    /// Identifier not enrolled.
    #[error("credential not enrolled")]
    NotFound,

    /// Every slot is occupied.
    #[error("registry full ({capacity} slots)")]
    RegistryFull {
        /// Slot capacity of the store.
        capacity: usize,
    },

    /// `define_master` on a provisioned store.
    #[error("master credential already defined")]
    AlreadyProvisioned,

    /// The all-zero identifier marks an empty slot.
    #[error("all-zero credential cannot be enrolled")]
    Unstorable,

    /// Underlying medium failure.
    #[error(transparent)]
    Store(#[from] HalError),
}

impl RegistryError {
    /// Annunciation reason for recoverable errors, `None` for medium failures.
    pub const fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::DuplicateCredential => Some(FailureReason::DuplicateCredential),
            Self::NotFound => Some(FailureReason::NotFound),
            Self::RegistryFull { .. } => Some(FailureReason::RegistryFull),
            Self::Unstorable => Some(FailureReason::Unstorable),
            Self::AlreadyProvisioned | Self::Store(_) => None,
        }
    }
}

/// Serializable view of the store contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    /// Init marker holds the sentinel.
    pub provisioned: bool,
    /// Master identifier when provisioned.
    pub master: Option<Identifier>,
    /// Slot capacity derived from the store size.
    pub capacity: usize,
    /// Enrolled identifiers in slot order.
    pub slots: Vec<Identifier>,
}

/// Fixed-capacity credential registry on a [`ByteStore`].
pub struct CredentialRegistry<S: ByteStore> {
    store: S,
    master: Option<Identifier>,
    max_slots: usize,
}

impl<S: ByteStore> CredentialRegistry<S> {
    /// Open the registry on `store`, load the master identifier and settle
    /// any mutation cut short by power loss.
    ///
    /// # Errors
    /// `HalError::InitFailed` if the store cannot hold the header and one slot.
    pub fn open(store: S) -> Result<Self, RegistryError> {
        let capacity = store.capacity();
        if capacity < MIN_STORE_CAPACITY {
            return Err(HalError::InitFailed(format!(
                "store capacity {capacity} below minimum {MIN_STORE_CAPACITY}"
            ))
            .into());
        }

        let mut registry = Self {
            store,
            master: None,
            max_slots: max_slots_for(capacity),
        };
        registry.reload()?;
        if registry.settle()? {
            info!("Registry repaired after interrupted write");
        }

        debug!(
            "Registry opened: capacity={} bytes, {} slots, provisioned={}",
            capacity,
            registry.max_slots,
            registry.is_provisioned()
        );
        Ok(registry)
    }

    /// Re-read the init marker and master identifier from the store.
    pub fn reload(&mut self) -> Result<(), RegistryError> {
        self.master = if self.store.read(INIT_MARKER_ADDR)? == INIT_MARKER {
            Some(self.read_id(MASTER_ADDR)?)
        } else {
            None
        };
        Ok(())
    }

    /// Returns true once a master identifier has been defined.
    #[inline]
    pub fn is_provisioned(&self) -> bool {
        self.master.is_some()
    }

    /// Master identifier, if defined.
    #[inline]
    pub fn master(&self) -> Option<Identifier> {
        self.master
    }

    /// Returns true if `id` is the master identifier.
    #[inline]
    pub fn is_master(&self, id: &Identifier) -> bool {
        self.master.as_ref() == Some(id)
    }

    /// Number of slots the store can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_slots
    }

    /// Number of enrolled identifiers.
    ///
    /// A stored count beyond the layout limit is clamped.
    pub fn slot_count(&self) -> Result<usize, RegistryError> {
        let raw = self.store.read(SLOT_COUNT_ADDR)? as usize;
        if raw > self.max_slots {
            warn!(
                "Stored slot count {} exceeds capacity {}, clamping",
                raw, self.max_slots
            );
            return Ok(self.max_slots);
        }
        Ok(raw)
    }

    /// Identifier stored in 1-indexed `slot`.
    pub fn read_slot(&self, slot: usize) -> Result<Identifier, RegistryError> {
        debug_assert!(slot >= 1 && slot <= self.max_slots);
        self.read_id(slot_addr(slot))
    }

    /// First slot holding `id`. The master never matches.
    pub fn find(&self, id: &Identifier) -> Result<Option<usize>, RegistryError> {
        if self.is_master(id) {
            return Ok(None);
        }
        self.position(id)
    }

    /// Returns true if `id` is enrolled.
    pub fn contains(&self, id: &Identifier) -> Result<bool, RegistryError> {
        Ok(self.find(id)?.is_some())
    }

    /// Append `id` to the slot array and return its slot.
    ///
    /// # Errors
    /// - `DuplicateCredential` if `id` is enrolled or is the master
    /// - `RegistryFull` if every slot is occupied
    /// - `Unstorable` for the all-zero identifier
    pub fn add(&mut self, id: Identifier) -> Result<usize, RegistryError> {
        if id.is_zero() {
            return Err(RegistryError::Unstorable);
        }
        if self.is_master(&id) || self.find(&id)?.is_some() {
            return Err(RegistryError::DuplicateCredential);
        }

        let count = self.slot_count()?;
        if count >= self.max_slots {
            return Err(RegistryError::RegistryFull {
                capacity: self.max_slots,
            });
        }

        let slot = count + 1;
        self.write_id(slot_addr(slot), &id)?;
        self.store.update(SLOT_COUNT_ADDR, slot as u8)?;

        info!("Added {} to slot {}", id, slot);
        Ok(slot)
    }

    /// Remove `id`, compacting the slot array. Returns the slot it occupied.
    ///
    /// # Errors
    /// `NotFound` if `id` is not enrolled.
    pub fn remove(&mut self, id: &Identifier) -> Result<usize, RegistryError> {
        let slot = self.find(id)?.ok_or(RegistryError::NotFound)?;
        self.remove_slot(slot)?;
        info!("Removed {} from slot {}", id, slot);
        Ok(slot)
    }

    /// Store `id` as the master identifier.
    ///
    /// If `id` is currently enrolled (possible after a master-only wipe) its
    /// slot is removed once the marker is set, so the master never appears
    /// in a slot.
    ///
    /// # Errors
    /// `AlreadyProvisioned` if a master is already defined.
    pub fn define_master(&mut self, id: Identifier) -> Result<(), RegistryError> {
        if self.is_provisioned() {
            return Err(RegistryError::AlreadyProvisioned);
        }

        let enrolled = self.position(&id)?;
        self.write_id(MASTER_ADDR, &id)?;
        self.store.update(INIT_MARKER_ADDR, INIT_MARKER)?;
        self.master = Some(id);

        if let Some(slot) = enrolled {
            warn!("New master {} was enrolled in slot {}, removing it", id, slot);
            self.remove_slot(slot)?;
        }

        info!("Master credential defined: {}", id);
        Ok(())
    }

    /// Clear the init marker, keeping enrolled slots.
    pub fn clear_master(&mut self) -> Result<(), RegistryError> {
        self.store.update(INIT_MARKER_ADDR, 0)?;
        self.master = None;
        info!("Master credential erased");
        Ok(())
    }

    /// Zero the whole store, marker first. Returns the number of bytes
    /// actually written.
    pub fn wipe(&mut self) -> Result<usize, RegistryError> {
        let mut written = usize::from(self.store.update(INIT_MARKER_ADDR, 0)?);
        self.master = None;

        for address in 0..self.store.capacity() {
            if self.store.update(address, 0)? {
                written += 1;
            }
        }

        info!(
            "Store wiped: {} of {} bytes written",
            written,
            self.store.capacity()
        );
        Ok(written)
    }

    /// Enrolled identifiers in slot order.
    pub fn entries(&self) -> Result<heapless::Vec<Identifier, MAX_SLOTS>, RegistryError> {
        // slot_count() never exceeds MAX_SLOTS.
        (1..=self.slot_count()?)
            .map(|slot| self.read_slot(slot))
            .collect()
    }

    /// Serializable view of the store.
    pub fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        Ok(RegistrySnapshot {
            provisioned: self.is_provisioned(),
            master: self.master,
            capacity: self.max_slots,
            slots: self.entries()?.into_iter().collect(),
        })
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the registry, returning the store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn position(&self, id: &Identifier) -> Result<Option<usize>, RegistryError> {
        let count = self.slot_count()?;
        for slot in 1..=count {
            if self.read_slot(slot)? == *id {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    fn remove_slot(&mut self, slot: usize) -> Result<(), RegistryError> {
        let count = self.slot_count()?;
        debug_assert!(slot >= 1 && slot <= count);

        self.store.update(SLOT_COUNT_ADDR, (slot - 1) as u8)?;
        self.compact(slot, count)?;

        debug!("Compacted slots {}..={} after removing slot {}", slot + 1, count, slot);
        Ok(())
    }

    /// Shift slots `hole + 1..=last` down one and zero slot `last`.
    ///
    /// The stored count must be `hole - 1`; it is raised behind each copy.
    fn compact(&mut self, hole: usize, last: usize) -> Result<(), RegistryError> {
        for slot in hole..last {
            let next = self.read_slot(slot + 1)?;
            self.write_id(slot_addr(slot), &next)?;
            self.store.update(SLOT_COUNT_ADDR, slot as u8)?;
        }
        self.write_id(slot_addr(last), &Identifier::ZERO)?;
        Ok(())
    }

    /// Finish or discard a mutation cut short by power loss.
    /// Returns true if anything was rewritten.
    fn settle(&mut self) -> Result<bool, RegistryError> {
        let count = self.slot_count()?;
        let mut repaired = false;

        if !self.is_provisioned() {
            for slot in count + 1..=self.max_slots {
                repaired |= self.write_id(slot_addr(slot), &Identifier::ZERO)?;
            }
            if repaired {
                warn!("Zeroed stale slots past count {} left by interrupted wipe", count);
            }
            return Ok(repaired);
        }

        if count + 2 <= self.max_slots && !self.read_slot(count + 2)?.is_zero() {
            let mut last = count + 2;
            while last < self.max_slots && !self.read_slot(last + 1)?.is_zero() {
                last += 1;
            }
            warn!(
                "Resuming compaction of slots {}..={} after interrupted remove",
                count + 2,
                last
            );
            self.compact(count + 1, last)?;
            repaired = true;
        } else if count < self.max_slots
            && self.write_id(slot_addr(count + 1), &Identifier::ZERO)?
        {
            warn!("Discarded partial slot {} past the count", count + 1);
            repaired = true;
        }

        let count = self.slot_count()?;
        if count >= 2 && self.read_slot(count)? == self.read_slot(count - 1)? {
            warn!("Slot {} duplicates slot {}, dropping it", count, count - 1);
            self.store.update(SLOT_COUNT_ADDR, (count - 1) as u8)?;
            self.write_id(slot_addr(count), &Identifier::ZERO)?;
            repaired = true;
        }

        if let Some(master) = self.master {
            if let Some(slot) = self.position(&master)? {
                warn!("Master {} still enrolled in slot {}, removing it", master, slot);
                self.remove_slot(slot)?;
                repaired = true;
            }
        }

        Ok(repaired)
    }

    fn read_id(&self, address: usize) -> Result<Identifier, RegistryError> {
        let mut bytes = [0u8; ID_LEN];
        for (offset, byte) in bytes.iter_mut().enumerate() {
            *byte = self.store.read(address + offset)?;
        }
        Ok(Identifier::new(bytes))
    }

    /// Returns true if any byte changed.
    fn write_id(&mut self, address: usize, id: &Identifier) -> Result<bool, RegistryError> {
        let mut written = false;
        for (offset, byte) in id.as_bytes().iter().enumerate() {
            written |= self.store.update(address + offset, *byte)?;
        }
        Ok(written)
    }
}
