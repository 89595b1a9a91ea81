//! Store backends for the simulation driver.
//!
//! - `MemoryStore` - volatile byte array, used for tests and dry runs
//! - `FileStore` - EEPROM image file, every write goes straight to disk

use gate_common::hal::driver::{ByteStore, HalError};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Volatile store backed by a `Vec<u8>`.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    bytes: Vec<u8>,
    writes: u64,
}

impl MemoryStore {
    /// Zero-filled store of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            writes: 0,
        }
    }

    /// Store pre-loaded with `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, writes: 0 }
    }

    /// Raw contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of byte writes issued since creation.
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl ByteStore for MemoryStore {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, address: usize) -> Result<u8, HalError> {
        self.check_address(address)?;
        Ok(self.bytes[address])
    }

    fn write(&mut self, address: usize, value: u8) -> Result<(), HalError> {
        self.check_address(address)?;
        self.bytes[address] = value;
        self.writes += 1;
        Ok(())
    }
}

/// Store persisted to an image file.
///
/// The file is exactly `capacity` bytes. Reads are served from an in-memory
/// mirror; writes update the mirror and the file before returning.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: File,
    mirror: Vec<u8>,
}

impl FileStore {
    /// Open or create the image at `path`.
    ///
    /// An image of the wrong size is zero-padded or truncated to `capacity`.
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self, HalError> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening store image {:?}", path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                HalError::PersistenceError(format!("Failed to create directory: {}", e))
            })?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                HalError::PersistenceError(format!("Failed to open store image {:?}: {}", path, e))
            })?;

        let mut mirror = Vec::with_capacity(capacity);
        file.read_to_end(&mut mirror).map_err(|e| {
            HalError::PersistenceError(format!("Failed to read store image {:?}: {}", path, e))
        })?;

        if mirror.len() != capacity {
            if !mirror.is_empty() {
                warn!(
                    "Store image {:?} is {} bytes, resizing to {}",
                    path,
                    mirror.len(),
                    capacity
                );
            }
            mirror.resize(capacity, 0);
            file.set_len(capacity as u64)
                .and_then(|_| file.seek(SeekFrom::Start(0)))
                .and_then(|_| file.write_all(&mirror))
                .and_then(|_| file.sync_all())
                .map_err(|e| {
                    HalError::PersistenceError(format!(
                        "Failed to initialize store image {:?}: {}",
                        path, e
                    ))
                })?;
        }

        info!("Store image {:?} ready ({} bytes)", path, capacity);
        Ok(Self { path, file, mirror })
    }

    /// Image file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStore for FileStore {
    fn capacity(&self) -> usize {
        self.mirror.len()
    }

    fn read(&self, address: usize) -> Result<u8, HalError> {
        self.check_address(address)?;
        Ok(self.mirror[address])
    }

    fn write(&mut self, address: usize, value: u8) -> Result<(), HalError> {
        self.check_address(address)?;
        self.file
            .seek(SeekFrom::Start(address as u64))
            .and_then(|_| self.file.write_all(&[value]))
            .and_then(|_| self.file.sync_data())
            .map_err(|e| {
                HalError::PersistenceError(format!(
                    "Failed to write address {} of {:?}: {}",
                    address, self.path, e
                ))
            })?;
        self.mirror[address] = value;
        Ok(())
    }
}
