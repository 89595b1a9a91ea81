//! Credential identifier type.
//!
//! An [`Identifier`] is the 4-byte UID read from a tag. It is opaque: the
//! only supported comparison is exact byte-wise equality.
//!
//! Text form is upper-case hex, optionally separated by `:`, `-` or spaces
//! (`"AA:BB:CC:DD"`, `"aabbccdd"`). This is what configuration files and
//! log lines use.

use crate::consts::ID_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing an identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierParseError {
    /// Wrong number of hex digits after removing separators.
    #[error("expected {expected} hex digits, found {found}")]
    Length {
        /// Required number of digits.
        expected: usize,
        /// Digits found.
        found: usize,
    },

    /// Non-hex character.
    #[error("invalid hex digit '{0}'")]
    InvalidDigit(char),
}

/// Fixed-length credential identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier([u8; ID_LEN]);

impl Identifier {
    /// All-zero identifier (the content of a wiped slot).
    pub const ZERO: Self = Self([0; ID_LEN]);

    /// Create an identifier from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Returns true if every byte is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; ID_LEN]
    }
}

impl From<[u8; ID_LEN]> for Identifier {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Identifier> for [u8; ID_LEN] {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}")
    }
}

impl FromStr for Identifier {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digits = Vec::with_capacity(ID_LEN * 2);
        for ch in s.trim().chars() {
            match ch {
                ':' | '-' | ' ' => continue,
                _ => {
                    let value = ch
                        .to_digit(16)
                        .ok_or(IdentifierParseError::InvalidDigit(ch))?;
                    digits.push(value as u8);
                }
            }
        }

        if digits.len() != ID_LEN * 2 {
            return Err(IdentifierParseError::Length {
                expected: ID_LEN * 2,
                found: digits.len(),
            });
        }

        let mut bytes = [0u8; ID_LEN];
        for (byte, pair) in bytes.iter_mut().zip(digits.chunks_exact(2)) {
            *byte = (pair[0] << 4) | pair[1];
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_string()
    }
}
