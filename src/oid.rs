// ABOUTME: The 12-byte BSON ObjectId: seconds, process-unique bytes and a counter.
// ABOUTME: Provides hex formatting and parsing plus component accessors.

use crate::error::{Error, Result};
use crate::generator::IdGenerator;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// A 12-byte identifier.
///
/// Layout, all big-endian: 4 bytes of seconds since the Unix epoch, 5
/// process-unique bytes and a 3-byte counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const LEN: usize = 12;

    /// Generate a fresh id from the process-wide generator.
    #[must_use]
    pub fn new() -> Self {
        IdGenerator::global().object_id()
    }

    /// Generate an id stamped with `time` from the process-wide generator.
    #[must_use]
    pub fn with_time<Tz: TimeZone>(time: DateTime<Tz>) -> Self {
        IdGenerator::global().object_id_at(time)
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub(crate) fn from_parts(seconds: u32, process_unique: [u8; 5], counter: u32) -> Self {
        let mut b = [0u8; 12];
        b[..4].copy_from_slice(&seconds.to_be_bytes());
        b[4..9].copy_from_slice(&process_unique);
        b[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(b)
    }

    #[must_use]
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    #[must_use]
    pub fn time(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(i64::from(self.timestamp()), 0)
            .single()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn process_unique(&self) -> [u8; 5] {
        let mut b = [0u8; 5];
        b.copy_from_slice(&self.0[4..9]);
        b
    }

    /// The 24-bit counter.
    #[must_use]
    pub fn counter(&self) -> u32 {
        u32::from_be_bytes([0, self.0[9], self.0[10], self.0[11]])
    }

    /// Lowercase 24-character hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the 24-character hex form. Both letter cases are accepted.
    pub fn parse_str(s: &str) -> Result<Self> {
        if s.len() != 2 * Self::LEN {
            return Err(Error::invalid(
                "objectId",
                format!("expected {} hex characters, got {}", 2 * Self::LEN, s.len()),
            ));
        }
        let mut b = [0u8; 12];
        hex::decode_to_slice(s, &mut b)
            .map_err(|e| Error::invalid("objectId", e.to_string()))?;
        Ok(Self(b))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId('{}')", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(b: [u8; 12]) -> Self {
        Self(b)
    }
}
