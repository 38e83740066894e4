//! Service identity keys.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ZenithError;

/// The 128-bit key identifying a service class or interface.
///
/// The layout is the classic registry GUID shape: one 32-bit field, two
/// 16-bit fields, eight bytes. Two identities name the same service class
/// iff all sixteen bytes match; ordering is lexicographic over the
/// canonical byte form so identities can key sorted containers with a
/// deterministic iteration order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceIdentity {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl ServiceIdentity {
    /// The all-zero identity, used as a sentinel for "no identity".
    pub const NULL: ServiceIdentity = ServiceIdentity::new(0, 0, 0, [0; 8]);

    /// Creates an identity from its four fields.
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Derives a stable identity from a UTF-8 name.
    ///
    /// Used for components discovered without a sidecar manifest: the
    /// first sixteen bytes of the name's BLAKE3 hash become the key, so
    /// the same file name always maps to the same identity.
    pub fn from_name(name: &str) -> Self {
        let hash = blake3::hash(name.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self::from_bytes(bytes)
    }

    /// Returns the canonical big-endian byte form.
    pub fn to_bytes(self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&self.data1.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.data2.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.data3.to_be_bytes());
        bytes[8..16].copy_from_slice(&self.data4);
        bytes
    }

    /// Reconstructs an identity from its canonical byte form.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self {
            data1: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_be_bytes([bytes[4], bytes[5]]),
            data3: u16::from_be_bytes([bytes[6], bytes[7]]),
            data4: [
                bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14],
                bytes[15],
            ],
        }
    }

    /// Returns true for the all-zero sentinel.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl Ord for ServiceIdentity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl PartialOrd for ServiceIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
    }
}

impl FromStr for ServiceIdentity {
    type Err = ZenithError;

    /// Parses the braced text form, e.g.
    /// `{00000000-0000-0000-0000-000000000000}`. Braces are optional and
    /// hex digits are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ZenithError::InvalidParameter(format!("malformed service identity: {s}"));

        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed);

        let groups: Vec<&str> = inner.split('-').collect();
        let [g1, g2, g3, g4, g5] = groups.as_slice() else {
            return Err(invalid());
        };

        if g1.len() != 8 || g2.len() != 4 || g3.len() != 4 || g4.len() != 4 || g5.len() != 12 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 16];
        let hex = format!("{g1}{g2}{g3}{g4}{g5}");
        for (i, chunk) in hex.as_bytes().chunks_exact(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| invalid())?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }

        Ok(Self::from_bytes(bytes))
    }
}

impl Serialize for ServiceIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
