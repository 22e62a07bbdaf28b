//! Normalized hardware addresses for tetherd

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string is not a valid hardware address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid device address: {0:?}")]
pub struct AddrParseError(pub String);

/// A wireless hardware address in colon-separated hex form.
///
/// All state in tetherd is keyed by this type. Parsing accepts upper-
/// or lower-case hex but normalizes to upper-case, so two spellings of
/// the same address always compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddr(String);

impl DeviceAddr {
    /// Parse and normalize an address string.
    ///
    /// Expects six 2-digit hex octets separated by `:`.
    pub fn parse(s: &str) -> Result<Self, AddrParseError> {
        let octets: Vec<&str> = s.split(':').collect();
        if octets.len() != 6 {
            return Err(AddrParseError(s.to_string()));
        }
        for octet in &octets {
            if octet.len() != 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(AddrParseError(s.to_string()));
            }
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DeviceAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DeviceAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
