use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CodecError, Result};

pub const IDENTIFIER_LEN: usize = 32;

/// A fixed-width content identifier as stored on chain or in an index: the raw sha2-256 digest of the content,
/// without any multihash framing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentIdentifier([u8; IDENTIFIER_LEN]);

impl ContentIdentifier {
    pub const fn from_bytes(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the hex form, with or without a leading `0x`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.len() != IDENTIFIER_LEN * 2 {
            if digits.len() % 2 == 0 {
                return Err(CodecError::InvalidLength {
                    expected: IDENTIFIER_LEN,
                    actual: digits.len() / 2,
                });
            }
            return Err(CodecError::InvalidHex(format!("odd number of hex digits ({})", digits.len())));
        }

        let mut bytes = [0u8; IDENTIFIER_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl TryFrom<&[u8]> for ContentIdentifier {
    type Error = CodecError;

    fn try_from(value: &[u8]) -> Result<Self> {
        let bytes: [u8; IDENTIFIER_LEN] = value.try_into().map_err(|_| CodecError::InvalidLength {
            expected: IDENTIFIER_LEN,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl From<[u8; IDENTIFIER_LEN]> for ContentIdentifier {
    fn from(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for ContentIdentifier {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for ContentIdentifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentIdentifier({self})")
    }
}

impl Serialize for ContentIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
