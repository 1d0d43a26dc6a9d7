use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid byte size '{input}': {reason}")]
pub struct ByteSizeParseError {
    input: String,
    reason: &'static str,
}

/// A number of bytes that can be parsed from human readable strings such as "32mib" or "1.5gb".
///
/// Decimal units (kb, mb, gb, tb) are powers of 1000; binary units (kib, mib, gib, tib) are powers of 1024.
/// A bare number is a count of bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(u64);

impl ByteSize {
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn kib(n: u64) -> Self {
        Self(n * 1024)
    }

    pub const fn mib(n: u64) -> Self {
        Self(n * 1024 * 1024)
    }

    pub const fn gib(n: u64) -> Self {
        Self(n * 1024 * 1024 * 1024)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Deref for ByteSize {
    type Target = u64;

    fn deref(&self) -> &u64 {
        &self.0
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    let m = match unit {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "ki" | "kib" => 1 << 10,
        "mi" | "mib" => 1 << 20,
        "gi" | "gib" => 1 << 30,
        "ti" | "tib" => 1 << 40,
        _ => return None,
    };
    Some(m)
}

impl FromStr for ByteSize {
    type Err = ByteSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ByteSizeParseError {
            input: s.to_owned(),
            reason,
        };

        let normalized = s.trim().to_ascii_lowercase();
        let split = normalized
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(normalized.len());
        let (number, unit) = normalized.split_at(split);

        if number.is_empty() {
            return Err(err("missing number"));
        }

        let multiplier = unit_multiplier(unit.trim()).ok_or_else(|| err("unknown unit"))?;

        if let Ok(n) = number.parse::<u64>() {
            return n.checked_mul(multiplier).map(ByteSize).ok_or_else(|| err("value overflows u64"));
        }

        let n: f64 = number.parse().map_err(|_| err("invalid number"))?;
        let bytes = (n * multiplier as f64).round();
        if !bytes.is_finite() || bytes < 0. || bytes > u64::MAX as f64 {
            return Err(err("value out of range"));
        }
        Ok(ByteSize(bytes as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(&str, u64); 4] = [("TiB", 1 << 40), ("GiB", 1 << 30), ("MiB", 1 << 20), ("KiB", 1 << 10)];

        for (name, size) in UNITS {
            if self.0 >= size && self.0 % size == 0 {
                return write!(f, "{}{name}", self.0 / size);
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl fmt::Debug for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteSize({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!("1024".parse::<ByteSize>().unwrap(), ByteSize::new(1024));
        assert_eq!("32mib".parse::<ByteSize>().unwrap(), ByteSize::mib(32));
        assert_eq!("32 MiB".parse::<ByteSize>().unwrap(), ByteSize::mib(32));
        assert_eq!("2kb".parse::<ByteSize>().unwrap(), ByteSize::new(2000));
        assert_eq!("1.5kib".parse::<ByteSize>().unwrap(), ByteSize::new(1536));
    }

    #[test]
    fn test_parse_failures() {
        assert!("".parse::<ByteSize>().is_err());
        assert!("mb".parse::<ByteSize>().is_err());
        assert!("12 parsecs".parse::<ByteSize>().is_err());
        assert!("99999999999999tib".parse::<ByteSize>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ByteSize::mib(32).to_string(), "32MiB");
        assert_eq!(ByteSize::new(1000).to_string(), "1000B");
        assert_eq!(ByteSize::new(3 * 1024).to_string(), "3KiB");
    }
}
