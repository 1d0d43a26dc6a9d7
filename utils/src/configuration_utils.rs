use std::fmt::Debug;
use std::time::Duration;

use tracing::warn;

use crate::ByteSize;

/// A value that can be loaded from a user supplied string, typically an environment variable.
pub trait ParsableConfigValue: Debug + Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    /// Parse the value, returning the default if the variable is unset or cannot be parsed.
    /// A value that fails to parse is reported with a warning rather than an error.
    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        let Some(value) = value else {
            return default;
        };

        match Self::parse_user_value(value.trim()) {
            Some(v) => v,
            None => {
                warn!(
                    "Configuration value {value:?} for {variable_name} cannot be parsed as {}; using default {default:?}.",
                    std::any::type_name::<Self>()
                );
                default
            },
        }
    }
}

macro_rules! impl_parsable_via_from_str {
    ($($t:ty),+) => {
        $(
            impl ParsableConfigValue for $t {
                fn parse_user_value(value: &str) -> Option<Self> {
                    value.parse::<$t>().ok()
                }
            }
        )+
    };
}

impl_parsable_via_from_str!(u8, u16, u32, u64, usize, i32, i64, f32, f64, ByteSize);

impl ParsableConfigValue for String {
    fn parse_user_value(value: &str) -> Option<Self> {
        Some(value.to_owned())
    }
}

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Some(true),
            "0" | "false" | "no" | "n" | "off" => Some(false),
            _ => None,
        }
    }
}

/// Durations accept humantime strings ("500ms", "2m 30s"); a bare integer is a number of milliseconds.
impl ParsableConfigValue for Duration {
    fn parse_user_value(value: &str) -> Option<Self> {
        if let Ok(ms) = value.parse::<u64>() {
            return Some(Duration::from_millis(ms));
        }
        humantime::parse_duration(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_falls_back_to_default() {
        assert_eq!(usize::parse("N", None, 7), 7);
        assert_eq!(usize::parse("N", Some("12".into()), 7), 12);
        assert_eq!(usize::parse("N", Some("twelve".into()), 7), 7);
    }

    #[test]
    fn test_parse_bool() {
        assert!(bool::parse("B", Some("yes".into()), false));
        assert!(!bool::parse("B", Some("OFF".into()), true));
        assert!(bool::parse("B", Some("maybe".into()), true));
    }

    #[test]
    fn test_parse_duration() {
        let d = Duration::from_secs(1);
        assert_eq!(Duration::parse("D", Some("250".into()), d), Duration::from_millis(250));
        assert_eq!(Duration::parse("D", Some("2m 30s".into()), d), Duration::from_secs(150));
        assert_eq!(Duration::parse("D", Some("soon".into()), d), d);
    }

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(ByteSize::parse("S", Some("4mib".into()), ByteSize::new(0)), ByteSize::mib(4));
    }
}
