use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utils::ParsableConfigValue;

/// Which HTTP interface of the storage network the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFlavor {
    /// Path gateway, `GET {endpoint}/ipfs/{cid}`.
    #[default]
    Gateway,
    /// Kubo RPC, `POST {endpoint}/api/v0/cat?arg={cid}`.
    Rpc,
}

impl FromStr for ApiFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gateway" | "http" => Ok(ApiFlavor::Gateway),
            "rpc" | "api" | "kubo" => Ok(ApiFlavor::Rpc),
            other => Err(format!("unknown api flavor '{other}', expected 'gateway' or 'rpc'")),
        }
    }
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFlavor::Gateway => write!(f, "gateway"),
            ApiFlavor::Rpc => write!(f, "rpc"),
        }
    }
}

impl ParsableConfigValue for ApiFlavor {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

/// Shape of the delay sequence between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// base, 2*base, 4*base, ...
    #[default]
    Exponential,
    /// base, base, 2*base, 3*base, 5*base, ...
    Fibonacci,
    /// base every time.
    Fixed,
}

impl FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" | "exp" => Ok(BackoffStrategy::Exponential),
            "fibonacci" | "fib" => Ok(BackoffStrategy::Fibonacci),
            "fixed" | "constant" => Ok(BackoffStrategy::Fixed),
            other => Err(format!("unknown backoff strategy '{other}'")),
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffStrategy::Exponential => write!(f, "exponential"),
            BackoffStrategy::Fibonacci => write!(f, "fibonacci"),
            BackoffStrategy::Fixed => write!(f, "fixed"),
        }
    }
}

impl ParsableConfigValue for BackoffStrategy {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}
