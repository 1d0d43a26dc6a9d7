use std::sync::Arc;
use std::time::Duration;

use cid_codec::CodecError;
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum IpfsClientError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Address rejected by the storage network: {0}")]
    InvalidAddress(String),

    #[error("Invalid address: {0}")]
    CodecError(#[from] CodecError),

    #[error("Request rejected: {0}")]
    RequestRejected(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Attempt timed out after {0:?}")]
    AttemptTimeout(Duration),

    #[error("Retrieval timed out after {attempts} attempt(s) ({elapsed:?} elapsed)")]
    RetrievalTimeout { attempts: usize, elapsed: Duration },

    #[error("Payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("IO error: {0}")]
    IOError(Arc<std::io::Error>),

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IpfsClientError {
    /// Whether another attempt could succeed where this one failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, IpfsClientError::TransportError(_) | IpfsClientError::AttemptTimeout(_))
    }

    pub fn internal<T: std::fmt::Debug>(value: T) -> Self {
        IpfsClientError::InternalError(format!("{value:?}"))
    }
}

impl From<std::io::Error> for IpfsClientError {
    fn from(err: std::io::Error) -> Self {
        IpfsClientError::IOError(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, IpfsClientError>;
