use std::fmt;
use std::sync::Arc;

use cid_codec::CodecError;
use document::{DocumentError, Violation};
use ipfs_client::IpfsClientError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utils::errors::SingleflightError;

/// The category of a failed retrieval, for callers that branch on the failure rather than report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedIdentifier,
    NotFound,
    TransportError,
    RetrievalTimeout,
    DecodeError,
    SchemaViolation,
    ConfigurationError,
    IOError,
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedIdentifier => "malformed_identifier",
            ErrorKind::NotFound => "not_found",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::RetrievalTimeout => "retrieval_timeout",
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::IOError => "io_error",
            ErrorKind::InternalError => "internal_error",
        };
        f.write_str(name)
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RetrievalError {
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Retrieval timed out after {attempts} attempt(s)")]
    RetrievalTimeout { attempts: usize },

    #[error("Payload is not valid JSON: {message} (line {line}, column {column})")]
    DecodeError { message: String, line: usize, column: usize },

    #[error("Document does not match schema: {}", format_violations(.0))]
    SchemaViolation(Vec<Violation>),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("I/O error: {0}")]
    IOError(Arc<std::io::Error>),

    #[error("Internal error: {0}")]
    InternalError(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::MalformedIdentifier(_) => ErrorKind::MalformedIdentifier,
            RetrievalError::NotFound(_) => ErrorKind::NotFound,
            RetrievalError::TransportError(_) => ErrorKind::TransportError,
            RetrievalError::RetrievalTimeout { .. } => ErrorKind::RetrievalTimeout,
            RetrievalError::DecodeError { .. } => ErrorKind::DecodeError,
            RetrievalError::SchemaViolation(_) => ErrorKind::SchemaViolation,
            RetrievalError::ConfigurationError(_) => ErrorKind::ConfigurationError,
            RetrievalError::IOError(_) => ErrorKind::IOError,
            RetrievalError::InternalError(_) => ErrorKind::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

impl From<CodecError> for RetrievalError {
    fn from(e: CodecError) -> Self {
        RetrievalError::MalformedIdentifier(e.to_string())
    }
}

impl From<IpfsClientError> for RetrievalError {
    fn from(e: IpfsClientError) -> Self {
        match e {
            IpfsClientError::NotFound(msg) => RetrievalError::NotFound(msg),
            IpfsClientError::InvalidAddress(msg) => RetrievalError::MalformedIdentifier(msg),
            IpfsClientError::CodecError(e) => e.into(),
            IpfsClientError::RetrievalTimeout { attempts, .. } => RetrievalError::RetrievalTimeout { attempts },
            IpfsClientError::AttemptTimeout(_) => RetrievalError::RetrievalTimeout { attempts: 1 },
            e @ (IpfsClientError::TransportError(_)
            | IpfsClientError::RequestRejected(_)
            | IpfsClientError::PayloadTooLarge { .. }) => RetrievalError::TransportError(e.to_string()),
            IpfsClientError::IOError(e) => RetrievalError::IOError(e),
            IpfsClientError::ConfigurationError(msg) => RetrievalError::ConfigurationError(msg),
            other => RetrievalError::InternalError(other.to_string()),
        }
    }
}

impl From<DocumentError> for RetrievalError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::DecodeError { message, line, column } => RetrievalError::DecodeError { message, line, column },
            DocumentError::SchemaViolation(violations) => RetrievalError::SchemaViolation(violations),
            other => RetrievalError::InternalError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for RetrievalError {
    fn from(e: std::io::Error) -> Self {
        RetrievalError::IOError(Arc::new(e))
    }
}

// Specific implementation for this one so that we can extract the internal error when appropriate
impl From<SingleflightError<RetrievalError>> for RetrievalError {
    fn from(value: SingleflightError<RetrievalError>) -> Self {
        match value {
            SingleflightError::InternalError(e) => e,
            e => {
                let msg = format!("{e:?}");
                error!("{msg}");
                RetrievalError::InternalError(format!("SingleflightError: {msg}"))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_client_error_kinds() {
        let cases = [
            (IpfsClientError::NotFound("x".into()), ErrorKind::NotFound),
            (IpfsClientError::InvalidAddress("x".into()), ErrorKind::MalformedIdentifier),
            (IpfsClientError::CodecError(CodecError::UnsupportedHash(0x16)), ErrorKind::MalformedIdentifier),
            (IpfsClientError::TransportError("reset".into()), ErrorKind::TransportError),
            (IpfsClientError::RequestRejected("403".into()), ErrorKind::TransportError),
            (IpfsClientError::PayloadTooLarge { size: 2, limit: 1 }, ErrorKind::TransportError),
            (
                IpfsClientError::RetrievalTimeout {
                    attempts: 6,
                    elapsed: Duration::from_secs(1),
                },
                ErrorKind::RetrievalTimeout,
            ),
            (IpfsClientError::ConfigurationError("bad".into()), ErrorKind::ConfigurationError),
        ];

        for (err, kind) in cases {
            assert_eq!(RetrievalError::from(err.clone()).kind(), kind, "{err:?}");
        }
    }

    #[test]
    fn test_timeout_keeps_attempt_count() {
        let err: RetrievalError = IpfsClientError::RetrievalTimeout {
            attempts: 6,
            elapsed: Duration::from_secs(3),
        }
        .into();
        assert!(matches!(err, RetrievalError::RetrievalTimeout { attempts: 6 }));
    }

    #[test]
    fn test_document_error_kinds() {
        let decode: RetrievalError = DocumentError::DecodeError {
            message: "EOF".into(),
            line: 1,
            column: 2,
        }
        .into();
        assert_eq!(decode.kind(), ErrorKind::DecodeError);

        let schema: RetrievalError = DocumentError::SchemaViolation(vec![Violation {
            path: "value".into(),
            expected: "number".into(),
            found: "missing".into(),
        }])
        .into();
        assert_eq!(schema.kind(), ErrorKind::SchemaViolation);
        assert_eq!(schema.to_string(), "Document does not match schema: value: expected number, found missing");
    }

    #[test]
    fn test_singleflight_error_unwraps() {
        let err: RetrievalError = SingleflightError::InternalError(RetrievalError::NotFound("x".into())).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: RetrievalError = SingleflightError::<RetrievalError>::CallTablePoisoned.into();
        assert_eq!(err.kind(), ErrorKind::InternalError);
    }
}
