use thiserror::Error;

/// Reasons an identifier or address could not be converted.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Identifier must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Identifier is not valid hex: {0}")]
    InvalidHex(String),

    #[error("Address '{address}' is not a valid CID: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Unsupported multihash code 0x{0:x}; only sha2-256 is supported")]
    UnsupportedHash(u64),

    #[error("Unsupported digest length {0}; expected 32")]
    UnsupportedDigestLength(usize),

    #[error("Unsupported content codec 0x{0:x}")]
    UnsupportedCodec(u64),
}

pub type Result<T> = std::result::Result<T, CodecError>;
