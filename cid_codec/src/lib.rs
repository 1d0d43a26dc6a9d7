//! Conversion between the fixed-width binary identifiers used by callers (a bare 32 byte sha2-256 digest, the
//! on-chain `bytes32` form) and the storage network's native CID addresses.
//!
//! The conversion is pure and deterministic: the same identifier always encodes to the same address and
//! `decode(encode(x)) == x` for every identifier.

mod address;
mod error;
mod identifier;

pub use address::{ContentCodec, NativeAddress, SHA2_256, decode, encode, encode_v1, identifier_of};
pub use cid::Version as CidVersion;
pub use error::{CodecError, Result};
pub use identifier::{ContentIdentifier, IDENTIFIER_LEN};
