//! Decoding of retrieved payloads into validated JSON documents.

mod decode;
mod error;
mod schema;

pub use decode::{DecodedDocument, decode_and_validate, decode_as};
pub use error::{DocumentError, Result, Violation};
pub use schema::{FieldKind, FieldSpec, Schema};
