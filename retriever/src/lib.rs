//! Retrieve JSON documents from content-addressed storage by their 32 byte identifier.
//!
//! ```no_run
//! # async fn example() -> retriever::errors::Result<()> {
//! use document::{FieldKind, Schema};
//! use retriever::Retriever;
//! use retriever_config::RetrieverConfig;
//!
//! let retriever = Retriever::from_config(&RetrieverConfig::new())?;
//! let id = "0x9d6c2be50f706953479ab9df2ce3edca90b68053c00b3004b7f0accbe1e8eedf".parse()?;
//! let doc = retriever.retrieve(&id, &Schema::new().required("value", FieldKind::Number)).await?;
//! println!("{:?}", doc.get("value"));
//! # Ok(())
//! # }
//! ```

pub mod configurations;
pub mod errors;
pub mod logging;
mod payload_cache;
mod remote_client_interface;
mod retriever;

pub use errors::{ErrorKind, RetrievalError};
pub use payload_cache::PayloadCache;
pub use retriever::{RetrievalRequest, RetrievalState, Retriever};
