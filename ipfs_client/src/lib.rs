//! Fetch pipeline for content-addressed storage.
//!
//! A [`StorageClient`] makes single attempts against a store: [`RemoteClient`] talks to a node over its HTTP gateway
//! or RPC API, [`LocalClient`] reads a directory. [`fetch`] drives a client with a per-attempt timeout, bounded
//! retries with backoff on transient failures, and an overall deadline.

pub use error::{IpfsClientError, Result};
pub use fetch::{FetchConfig, RawPayload, fetch};
pub use http_client::{Api, build_http_client};
pub use interface::StorageClient;
pub use local_client::LocalClient;
pub use remote_client::RemoteClient;
pub use retry_wrapper::{AttemptOutcome, FetchAttempt, RetryWrapper, RetryableError};
use tracing::Level;

mod error;
mod fetch;
pub mod http_client;
mod interface;
mod local_client;
pub mod remote_client;
pub mod retry_wrapper;

pub mod client_testing_utils;

#[cfg(not(feature = "elevated_information_level"))]
pub const INFORMATION_LOG_LEVEL: Level = Level::DEBUG;

#[cfg(feature = "elevated_information_level")]
pub const INFORMATION_LOG_LEVEL: Level = Level::INFO;
