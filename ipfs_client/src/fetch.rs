use std::time::Duration;

use bytes::Bytes;
use cid_codec::NativeAddress;
use retriever_config::{BackoffStrategy, ClientConfig};
use tracing::{debug, instrument};

use crate::error::{IpfsClientError, Result};
use crate::interface::StorageClient;
use crate::retry_wrapper::RetryWrapper;

/// Timing and retry parameters for one retrieval.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub attempt_timeout: Duration,
    pub retrieval_deadline: Duration,
    /// Retries after the first attempt; at most `max_retries + 1` attempts are made.
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: BackoffStrategy,
    pub jitter: bool,
    pub max_payload_size: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for FetchConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            attempt_timeout: config.attempt_timeout,
            retrieval_deadline: config.retrieval_deadline,
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            max_delay: config.retry_max_delay,
            backoff: config.retry_backoff,
            jitter: config.retry_jitter,
            max_payload_size: config.max_payload_size.as_u64(),
        }
    }
}

/// Bytes retrieved for an address, not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub address: NativeAddress,
    pub bytes: Bytes,
}

/// Retrieve the payload at `address` through `client`, applying the per-attempt timeout, retries with backoff on
/// transient failures, and the overall deadline from `config`.
#[instrument(skip_all, name = "fetch", fields(address = %address, client = client.name()))]
pub async fn fetch(client: &dyn StorageClient, address: &NativeAddress, config: &FetchConfig) -> Result<RawPayload> {
    let limit = config.max_payload_size;

    let (result, attempts) = RetryWrapper::from_fetch_config("ipfs::get", config)
        .run_with_report(|| async move {
            let bytes = client.get(address).await?;
            if bytes.len() as u64 > limit {
                return Err(IpfsClientError::PayloadTooLarge {
                    size: bytes.len() as u64,
                    limit,
                });
            }
            Ok(bytes)
        })
        .await;

    debug!(
        attempts = attempts.len(),
        succeeded = result.is_ok(),
        elapsed_ms = attempts.iter().map(|a| a.elapsed.as_millis() as u64).sum::<u64>(),
        "Fetch finished"
    );

    Ok(RawPayload {
        address: *address,
        bytes: result?,
    })
}
