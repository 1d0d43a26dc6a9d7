use std::time::Duration;

use utils::ByteSize;

use crate::{ApiFlavor, BackoffStrategy};

crate::config_group!({

    /// Base URL of the storage network endpoint.
    /// A `local://<path>` endpoint reads from a directory store instead of the network.
    ///
    /// The default value is http://127.0.0.1:8080, the default local gateway address.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_ENDPOINT` (or `IPFS_GATEWAY`) to set this value.
    ref endpoint: String = "http://127.0.0.1:8080".to_string();

    /// The HTTP interface served at `endpoint`: `gateway` or `rpc`.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_API` to set this value.
    ref api: ApiFlavor = ApiFlavor::Gateway;

    /// Deadline for a single retrieval attempt, including reading the body.
    ///
    /// The default value is 30s.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_ATTEMPT_TIMEOUT` to set this value.
    ref attempt_timeout: Duration = Duration::from_secs(30);

    /// Deadline for a whole retrieval across all attempts and backoff delays.
    ///
    /// The default value is 2 minutes.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_RETRIEVAL_DEADLINE` to set this value.
    ref retrieval_deadline: Duration = Duration::from_secs(120);

    /// TCP connect timeout for the HTTP client.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_CONNECT_TIMEOUT` to set this value.
    ref connect_timeout: Duration = Duration::from_secs(10);

    /// Number of retries after the first attempt on transient failures.
    ///
    /// The default value is 5.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_MAX_RETRIES` to set this value.
    ref max_retries: usize = 5;

    /// The first delay between attempts.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_RETRY_BASE_DELAY` to set this value.
    ref retry_base_delay: Duration = Duration::from_millis(500);

    /// Upper bound on any single delay between attempts.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_RETRY_MAX_DELAY` to set this value.
    ref retry_max_delay: Duration = Duration::from_secs(10);

    /// How delays grow between attempts: `exponential`, `fibonacci` or `fixed`.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_RETRY_BACKOFF` to set this value.
    ref retry_backoff: BackoffStrategy = BackoffStrategy::Exponential;

    /// Whether delays are randomized to spread out retries from concurrent callers.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_RETRY_JITTER` to set this value.
    ref retry_jitter: bool = true;

    /// Payloads larger than this are rejected without retrying.
    ///
    /// The default value is 32MiB.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_MAX_PAYLOAD_SIZE` to set this value.
    ref max_payload_size: ByteSize = ByteSize::mib(32);

    /// User agent sent with every request.
    ///
    /// Use the environment variable `IPFS_RETRIEVER_CLIENT_USER_AGENT` to set this value.
    ref user_agent: String = concat!("ipfs-retriever/", env!("CARGO_PKG_VERSION")).to_string();
});
