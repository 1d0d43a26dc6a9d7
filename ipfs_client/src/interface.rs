use bytes::Bytes;
use cid_codec::NativeAddress;

use crate::error::Result;

/// A client to a content-addressed store.
///
/// One call to `get` is one attempt: implementations never retry internally. Retries, per-attempt timeouts and the
/// overall deadline are applied on top by [`crate::fetch`].
#[async_trait::async_trait]
pub trait StorageClient: Send + Sync {
    /// Fetch the complete payload stored under `address`.
    ///
    /// Errors for which [`crate::IpfsClientError::is_transient`] holds are retried by the fetch pipeline; every
    /// other error ends the retrieval.
    async fn get(&self, address: &NativeAddress) -> Result<Bytes>;

    /// Short tag identifying this client in logs.
    fn name(&self) -> &'static str {
        "storage"
    }
}
