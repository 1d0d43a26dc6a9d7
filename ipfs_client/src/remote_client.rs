use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{Bytes, BytesMut};
use cid_codec::NativeAddress;
use lazy_static::lazy_static;
use reqwest::{Response, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{Retryable, default_on_request_success};
use retriever_config::{ApiFlavor, ClientConfig};
use serde::Deserialize;
use tracing::{event, instrument};

use crate::error::{IpfsClientError, Result};
use crate::http_client::{self, Api};
use crate::interface::StorageClient;
use crate::INFORMATION_LOG_LEVEL;

lazy_static! {
    static ref FN_CALL_ID: AtomicU64 = AtomicU64::new(1);
}

/// Longest error body kept for error messages.
const MAX_ERROR_BODY_LEN: usize = 512;

/// Most bytes read from an error response; RPC error objects fit well within it.
const MAX_ERROR_BODY_READ: usize = 16 * 1024;

/// Error body returned by the node RPC API.
#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(rename = "Message")]
    message: String,
}

/// Client for a storage network node reachable over HTTP, either through its read-only gateway or its RPC API.
pub struct RemoteClient {
    endpoint: String,
    api: ApiFlavor,
    max_payload_size: u64,
    http_client: Arc<ClientWithMiddleware>,
}

impl RemoteClient {
    pub fn new(config: &ClientConfig) -> Result<Arc<Self>> {
        let endpoint = config.endpoint.trim_end_matches('/').to_owned();
        Url::parse(&endpoint)
            .map_err(|e| IpfsClientError::ConfigurationError(format!("invalid endpoint {endpoint:?}: {e}")))?;

        Ok(Arc::new(Self {
            endpoint,
            api: config.api,
            max_payload_size: config.max_payload_size.as_u64(),
            http_client: Arc::new(http_client::build_http_client(config)?),
        }))
    }

    /// Get the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api(&self) -> ApiFlavor {
        self.api
    }

    fn request_url(&self, address: &NativeAddress) -> Result<Url> {
        let url = match self.api {
            ApiFlavor::Gateway => format!("{}/ipfs/{address}", self.endpoint),
            ApiFlavor::Rpc => format!("{}/api/v0/cat?arg={address}", self.endpoint),
        };
        Url::parse(&url).map_err(|e| IpfsClientError::ConfigurationError(format!("invalid request url {url:?}: {e}")))
    }

    /// Read the full body, failing fast once it is known to exceed the payload limit.
    async fn read_body(&self, mut resp: Response) -> Result<Bytes> {
        let limit = self.max_payload_size;

        if let Some(len) = resp.content_length()
            && len > limit
        {
            return Err(IpfsClientError::PayloadTooLarge { size: len, limit });
        }

        let mut buf = BytesMut::with_capacity(resp.content_length().unwrap_or(0) as usize);
        while let Some(chunk) = resp.chunk().await.map_err(|e| on_body_failure(&e))? {
            let size = (buf.len() + chunk.len()) as u64;
            if size > limit {
                return Err(IpfsClientError::PayloadTooLarge { size, limit });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf.freeze())
    }

    async fn error_from_response(&self, address: &NativeAddress, resp: Response) -> IpfsClientError {
        let status = resp.status();
        let retriability = default_on_request_success(&resp);

        let body = read_error_body(resp).await;
        let body = truncate(body.trim());

        if self.api == ApiFlavor::Rpc
            && let Ok(rpc_error) = serde_json::from_str::<RpcErrorBody>(body)
        {
            return classify_rpc_error(address, status, &rpc_error.message);
        }

        classify_status(address, status, retriability, body)
    }
}

#[async_trait::async_trait]
impl StorageClient for RemoteClient {
    #[instrument(skip_all, name = "RemoteClient::get", fields(address = %address, api = %self.api))]
    async fn get(&self, address: &NativeAddress) -> Result<Bytes> {
        let call_id = FN_CALL_ID.fetch_add(1, Ordering::Relaxed);
        let url = self.request_url(address)?;
        event!(INFORMATION_LOG_LEVEL, call_id, %address, "Starting get API call");

        let request = match self.api {
            ApiFlavor::Gateway => self.http_client.get(url).with_extension(Api("ipfs::gateway_get")),
            ApiFlavor::Rpc => self.http_client.post(url).with_extension(Api("ipfs::rpc_cat")),
        };

        let resp = request.send().await.map_err(|e| on_request_failure(&e))?;

        if !resp.status().is_success() {
            let e = self.error_from_response(address, resp).await;
            event!(INFORMATION_LOG_LEVEL, call_id, %address, error = %e, "Failed get API call");
            return Err(e);
        }

        let bytes = self.read_body(resp).await?;
        event!(INFORMATION_LOG_LEVEL, call_id, %address, size = bytes.len(), "Completed get API call");
        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        match self.api {
            ApiFlavor::Gateway => "gateway",
            ApiFlavor::Rpc => "rpc",
        }
    }
}

/// Read at most `MAX_ERROR_BODY_READ` bytes of an error body; the rest is discarded with the connection.
async fn read_error_body(mut resp: Response) -> String {
    let mut buf = Vec::new();
    while buf.len() < MAX_ERROR_BODY_READ {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(MAX_ERROR_BODY_READ - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            },
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn truncate(s: &str) -> &str {
    if s.len() <= MAX_ERROR_BODY_LEN {
        return s;
    }
    let mut end = MAX_ERROR_BODY_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn classify_status(
    address: &NativeAddress,
    status: StatusCode,
    retriability: Option<Retryable>,
    body: &str,
) -> IpfsClientError {
    let detail = if body.is_empty() {
        format!("{address}: HTTP {status}")
    } else {
        format!("{address}: HTTP {status}: {body}")
    };

    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => IpfsClientError::NotFound(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => IpfsClientError::InvalidAddress(detail),
        _ => match retriability {
            Some(Retryable::Transient) => IpfsClientError::TransportError(detail),
            Some(Retryable::Fatal) | None => IpfsClientError::RequestRejected(detail),
        },
    }
}

/// The RPC API reports most failures as 500 with a message; sort them by what the message says.
fn classify_rpc_error(address: &NativeAddress, status: StatusCode, message: &str) -> IpfsClientError {
    let detail = format!("{address}: HTTP {status}: {message}");
    let lower = message.to_ascii_lowercase();

    if lower.contains("not found") || lower.contains("no link named") {
        IpfsClientError::NotFound(detail)
    } else if lower.contains("invalid") {
        IpfsClientError::InvalidAddress(detail)
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        IpfsClientError::TransportError(detail)
    } else {
        IpfsClientError::RequestRejected(detail)
    }
}

/// Classifies a failure to get any response at all.
///
/// Like `reqwest_retry::default_on_request_failure`, but retries all IO errors surfaced through hyper instead of
/// a subset, since some transient socket errors carry no distinguishing [`std::io::ErrorKind`].
pub fn on_request_failure(error: &reqwest_middleware::Error) -> IpfsClientError {
    let reqwest_middleware::Error::Reqwest(error) = error else {
        return IpfsClientError::RequestRejected(format!("middleware error: {error}"));
    };

    if error.is_timeout() || error.is_connect() {
        IpfsClientError::TransportError(error.to_string())
    } else if error.is_body() || error.is_decode() || error.is_builder() || error.is_redirect() {
        IpfsClientError::RequestRejected(error.to_string())
    } else if error.is_request() {
        // hyper::Error(IncompleteMessage) is raised when the connection is cut partway through a well formed
        // response, and Canceled when the server closes the connection; both are safe to retry.
        match get_source_error_type::<hyper::Error>(error) {
            Some(hyper_error)
                if hyper_error.is_incomplete_message()
                    || hyper_error.is_canceled()
                    || get_source_error_type::<std::io::Error>(hyper_error).is_some() =>
            {
                IpfsClientError::TransportError(error.to_string())
            },
            _ => IpfsClientError::RequestRejected(error.to_string()),
        }
    } else {
        IpfsClientError::TransportError(error.to_string())
    }
}

/// A body that breaks off midway is a transport failure.
fn on_body_failure(error: &reqwest::Error) -> IpfsClientError {
    if error.is_builder() || error.is_redirect() {
        IpfsClientError::RequestRejected(error.to_string())
    } else {
        IpfsClientError::TransportError(format!("failed reading response body: {error}"))
    }
}

/// Downcasts the given err source into T.
fn get_source_error_type<T: std::error::Error + 'static>(err: &dyn std::error::Error) -> Option<&T> {
    let mut source = err.source();

    while let Some(err) = source {
        if let Some(err) = err.downcast_ref::<T>() {
            return Some(err);
        }

        source = err.source();
    }
    None
}
