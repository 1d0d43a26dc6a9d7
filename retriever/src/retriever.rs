use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use bytes::Bytes;
use cid_codec::{ContentIdentifier, NativeAddress, encode};
use document::{DecodedDocument, Schema, decode_and_validate};
use ipfs_client::{FetchConfig, StorageClient, fetch};
use lazy_static::lazy_static;
use retriever_config::RetrieverConfig;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Span, debug, field, info, instrument};

use crate::errors::{ErrorKind, RetrievalError, Result};
use crate::payload_cache::PayloadCache;
use crate::remote_client_interface::create_storage_client;

lazy_static! {
    static ref FN_CALL_ID: AtomicU64 = AtomicU64::new(1);
}

/// Progress of one retrieval.
///
/// `Done` and `Failed` are terminal; a request never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalState {
    /// Created, not started.
    Idle,
    /// Converting the identifier to a native address.
    Encoding,
    /// Fetching the payload. `attempt` counts from 0; it stays at 0 while waiting on a shared fetch.
    Fetching { attempt: usize },
    /// Parsing and validating the payload.
    Decoding,
    Done,
    Failed(ErrorKind),
}

impl RetrievalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetrievalState::Done | RetrievalState::Failed(_))
    }
}

/// Publishes state transitions when a request is being observed; a no-op otherwise.
#[derive(Clone, Default)]
struct StateSink(Option<Arc<watch::Sender<RetrievalState>>>);

impl StateSink {
    fn set(&self, state: RetrievalState) {
        if let Some(tx) = &self.0 {
            tx.send_if_modified(|current| {
                if *current == state || current.is_terminal() {
                    return false;
                }
                *current = state;
                true
            });
        }
    }
}

/// Reports each attempt the fetch pipeline makes through the wrapped client.
struct ObservedClient<'a> {
    inner: &'a dyn StorageClient,
    attempts: AtomicUsize,
    state: &'a StateSink,
}

#[async_trait::async_trait]
impl<'a> StorageClient for ObservedClient<'a> {
    async fn get(&self, address: &NativeAddress) -> ipfs_client::Result<Bytes> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        self.state.set(RetrievalState::Fetching { attempt });
        self.inner.get(address).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Retrieves documents by identifier: encode to a native address, fetch the payload, decode and validate it.
///
/// Holds no per-retrieval state; one `Retriever` serves any number of concurrent retrievals.
pub struct Retriever {
    client: Arc<dyn StorageClient>,
    fetch_config: FetchConfig,
    cache: Option<PayloadCache>,
}

impl Retriever {
    pub fn new(client: Arc<dyn StorageClient>, config: &RetrieverConfig) -> Self {
        let cache = config.cache.enabled.then(|| PayloadCache::new(&config.cache));
        Self {
            client,
            fetch_config: FetchConfig::from(&config.client),
            cache,
        }
    }

    /// Build the storage client from the configured endpoint.
    pub fn from_config(config: &RetrieverConfig) -> Result<Self> {
        let client = create_storage_client(&config.client)?;
        Ok(Self::new(client, config))
    }

    /// Replace the timing and retry parameters.
    pub fn with_fetch_config(mut self, fetch_config: FetchConfig) -> Self {
        self.fetch_config = fetch_config;
        self
    }

    pub fn fetch_config(&self) -> &FetchConfig {
        &self.fetch_config
    }

    pub fn cache(&self) -> Option<&PayloadCache> {
        self.cache.as_ref()
    }

    /// Retrieve the document stored under `identifier` and check it against `schema`.
    #[instrument(skip_all, name = "Retriever::retrieve", fields(identifier = %identifier, call_id = field::Empty))]
    pub async fn retrieve(&self, identifier: &ContentIdentifier, schema: &Schema) -> Result<DecodedDocument> {
        self.run(identifier, schema, &StateSink::default()).await
    }

    /// Retrieve and validate as [`Retriever::retrieve`], then convert the document into `T`.
    pub async fn retrieve_as<T: DeserializeOwned>(&self, identifier: &ContentIdentifier, schema: &Schema) -> Result<T> {
        Ok(self.retrieve(identifier, schema).await?.deserialize()?)
    }

    /// Retrieve by native address string (CIDv0 or CIDv1) instead of identifier.
    #[instrument(skip_all, name = "Retriever::retrieve_address", fields(address, call_id = field::Empty))]
    pub async fn retrieve_address(&self, address: &str, schema: &Schema) -> Result<DecodedDocument> {
        let call_id = FN_CALL_ID.fetch_add(1, Ordering::Relaxed);
        Span::current().record("call_id", call_id);

        let address: NativeAddress = address.parse()?;
        Span::current().record("address", field::display(&address));
        self.retrieve_at(&address, schema, &StateSink::default()).await
    }

    /// Start a retrieval in the background, observable through [`RetrievalRequest::state`].
    ///
    /// Must be called within a tokio runtime.
    pub fn request(self: &Arc<Self>, identifier: ContentIdentifier, schema: Schema) -> RetrievalRequest {
        let (tx, rx) = watch::channel(RetrievalState::Idle);
        let state = StateSink(Some(Arc::new(tx)));
        let retriever = self.clone();

        let handle = tokio::spawn(async move {
            let result = retriever.run(&identifier, &schema, &state).await;
            match &result {
                Ok(_) => state.set(RetrievalState::Done),
                Err(e) => state.set(RetrievalState::Failed(e.kind())),
            }
            result
        });

        RetrievalRequest {
            state: rx,
            handle: Some(handle),
        }
    }

    async fn run(&self, identifier: &ContentIdentifier, schema: &Schema, state: &StateSink) -> Result<DecodedDocument> {
        let call_id = FN_CALL_ID.fetch_add(1, Ordering::Relaxed);
        Span::current().record("call_id", call_id);

        state.set(RetrievalState::Encoding);
        let address = encode(identifier)?;
        debug!(call_id, %identifier, %address, "Encoded identifier");

        let result = self.retrieve_at(&address, schema, state).await;
        match &result {
            Ok(_) => info!(call_id, %address, "Retrieval succeeded"),
            Err(e) => info!(call_id, %address, kind = %e.kind(), "Retrieval failed: {e}"),
        }
        result
    }

    async fn retrieve_at(&self, address: &NativeAddress, schema: &Schema, state: &StateSink) -> Result<DecodedDocument> {
        state.set(RetrievalState::Fetching { attempt: 0 });
        let payload = self.fetch_payload(address, state).await?;

        state.set(RetrievalState::Decoding);
        Ok(decode_and_validate(&payload, schema)?)
    }

    async fn fetch_payload(&self, address: &NativeAddress, state: &StateSink) -> Result<Bytes> {
        let Some(cache) = &self.cache else {
            let observed = ObservedClient {
                inner: self.client.as_ref(),
                attempts: AtomicUsize::new(0),
                state,
            };
            return Ok(fetch(&observed, address, &self.fetch_config).await?.bytes);
        };

        let client = self.client.clone();
        let fetch_config = self.fetch_config.clone();
        let owned_address = *address;

        let (payload, hit) = cache
            .get_or_fetch(&address.to_string(), async move {
                Ok(fetch(client.as_ref(), &owned_address, &fetch_config).await?.bytes)
            })
            .await?;
        debug!(%address, hit, "Fetched payload through cache");
        Ok(payload)
    }
}

/// A retrieval running in the background.
///
/// Dropping the request cancels the retrieval, including any in-flight attempt.
pub struct RetrievalRequest {
    state: watch::Receiver<RetrievalState>,
    handle: Option<JoinHandle<Result<DecodedDocument>>>,
}

impl RetrievalRequest {
    /// The current state.
    pub fn state(&self) -> RetrievalState {
        *self.state.borrow()
    }

    /// A receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RetrievalState> {
        self.state.clone()
    }

    /// Wait for the retrieval to finish.
    ///
    /// The task stays owned by the request while waiting, so dropping this future also cancels the retrieval.
    pub async fn wait(mut self) -> Result<DecodedDocument> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(RetrievalError::InternalError("retrieval already consumed".into()));
        };
        handle
            .await
            .map_err(|e| RetrievalError::InternalError(format!("retrieval task failed: {e}")))?
    }
}

impl Drop for RetrievalRequest {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
