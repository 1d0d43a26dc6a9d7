use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cid_codec::NativeAddress;
use tokio::sync::Mutex;

use crate::error::{IpfsClientError, Result};
use crate::interface::StorageClient;

/// One scripted outcome of a [`ScriptedClient::get`] call.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Payload(Bytes),
    NotFound,
    TransportFailure,
    /// Never completes; only a timeout or cancellation ends the call.
    Hang,
    /// Completes with the payload after a delay.
    Delayed(Duration, Bytes),
}

impl ScriptedResponse {
    pub fn payload(data: impl Into<Bytes>) -> Self {
        ScriptedResponse::Payload(data.into())
    }
}

/// A [`StorageClient`] that replays a fixed script of outcomes, then repeats a fallback outcome forever.
///
/// Counts every call, so tests can assert how many attempts the fetch pipeline made.
pub struct ScriptedClient {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: ScriptedResponse,
    num_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(script: impl IntoIterator<Item = ScriptedResponse>, fallback: ScriptedResponse) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            num_calls: AtomicUsize::new(0),
        })
    }

    /// Every call gives the same outcome.
    pub fn always(response: ScriptedResponse) -> Arc<Self> {
        Self::new([], response)
    }

    /// `failures` transient failures, then `data` on every later call.
    pub fn failing_then(failures: usize, data: impl Into<Bytes>) -> Arc<Self> {
        Self::new(
            std::iter::repeat_n(ScriptedResponse::TransportFailure, failures),
            ScriptedResponse::Payload(data.into()),
        )
    }

    pub fn num_calls(&self) -> usize {
        self.num_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageClient for ScriptedClient {
    async fn get(&self, address: &NativeAddress) -> Result<Bytes> {
        let call_idx = self.num_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.script.lock().await.pop_front().unwrap_or_else(|| self.fallback.clone());

        match response {
            ScriptedResponse::Payload(data) => Ok(data),
            ScriptedResponse::NotFound => Err(IpfsClientError::NotFound(address.to_string())),
            ScriptedResponse::TransportFailure => {
                Err(IpfsClientError::TransportError(format!("scripted failure on call {call_idx}")))
            },
            ScriptedResponse::Hang => std::future::pending().await,
            ScriptedResponse::Delayed(delay, data) => {
                tokio::time::sleep(delay).await;
                Ok(data)
            },
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
