use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use retriever_config::ClientConfig;
use tokio::time::Instant;
use tracing::{Instrument, event, info_span};

use crate::INFORMATION_LOG_LEVEL;
use crate::error::{IpfsClientError, Result};

/// Tag attached to each request as an extension, naming the API call for logs.
#[derive(Clone, Copy, Debug)]
pub struct Api(pub &'static str);

/// Logs every request that passes through the client, with its API tag, status and duration.
pub struct LoggingMiddleware;

#[async_trait::async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let api = extensions.get::<Api>().map(|a| a.0).unwrap_or("unknown");
        let method = req.method().clone();
        let url = req.url().clone();
        let start = Instant::now();

        let span = info_span!("http_request", api, %method, url = %url);
        let result = next.run(req, extensions).instrument(span).await;

        match &result {
            Ok(resp) => event!(
                INFORMATION_LOG_LEVEL,
                api,
                status = resp.status().as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "HTTP request completed"
            ),
            Err(e) => event!(
                INFORMATION_LOG_LEVEL,
                api,
                elapsed_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "HTTP request failed"
            ),
        }

        result
    }
}

/// Builds the HTTP client used by [`crate::RemoteClient`].
///
/// The client carries no retry middleware and no total request timeout: both are applied per attempt by the fetch
/// pipeline so that every attempt is accounted for.
pub fn build_http_client(config: &ClientConfig) -> Result<ClientWithMiddleware> {
    let reqwest_client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| IpfsClientError::ConfigurationError(format!("failed to build HTTP client: {e}")))?;

    Ok(ClientBuilder::new(reqwest_client).with(LoggingMiddleware).build())
}
