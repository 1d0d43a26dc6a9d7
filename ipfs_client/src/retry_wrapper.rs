use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use retriever_config::BackoffStrategy;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, FibonacciBackoff, FixedInterval, jitter};
use tracing::{error, info};

use crate::error::IpfsClientError;
use crate::fetch::FetchConfig;

#[derive(Debug)]
pub enum RetryableError {
    FatalError(IpfsClientError),
    RetryableError(IpfsClientError),
}

impl From<IpfsClientError> for RetryableError {
    fn from(err: IpfsClientError) -> Self {
        if err.is_transient() {
            RetryableError::RetryableError(err)
        } else {
            RetryableError::FatalError(err)
        }
    }
}

#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Succeeded,
    Failed { error: IpfsClientError, retryable: bool },
}

/// Record of one attempt made by [`RetryWrapper`].
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// Zero based; attempt 0 is the initial request.
    pub index: usize,
    pub started_at: SystemTime,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

impl FetchAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded)
    }
}

/// Runs an operation with a per-attempt timeout, bounded retries with backoff on transient failures, and an overall
/// deadline.
///
/// At most `max_retries + 1` attempts are made. When the retries run out the last error is returned, except that a
/// final attempt that timed out is reported as [`IpfsClientError::RetrievalTimeout`]. Hitting the overall deadline
/// also yields `RetrievalTimeout`, with the in-flight attempt abandoned.
pub struct RetryWrapper {
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    backoff: BackoffStrategy,
    jitter: bool,
    attempt_timeout: Option<Duration>,
    deadline: Option<Duration>,
    log_errors_as_info: bool,
    api_tag: &'static str,
}

impl RetryWrapper {
    pub fn new(api_tag: &'static str) -> Self {
        Self::from_fetch_config(api_tag, &FetchConfig::default())
    }

    pub fn from_fetch_config(api_tag: &'static str, config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            backoff: config.backoff,
            jitter: config.jitter,
            attempt_timeout: Some(config.attempt_timeout),
            deadline: Some(config.retrieval_deadline),
            log_errors_as_info: false,
            api_tag,
        }
    }

    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn log_errors_as_info(mut self) -> Self {
        self.log_errors_as_info = true;
        self
    }

    /// The delays slept before each retry, in order. Holds exactly `max_retries` entries.
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let base_ms = self.base_delay.as_millis().min(u64::MAX as u128) as u64;
        let max_delay = self.max_delay;

        let delays: Box<dyn Iterator<Item = Duration> + Send> = match self.backoff {
            // 2^n * (base / 2) starting at n = 1, i.e. base, 2 * base, 4 * base, ...
            BackoffStrategy::Exponential => {
                Box::new(ExponentialBackoff::from_millis(2).factor((base_ms / 2).max(1)).max_delay(max_delay))
            },
            BackoffStrategy::Fibonacci => Box::new(FibonacciBackoff::from_millis(base_ms.max(1)).max_delay(max_delay)),
            BackoffStrategy::Fixed => Box::new(FixedInterval::from_millis(base_ms)),
        };

        let with_jitter = self.jitter;
        Box::new(
            delays
                .map(move |d| if with_jitter { jitter(d) } else { d })
                .map(move |d| d.min(max_delay))
                .take(self.max_retries),
        )
    }

    fn process_result<T>(&self, try_idx: usize, result: Result<T, IpfsClientError>) -> Result<T, RetryableError> {
        let api = self.api_tag;
        let retry_str = if try_idx == 0 {
            String::default()
        } else {
            format!(" (retry {try_idx})")
        };

        match result {
            Ok(v) => {
                info!("Request Success: {api} call succeeded{retry_str}.");
                Ok(v)
            },
            Err(e) => {
                info!(api, "Attempt {}/{}", try_idx + 1, self.max_retries + 1);
                let checked = RetryableError::from(e);
                match &checked {
                    RetryableError::RetryableError(e) => {
                        info!("Retryable Error: {api} call failed{retry_str}: {e}");
                    },
                    RetryableError::FatalError(e) => {
                        if self.log_errors_as_info {
                            info!("Fatal Error: {api} call failed{retry_str}: {e}");
                        } else {
                            error!("Fatal Error: {api} call failed{retry_str}: {e}");
                        }
                    },
                }
                Err(checked)
            },
        }
    }

    /// Run `make_attempt` until it succeeds, fails fatally, or the retries or the deadline run out.
    pub async fn run<T, Fut, F>(self, make_attempt: F) -> Result<T, IpfsClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, IpfsClientError>>,
    {
        self.run_with_report(make_attempt).await.0
    }

    /// Like [`RetryWrapper::run`], also returning the record of every attempt made.
    pub async fn run_with_report<T, Fut, F>(
        self,
        make_attempt: F,
    ) -> (Result<T, IpfsClientError>, Vec<FetchAttempt>)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, IpfsClientError>>,
    {
        info!(
            api = self.api_tag,
            max_retries = self.max_retries,
            base_delay = ?self.base_delay,
            attempt_timeout = ?self.attempt_timeout,
            deadline = ?self.deadline,
            "Retry strategy",
        );

        let start = Instant::now();
        // Counts attempts started, including one abandoned at the deadline.
        let try_count = AtomicUsize::new(0);
        let attempts = Mutex::new(Vec::<FetchAttempt>::with_capacity(self.max_retries + 1));
        let in_flight = Mutex::new(None::<(usize, SystemTime, Instant)>);

        let self_ = &self;
        let make_attempt = &make_attempt;
        let try_count_ = &try_count;
        let attempts_ = &attempts;
        let in_flight_ = &in_flight;

        let retry_future = RetryIf::spawn(
            self.delays(),
            move || async move {
                let try_idx = try_count_.fetch_add(1, Ordering::Relaxed);
                let started_at = SystemTime::now();
                let attempt_start = Instant::now();
                *in_flight_.lock().await = Some((try_idx, started_at, attempt_start));

                let result = match self_.attempt_timeout {
                    Some(t) => tokio::time::timeout(t, make_attempt())
                        .await
                        .unwrap_or(Err(IpfsClientError::AttemptTimeout(t))),
                    None => make_attempt().await,
                };
                *in_flight_.lock().await = None;

                let outcome = match &result {
                    Ok(_) => AttemptOutcome::Succeeded,
                    Err(e) => AttemptOutcome::Failed {
                        error: e.clone(),
                        retryable: e.is_transient(),
                    },
                };
                attempts_.lock().await.push(FetchAttempt {
                    index: try_idx,
                    started_at,
                    elapsed: attempt_start.elapsed(),
                    outcome,
                });

                self_.process_result(try_idx, result)
            },
            |err: &RetryableError| matches!(err, RetryableError::RetryableError(_)),
        );

        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, retry_future).await.ok(),
            None => Some(retry_future.await),
        };

        let Some(result) = result else {
            let e = IpfsClientError::RetrievalTimeout {
                attempts: try_count.load(Ordering::Relaxed).max(1),
                elapsed: start.elapsed(),
            };
            self.log_abort(&e);

            let mut attempts = attempts.into_inner();
            if let Some((index, started_at, attempt_start)) = in_flight.into_inner() {
                attempts.push(FetchAttempt {
                    index,
                    started_at,
                    elapsed: attempt_start.elapsed(),
                    outcome: AttemptOutcome::Failed {
                        error: e.clone(),
                        retryable: false,
                    },
                });
            }
            return (Err(e), attempts);
        };

        let result = match result {
            Ok(v) => Ok(v),
            // Already logged when it happened.
            Err(RetryableError::FatalError(e)) => Err(e),
            Err(RetryableError::RetryableError(e)) => {
                let e = match e {
                    IpfsClientError::AttemptTimeout(_) => IpfsClientError::RetrievalTimeout {
                        attempts: try_count.load(Ordering::Relaxed),
                        elapsed: start.elapsed(),
                    },
                    other => other,
                };
                self.log_abort(&e);
                Err(e)
            },
        };

        (result, attempts.into_inner())
    }

    fn log_abort(&self, e: &IpfsClientError) {
        if self.log_errors_as_info {
            info!(api = self.api_tag, "No more retries; aborting: {e}");
        } else {
            error!(api = self.api_tag, "No more retries; aborting: {e}");
        }
    }
}
