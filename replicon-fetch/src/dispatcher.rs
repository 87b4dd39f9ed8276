//! Request dispatch with retries and batching.
//!
//! Every mode funnels through [`Dispatcher::call`], so the retry policy is
//! identical for single calls, sequential batches, and concurrent batches.
//!
//! Batches abort on the first failing entry: no further entry is started,
//! and the returned [`BatchError`] names the lowest failing input index.
//! A concurrent batch waits for the calls it already started before
//! reporting the failure; their results are discarded.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::{StreamExt, stream};
use replicon_core::ApiResponse;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{BatchError, TransportError};
use crate::retry::RetryStrategy;
use crate::transport::{PreparedRequest, Transport};

// ============================================================================
// Request Attempt
// ============================================================================

/// One logical call in progress, including its retries.
#[derive(Debug)]
struct RequestAttempt<'a> {
    request: &'a PreparedRequest,
    attempt: u32,
}

impl<'a> RequestAttempt<'a> {
    fn new(request: &'a PreparedRequest) -> Self {
        Self {
            request,
            attempt: 0,
        }
    }

    fn next(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Executes prepared requests against a [`Transport`].
///
/// Cloning is cheap; clones share the transport and its connection pool.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    retry: RetryStrategy,
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(transport: Arc<dyn Transport>, retry: RetryStrategy) -> Self {
        Self { transport, retry }
    }

    /// Returns the retry strategy.
    pub fn retry_strategy(&self) -> &RetryStrategy {
        &self.retry
    }

    /// Sends one request, retrying connection failures.
    ///
    /// Any HTTP status is returned as-is. Only transport failures are
    /// retried, with the same method, headers, and payload, up to
    /// `max_attempts` in total.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn call(&self, request: &PreparedRequest) -> Result<ApiResponse, TransportError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = RequestAttempt::new(request);

        loop {
            let current = attempt.next();
            debug!(attempt = current, max_attempts, "Sending request");

            match self.transport.send(attempt.request).await {
                Ok(mut response) => {
                    response.attempts = current;
                    log_response(attempt.request, &response);
                    return Ok(response);
                }
                Err(e) => {
                    if current < max_attempts && self.retry.should_retry(&e) {
                        let delay = self.retry.delay_for_attempt(current);
                        warn!(
                            error = %e,
                            attempt = current,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    error!(
                        error = %e,
                        attempts = current,
                        payload = %payload_for_log(attempt.request),
                        "Request failed"
                    );
                    return Err(TransportError {
                        attempts: current,
                        last: e,
                    });
                }
            }
        }
    }

    /// Sends each request in input order, stopping at the first failure.
    #[instrument(skip(self, requests), fields(total = requests.len()))]
    pub async fn sequential_batch(
        &self,
        requests: Vec<PreparedRequest>,
    ) -> Result<Vec<ApiResponse>, BatchError> {
        let mut results = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            let response = self
                .call(request)
                .await
                .map_err(|source| BatchError::Entry { index, source })?;
            results.push(response);
        }

        Ok(results)
    }

    /// Sends requests with at most `concurrency` in flight.
    ///
    /// Each call runs on its own tokio task and a freed slot is refilled
    /// immediately, whatever the state of earlier entries. Results come
    /// back in input order. `concurrency` above the number of requests is
    /// clamped; zero is rejected.
    ///
    /// Entries start in input order. Once one fails no further entry is
    /// started, but calls already running are awaited, so the reported
    /// failure is the lowest failing index and every entry before it ran.
    #[instrument(skip(self, requests), fields(total = requests.len()))]
    pub async fn concurrent_batch(
        &self,
        requests: Vec<PreparedRequest>,
        concurrency: usize,
    ) -> Result<Vec<ApiResponse>, BatchError> {
        if concurrency == 0 {
            return Err(BatchError::InvalidConcurrency);
        }

        let total = requests.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = concurrency.min(total);
        debug!(workers, "Starting concurrent batch");

        let processed = Arc::new(AtomicUsize::new(0));
        let aborted = Arc::new(AtomicBool::new(false));

        let mut outcomes = pin!(
            stream::iter(requests.into_iter().enumerate())
                .map(move |(index, request)| {
                    let dispatcher = self.clone();
                    let processed = Arc::clone(&processed);
                    let aborted = Arc::clone(&aborted);
                    async move {
                        if aborted.load(Ordering::Acquire) {
                            return (index, Ok(None));
                        }

                        let handle = tokio::spawn(async move {
                            let result = dispatcher.call(&request).await;
                            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                            info!(index, processed = done, total, "Batch entry completed");
                            result
                        });

                        let outcome = match handle.await {
                            Ok(result) => result
                                .map(Some)
                                .map_err(|source| BatchError::Entry { index, source }),
                            Err(e) => Err(BatchError::Worker {
                                index,
                                message: e.to_string(),
                            }),
                        };
                        if outcome.is_err() {
                            aborted.store(true, Ordering::Release);
                        }
                        (index, outcome)
                    }
                })
                .buffer_unordered(workers)
        );

        let mut slots: Vec<Option<ApiResponse>> = vec![None; total];
        let mut failure: Option<BatchError> = None;

        while let Some((index, outcome)) = outcomes.next().await {
            match outcome {
                Ok(response) => slots[index] = response,
                Err(e) => {
                    let lower = failure
                        .as_ref()
                        .and_then(BatchError::index)
                        .is_none_or(|failed| index < failed);
                    if lower {
                        failure = Some(e);
                    }
                }
            }
        }

        match failure {
            Some(e) => {
                warn!(index = e.index(), "Batch aborted");
                Err(e)
            }
            None => Ok(slots.into_iter().flatten().collect()),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn payload_for_log(request: &PreparedRequest) -> String {
    request
        .payload
        .as_ref()
        .map_or_else(|| "null".to_string(), ToString::to_string)
}

fn log_response(request: &PreparedRequest, response: &ApiResponse) {
    if let Some(correlation_id) = response.correlation_id() {
        debug!(correlation_id, "Correlation ID");
    }

    if let Some(app_error) = response.error() {
        error!(
            status = response.status,
            payload = %payload_for_log(request),
            error = %app_error,
            "Request returned an error"
        );
    } else {
        info!(
            status = response.status,
            attempts = response.attempts,
            "Request completed"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
