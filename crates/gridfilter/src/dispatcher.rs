//! Evaluation strategy selection and the parallel filter worker.
//!
//! Small datasets are filtered inline. At or above the threshold the work is
//! sent to a [`FilterWorker`]: a tokio task that receives requests over an
//! mpsc channel, evaluates them in chunks on the rayon pool (via
//! `spawn_blocking`), and answers each request on its own oneshot channel.
//! Every request carries a correlation id, and the caller waits for at most
//! the configured timeout. A worker failure is reported to the caller; there
//! is no inline retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::WorkerError;
use crate::filter::RowFilter;
use crate::value::Row;

/// Minimum number of rows for delegating to the worker.
pub const DEFAULT_WORKER_THRESHOLD: usize = 10_000;

/// Default round-trip timeout for a worker request.
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of rows per parallel chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Pending requests the worker channel buffers before senders wait.
const REQUEST_QUEUE_DEPTH: usize = 16;

struct WorkerRequest {
    request_id: u64,
    rows: Arc<Vec<Row>>,
    filter: RowFilter,
    reply: oneshot::Sender<WorkerResponse>,
}

#[derive(Debug)]
struct WorkerResponse {
    request_id: u64,
    result: Result<Vec<usize>, String>,
}

/// Handle to the background evaluation task.
///
/// The task runs until every handle is dropped.
#[derive(Debug)]
pub struct FilterWorker {
    sender: mpsc::Sender<WorkerRequest>,
    next_request_id: AtomicU64,
    timeout: Duration,
}

impl FilterWorker {
    /// Spawns the worker task on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Failed` when called outside a runtime.
    pub fn spawn(chunk_size: usize, timeout: Duration) -> Result<Self, WorkerError> {
        let handle = Handle::try_current()
            .map_err(|e| WorkerError::Failed(format!("no async runtime: {}", e)))?;
        let (sender, receiver) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        handle.spawn(run_worker(receiver, chunk_size.max(1)));

        Ok(Self {
            sender,
            next_request_id: AtomicU64::new(1),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Filters `rows` on the worker and returns matching indices in dataset order.
    ///
    /// # Errors
    ///
    /// - `WorkerError::Timeout` if no answer arrives within the timeout
    /// - `WorkerError::Disconnected` if the worker task is gone
    /// - `WorkerError::StaleResponse` if the answer belongs to another request
    /// - `WorkerError::Failed` if evaluation panicked
    pub async fn evaluate(
        &self,
        rows: Arc<Vec<Row>>,
        filter: RowFilter,
    ) -> Result<Vec<usize>, WorkerError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (reply, response) = oneshot::channel();

        self.sender
            .send(WorkerRequest {
                request_id,
                rows,
                filter,
                reply,
            })
            .await
            .map_err(|_| WorkerError::Disconnected)?;

        let response = match tokio::time::timeout(self.timeout, response).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(WorkerError::Disconnected),
            Err(_) => {
                return Err(WorkerError::Timeout {
                    request_id,
                    timeout: self.timeout,
                })
            }
        };

        accept_response(request_id, response)
    }
}

fn accept_response(expected: u64, response: WorkerResponse) -> Result<Vec<usize>, WorkerError> {
    if response.request_id != expected {
        return Err(WorkerError::StaleResponse {
            expected,
            received: response.request_id,
        });
    }
    response.result.map_err(WorkerError::Failed)
}

async fn run_worker(mut receiver: mpsc::Receiver<WorkerRequest>, chunk_size: usize) {
    while let Some(request) = receiver.recv().await {
        // Requests evaluate concurrently.
        tokio::spawn(async move {
            let WorkerRequest {
                request_id,
                rows,
                filter,
                reply,
            } = request;

            let result = tokio::task::spawn_blocking(move || {
                filter.par_filter_indices(&rows, chunk_size)
            })
            .await
            .map_err(|e| e.to_string());

            // The caller may have timed out and dropped the receiver.
            let _ = reply.send(WorkerResponse { request_id, result });
        });
    }
    debug!("filter worker stopped");
}

/// How a result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Evaluated row by row on the calling task.
    Inline,
    /// Evaluated in parallel on the worker.
    Worker,
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub indices: Vec<usize>,
    pub strategy: Strategy,
}

/// Chooses between inline and worker evaluation.
///
/// The worker is spawned lazily on the first large dataset.
#[derive(Debug)]
pub struct Dispatcher {
    worker_enabled: bool,
    threshold: usize,
    chunk_size: usize,
    timeout: Duration,
    worker: Option<FilterWorker>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(
            true,
            DEFAULT_WORKER_THRESHOLD,
            DEFAULT_CHUNK_SIZE,
            DEFAULT_WORKER_TIMEOUT,
        )
    }
}

impl Dispatcher {
    pub fn new(worker_enabled: bool, threshold: usize, chunk_size: usize, timeout: Duration) -> Self {
        Self {
            worker_enabled,
            threshold,
            chunk_size,
            timeout,
            worker: None,
        }
    }

    /// Builds a dispatcher from the `[worker]` config section.
    pub fn from_config(config: &crate::config::WorkerConfig) -> Self {
        Self::new(
            config.enabled,
            config.threshold,
            config.chunk_size,
            config.timeout(),
        )
    }

    /// Returns the strategy that would be used for `row_count` rows.
    pub fn strategy_for(&self, row_count: usize) -> Strategy {
        if self.worker_enabled && row_count >= self.threshold {
            Strategy::Worker
        } else {
            Strategy::Inline
        }
    }

    /// Evaluates `filter` over `rows`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] if the worker path was chosen and failed.
    pub async fn dispatch(
        &mut self,
        rows: &Arc<Vec<Row>>,
        filter: RowFilter,
    ) -> Result<Evaluation, WorkerError> {
        let strategy = self.strategy_for(rows.len());
        debug!(rows = rows.len(), ?strategy, "dispatching filter evaluation");

        let indices = match strategy {
            Strategy::Inline => filter.filter_indices(rows),
            Strategy::Worker => {
                let worker = match self.worker.take() {
                    Some(worker) => worker,
                    None => FilterWorker::spawn(self.chunk_size, self.timeout)?,
                };
                let result = worker.evaluate(Arc::clone(rows), filter).await;
                self.worker = Some(worker);
                result?
            }
        };

        Ok(Evaluation { indices, strategy })
    }
}
