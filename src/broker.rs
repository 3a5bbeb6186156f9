// ABOUTME: Bounded job broker protecting the backing store from overload
// ABOUTME: Fixed worker pool, bounded queue, single deadline covering admission and completion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

//! # Job Broker
//!
//! Request handlers never touch the backing store directly. They submit a
//! unit of work to the [`JobBroker`], which multiplexes all requests onto a
//! small fixed worker pool so a slow or saturated store degrades predictably
//! instead of exhausting caller tasks.
//!
//! A submission suspends at most twice: once waiting for admission into the
//! bounded queue (capacity equals the worker count), and once waiting for
//! the worker's result. Both waits are bounded by a single deadline measured
//! from submission, so admission latency counts against the total budget.
//! The two failure modes stay distinguishable: [`ErrorKind::NoCapacity`]
//! means "overloaded, retry later", [`ErrorKind::TimedOut`] means "the store
//! is slow or broken".
//!
//! There is no cancellation: work that outlives the completion deadline is
//! allowed to finish in the background and its late result is discarded by
//! the dropped receiver. Each job owns a private capacity-1 reply channel,
//! so no caller can ever observe a stale value from another submission.
//!
//! [`ErrorKind::NoCapacity`]: crate::errors::ErrorKind::NoCapacity
//! [`ErrorKind::TimedOut`]: crate::errors::ErrorKind::TimedOut

use crate::errors::{ApiError, ApiResult};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{timeout_at, Instant};

/// A unit of work queued for a broker worker.
///
/// The future already carries its reply channel: driving it to completion
/// delivers exactly one value to the submitter, so workers need no
/// knowledge of the work's result type.
struct Job {
    work: BoxFuture<'static, ()>,
}

/// Fixed pool of workers draining a bounded job queue.
///
/// Process-wide and built once at startup; there is no teardown path beyond
/// process exit. Worker count should match the backing store's tolerable
/// concurrency.
pub struct JobBroker {
    queue: mpsc::Sender<Job>,
    deadline: Duration,
}

impl JobBroker {
    /// Spawn `worker_count` workers draining a queue of the same capacity.
    ///
    /// `deadline` bounds the whole submission: admission into the queue and
    /// the wait for the result share this one budget.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(worker_count: usize, deadline: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(worker_count.max(1));
        let rx = Arc::new(Mutex::new(rx));
        for id in 0..worker_count.max(1) {
            tokio::spawn(worker_loop(id, Arc::clone(&rx)));
        }
        Self {
            queue: tx,
            deadline,
        }
    }

    /// Submit a unit of work and wait for its typed result.
    ///
    /// Exactly one worker executes `work` exactly once per admitted job; no
    /// work runs at all if admission times out. On a completion timeout the
    /// work is not cancelled, but its late result goes nowhere.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NoCapacity`] if the queue cannot accept the job
    ///   before the deadline.
    /// - [`ErrorKind::TimedOut`] if the job was admitted but no result
    ///   arrived before the deadline.
    /// - [`ErrorKind::UnexpectedValue`] if the reply channel closed without
    ///   a value. This never happens under correct operation and signals a
    ///   broker bug.
    /// - [`ErrorKind::ServerFault`] if the work itself panicked.
    /// - Whatever typed failure the work returned, propagated verbatim.
    ///
    /// [`ErrorKind::NoCapacity`]: crate::errors::ErrorKind::NoCapacity
    /// [`ErrorKind::TimedOut`]: crate::errors::ErrorKind::TimedOut
    /// [`ErrorKind::UnexpectedValue`]: crate::errors::ErrorKind::UnexpectedValue
    /// [`ErrorKind::ServerFault`]: crate::errors::ErrorKind::ServerFault
    pub async fn submit<T, F>(&self, work: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let deadline = Instant::now() + self.deadline;
        let (reply_tx, reply_rx) = oneshot::channel::<ApiResult<T>>();

        let job = Job {
            work: async move {
                let outcome = AssertUnwindSafe(work).catch_unwind().await;
                let result = outcome.unwrap_or_else(|_| {
                    Err(ApiError::server_fault(
                        "job crashed during execution",
                        PanickedJob,
                    ))
                });
                // The submitter may have abandoned the wait on its
                // completion deadline; a late result is simply dropped.
                drop(reply_tx.send(result));
            }
            .boxed(),
        };

        match timeout_at(deadline, self.queue.send(job)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(ApiError::unexpected("job queue closed"));
            }
            Err(_) => {
                return Err(ApiError::no_capacity("store workers at capacity"));
            }
        }

        match timeout_at(deadline, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ApiError::unexpected("job result channel closed early")),
            Err(_) => Err(ApiError::timed_out("store job timed out")),
        }
    }
}

/// Marker error attached to a server fault when submitted work panicked.
#[derive(Debug, thiserror::Error)]
#[error("job panicked")]
struct PanickedJob;

/// Worker loop: dequeue the next job and drive it to completion.
///
/// Workers execute jobs synchronously with respect to themselves; the lock
/// on the shared receiver is held only across the dequeue, never across a
/// job's execution.
async fn worker_loop(id: usize, queue: Arc<Mutex<mpsc::Receiver<Job>>>) {
    tracing::debug!(worker = id, "broker worker started");
    loop {
        let job = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        match job {
            Some(job) => job.work.await,
            None => break,
        }
    }
    tracing::debug!(worker = id, "broker worker stopped");
}
