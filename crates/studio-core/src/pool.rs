//! Bounded worker pool with caller-runs backpressure.
//!
//! `core` long-lived workers drain a bounded `flume` queue.  When the queue
//! is full, up to `max - core` overflow tasks are admitted through a
//! semaphore; when those are taken too, the job runs on the submitting task.
//! Nothing is ever rejected.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};
use tracing::{debug, error, info};

use crate::error::GenerationError;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Long-lived workers.
    pub core: usize,
    /// Upper bound on concurrently executing pool jobs, caller-run jobs
    /// excluded.
    pub max: usize,
    /// Queue depth in front of the core workers.
    pub queue: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core: 4,
            max: 8,
            queue: 100,
        }
    }
}

/// Where a submitted job ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Queued,
    Overflow,
    CallerRuns,
}

/// Overflow slot; dropping it frees the slot.
struct OverflowPermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    tx: flume::Sender<Job>,
    overflow: Arc<Semaphore>,
    config: PoolConfig,
}

impl WorkerPool {
    /// Spawn the core workers.  Must be called inside a tokio runtime.
    pub fn new(config: PoolConfig) -> Self {
        let core = config.core.max(1);
        let config = PoolConfig {
            core,
            max: config.max.max(core),
            queue: config.queue.max(1),
        };

        let (tx, rx) = flume::bounded::<Job>(config.queue);
        for worker in 0..core {
            let rx = rx.clone();
            tokio::spawn(async move {
                while let Ok(job) = rx.recv_async().await {
                    if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                        error!(worker, "pool job panicked");
                    }
                }
                debug!(worker, "worker stopped");
            });
        }
        info!(
            core = config.core,
            max = config.max,
            queue = config.queue,
            "worker pool started"
        );

        Self {
            tx,
            overflow: Arc::new(Semaphore::new(config.max - config.core)),
            config,
        }
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Jobs waiting in the queue.
    pub fn queued(&self) -> usize {
        self.tx.len()
    }

    /// Run `fut` on the pool and wait for its output.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, GenerationError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.run_placed(fut).await.map(|(out, _)| out)
    }

    /// Like [`Self::run`], also reporting where the job ran.
    pub async fn run_placed<F, T>(&self, fut: F) -> Result<(T, Placement), GenerationError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = done_tx.send(fut.await);
        });

        let placement = match self.tx.try_send(job) {
            Ok(()) => Placement::Queued,
            Err(flume::TrySendError::Full(job)) | Err(flume::TrySendError::Disconnected(job)) => {
                match Arc::clone(&self.overflow).try_acquire_owned() {
                    Ok(permit) => {
                        let permit = OverflowPermit { _permit: permit };
                        tokio::spawn(async move {
                            job.await;
                            drop(permit);
                        });
                        Placement::Overflow
                    }
                    Err(_) => {
                        debug!("pool saturated; running job on caller");
                        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                            error!("caller-run job panicked");
                        }
                        Placement::CallerRuns
                    }
                }
            }
        };

        done_rx
            .await
            .map(|out| (out, placement))
            .map_err(|_| GenerationError::Internal("pool job was dropped before completing".into()))
    }
}
