use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

/// Unit of work scheduled by the request dispatcher.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Error returned when an executor no longer accepts work.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("executor is stopped")]
pub struct ExecutorStopped;

/// Task-submission facility running jobs off the caller's thread.
///
/// The contract is "runs a unit of work, eventually, unless shut down";
/// rejection is an error the dispatcher converts into a failed completion
/// rather than a pending one.
pub trait Executor: Send + Sync {
    /// Schedules a job, or rejects it when shut down.
    fn execute(&self, job: Job) -> Result<(), ExecutorStopped>;
}

/// Fixed-size pool of tokio tasks draining a shared job queue.
///
/// Decouples request submission from channel I/O: callers return as soon
/// as the write job is queued, and the pool may interleave writes from
/// different requests (each one serialized at the channel's write lock).
pub struct WorkerPool {
    /// Job intake; taken on shutdown so later submissions are rejected.
    intake: Mutex<Option<mpsc::UnboundedSender<Job>>>,
}

impl WorkerPool {
    /// Spawns `workers` drain tasks on the current runtime.
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(AsyncMutex::new(rx));

        for _ in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    match job {
                        Some(job) => job.await,
                        None => break,
                    }
                }
            });
        }

        Self {
            intake: Mutex::new(Some(tx)),
        }
    }

    /// Closes the intake. Already-queued jobs still run; new submissions
    /// are rejected with `ExecutorStopped`.
    pub fn shutdown(&self) {
        self.lock_intake().take();
    }

    fn lock_intake(&self) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<Job>>> {
        self.intake
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Executor for WorkerPool {
    fn execute(&self, job: Job) -> Result<(), ExecutorStopped> {
        let intake = self.lock_intake();
        let Some(tx) = intake.as_ref() else {
            return Err(ExecutorStopped);
        };
        tx.send(job).map_err(|_| ExecutorStopped)
    }
}

/// A runtime handle is the trivial executor; it never rejects work.
impl Executor for tokio::runtime::Handle {
    fn execute(&self, job: Job) -> Result<(), ExecutorStopped> {
        self.spawn(job);
        Ok(())
    }
}
