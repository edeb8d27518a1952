//! Bounded FIFO job queue with admission control.
//!
//! `MAX_QUEUED` bounds how many jobs may be waiting for a slot; `MAX_CONCURRENT`
//! bounds how many run at once. Admission (`try_enqueue`) is non-blocking
//! and O(1): it never awaits, it only checks capacity and pushes onto a
//! bounded channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, mpsc};

use crate::error::ConvertError;
use crate::health::{Health, HealthMap, JOB_QUEUE};

/// A unit of work bound to its own completion. `T` is typically a future
/// or closure the caller supplies; the queue only orders and bounds
/// concurrency, it doesn't know about HTTP responses.
pub type Job = Box<dyn FnOnce() -> futures::future::BoxFuture<'static, ()> + Send>;

pub struct Queue {
    sender: mpsc::Sender<Job>,
    enqueued: Arc<AtomicUsize>,
    max_queued: usize,
}

impl Queue {
    /// Spawns the dispatch loop and returns a handle. The loop pulls jobs
    /// off the channel in FIFO order and runs up to `max_concurrent` of
    /// them in parallel via a semaphore permit per job. FIFO is preserved
    /// for *dispatch* order only, not completion order.
    pub fn start(max_queued: usize, max_concurrent: usize, health: HealthMap) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Job>(max_queued);
        let enqueued = Arc::new(AtomicUsize::new(0));
        let enqueued_for_loop = enqueued.clone();
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                enqueued_for_loop.fetch_sub(1, Ordering::SeqCst);
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
                tokio::spawn(async move {
                    let _permit = permit;
                    job().await;
                });
            }
        });

        health.set(JOB_QUEUE, Health::Healthy);

        Self {
            sender,
            enqueued,
            max_queued,
        }
    }

    /// Non-blocking admission check. Returns `QueueFull` immediately if the
    /// queue is already at `max_queued` rather than awaiting a free slot.
    pub fn try_enqueue(&self, job: Job) -> Result<(), ConvertError> {
        if self.enqueued.load(Ordering::SeqCst) >= self.max_queued {
            return Err(ConvertError::QueueFull);
        }

        self.enqueued.fetch_add(1, Ordering::SeqCst);
        match self.sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.enqueued.fetch_sub(1, Ordering::SeqCst);
                Err(ConvertError::QueueFull)
            }
        }
    }

    pub fn enqueued_len(&self) -> usize {
        self.enqueued.load(Ordering::SeqCst)
    }
}
