//! Background worker pool for walks that must not block the dispatcher.
//!
//! A fixed pool of named worker threads takes jobs from a FIFO queue. Every
//! job produces exactly one reply: [`BackgroundScheduler::submit`] hands the
//! caller a [`PendingReply`], a single-shot channel the worker completes.
//! There is no timeout and no cancellation.
//!
//! Queue contents, the running count and the counters all live behind one
//! mutex, so `drain` and `stats` see a consistent picture.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use exstrings_core::{Error, Reply};

use crate::config::BackgroundConfig;

/// Reason a walk was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BackpressureError {
    /// The queue is at `max_queue_depth`.
    #[error("background queue is full")]
    QueueFull,
    /// The scheduler has been shut down.
    #[error("background scheduler is shut down")]
    ShutDown,
}

impl From<BackpressureError> for Error {
    fn from(e: BackpressureError) -> Self {
        Error::Unavailable {
            reason: e.to_string(),
        }
    }
}

/// Scheduler metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Jobs waiting in the queue.
    pub queue_depth: usize,
    /// Jobs a worker is running right now.
    pub active_tasks: usize,
    /// Jobs finished since the scheduler started, panicked ones included.
    pub tasks_completed: u64,
    /// Jobs that panicked before replying.
    pub tasks_panicked: u64,
    /// Worker threads.
    pub worker_count: usize,
}

/// A walk and the channel its reply goes to.
struct Job {
    work: Box<dyn FnOnce() -> Reply + Send>,
    reply: oneshot::Sender<Reply>,
}

impl Job {
    /// Run the walk and deliver its reply. Returns false if it panicked, in
    /// which case the sender is dropped and the waiter sees an abandoned reply.
    fn run(self) -> bool {
        let Job { work, reply } = self;
        match catch_unwind(AssertUnwindSafe(work)) {
            Ok(result) => {
                // The caller may have stopped waiting; nothing to do then.
                let _ = reply.send(result);
                true
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("(non-string panic)");
                error!(target: "exstrings::bg", panic = message, "Background walk panicked");
                false
            }
        }
    }
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    running: usize,
    closed: bool,
    completed: u64,
    panicked: u64,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.jobs.is_empty() && self.running == 0
    }
}

struct Shared {
    state: Mutex<QueueState>,
    /// Signalled when a job is queued or the queue closes.
    job_ready: Condvar,
    /// Signalled when the pool may have gone idle.
    idle: Condvar,
    max_queue_depth: usize,
}

impl Shared {
    /// Block for the next job. `None` once the queue is closed and empty.
    fn next_job(&self) -> Option<Job> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                state.running += 1;
                return Some(job);
            }
            if state.closed {
                return None;
            }
            self.job_ready.wait(&mut state);
        }
    }

    fn finish(&self, replied: bool) {
        let mut state = self.state.lock();
        state.running -= 1;
        state.completed += 1;
        if !replied {
            state.panicked += 1;
        }
        if state.is_idle() {
            self.idle.notify_all();
        }
    }

    fn work(&self) {
        while let Some(job) = self.next_job() {
            let replied = job.run();
            self.finish(replied);
        }
    }
}

/// A reply a background worker will produce later.
///
/// Resolves to exactly one reply. If the job is dropped without replying
/// (the walk panicked or the scheduler went away), the reply is an
/// internal error.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Reply>,
}

impl PendingReply {
    /// Block the calling thread until the worker replies.
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait(self) -> Reply {
        self.rx.blocking_recv().unwrap_or_else(|_| abandoned())
    }

    /// Take the reply if it is ready, without blocking.
    pub fn try_take(&mut self) -> Option<Reply> {
        match self.rx.try_recv() {
            Ok(reply) => Some(reply),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(abandoned()),
        }
    }
}

fn abandoned() -> Reply {
    Error::internal("background task ended without replying").to_reply()
}

/// FIFO pool of worker threads running background walks.
pub struct BackgroundScheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl BackgroundScheduler {
    /// Start `workers` threads named `exstrings-bg-<n>` over a queue holding
    /// at most `max_queue_depth` waiting jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned. Workers spawned
    /// before the failure are stopped when the scheduler is dropped.
    pub fn new(workers: usize, max_queue_depth: usize) -> io::Result<Self> {
        let scheduler = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                job_ready: Condvar::new(),
                idle: Condvar::new(),
                max_queue_depth,
            }),
            workers: Mutex::new(Vec::with_capacity(workers)),
            worker_count: workers,
        };

        for n in 0..workers {
            let shared = Arc::clone(&scheduler.shared);
            let handle = std::thread::Builder::new()
                .name(format!("exstrings-bg-{}", n))
                .spawn(move || shared.work())?;
            scheduler.workers.lock().push(handle);
        }

        info!(
            target: "exstrings::bg",
            workers,
            max_queue_depth,
            "Background scheduler started"
        );
        Ok(scheduler)
    }

    /// Create a scheduler sized by `config`.
    pub fn from_config(config: &BackgroundConfig) -> io::Result<Self> {
        Self::new(config.workers, config.max_queue_depth)
    }

    /// Queue `work` and return the reply it will produce.
    ///
    /// Refused when the queue is full or the scheduler is shut down; the
    /// work is dropped without running.
    pub fn submit(
        &self,
        work: impl FnOnce() -> Reply + Send + 'static,
    ) -> Result<PendingReply, BackpressureError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(BackpressureError::ShutDown);
            }
            if state.jobs.len() >= self.shared.max_queue_depth {
                warn!(
                    target: "exstrings::bg",
                    max_queue_depth = self.shared.max_queue_depth,
                    "Background queue full, walk refused"
                );
                return Err(BackpressureError::QueueFull);
            }
            state.jobs.push_back(Job {
                work: Box::new(work),
                reply: tx,
            });
        }
        self.shared.job_ready.notify_one();
        Ok(PendingReply { rx })
    }

    /// Block until the queue is empty and no worker is running a job.
    /// Workers keep running afterwards.
    pub fn drain(&self) {
        let mut state = self.shared.state.lock();
        while !state.is_idle() {
            self.shared.idle.wait(&mut state);
        }
    }

    /// Close the queue, let the workers finish what is queued, and join them.
    pub fn shutdown(&self) {
        let first = {
            let mut state = self.shared.state.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        self.shared.job_ready.notify_all();

        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }

        if first {
            info!(
                target: "exstrings::bg",
                tasks_completed = self.shared.state.lock().completed,
                "Background scheduler stopped"
            );
        }
    }

    /// Return a snapshot of scheduler metrics.
    pub fn stats(&self) -> SchedulerStats {
        let state = self.shared.state.lock();
        SchedulerStats {
            queue_depth: state.jobs.len(),
            active_tasks: state.running,
            tasks_completed: state.completed,
            tasks_panicked: state.panicked,
            worker_count: self.worker_count,
        }
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
