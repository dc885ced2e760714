//! Bounded FIFO job queue: enqueue, concurrency cap, wall-clock timeout,
//! cancellation, and a bounded history ring (spec §4.6).

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use futures_util::future::BoxFuture;
use gd_domain::error::{DaemonError, Result};
use gd_domain::job::{JobId, JobSnapshot, JobState};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::context::JobContext;

/// History ring capacity (spec §3 "Jobs live in a bounded history ring of
/// ≤100").
const HISTORY_CAPACITY: usize = 100;

type Runner = Box<dyn FnOnce(Arc<JobContext>) -> BoxFuture<'static, ()> + Send>;

struct Shared {
    max_concurrent: usize,
    timeout: StdDuration,
    running: AtomicUsize,
    queue: Mutex<VecDeque<JobId>>,
    pending: Mutex<HashMap<JobId, Runner>>,
    jobs: RwLock<HashMap<JobId, Arc<JobContext>>>,
    history: Mutex<VecDeque<JobId>>,
}

#[derive(Clone)]
pub struct JobManager {
    shared: Arc<Shared>,
}

impl JobManager {
    pub fn new(max_concurrent: usize, timeout_seconds: u64) -> Self {
        Self {
            shared: Arc::new(Shared {
                max_concurrent: max_concurrent.max(1),
                timeout: StdDuration::from_secs(timeout_seconds.max(1)),
                running: AtomicUsize::new(0),
                queue: Mutex::new(VecDeque::new()),
                pending: Mutex::new(HashMap::new()),
                jobs: RwLock::new(HashMap::new()),
                history: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Register a unit of work and return its id immediately. `spawn`
    /// receives the job's context once a concurrency slot is free; it is
    /// responsible for calling `ctx.finish(..)` with the outcome.
    pub fn enqueue<F, Fut>(&self, spawn: F) -> JobId
    where
        F: FnOnce(Arc<JobContext>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let ctx = Arc::new(JobContext::new(id));

        self.shared.jobs.write().insert(id, ctx);
        self.remember_in_history(id);
        self.shared
            .pending
            .lock()
            .insert(id, Box::new(move |ctx| Box::pin(spawn(ctx))));
        self.shared.queue.lock().push_back(id);

        self.drain();
        id
    }

    fn remember_in_history(&self, id: JobId) {
        let mut history = self.shared.history.lock();
        history.push_back(id);
        if history.len() > HISTORY_CAPACITY {
            if let Some(evicted) = history.pop_front() {
                self.shared.jobs.write().remove(&evicted);
            }
        }
    }

    /// Pop queued jobs while a concurrency slot is free and start them.
    fn drain(&self) {
        loop {
            if self.shared.running.load(Ordering::SeqCst) >= self.shared.max_concurrent {
                return;
            }
            let Some(id) = self.shared.queue.lock().pop_front() else {
                return;
            };
            let Some(runner) = self.shared.pending.lock().remove(&id) else {
                continue; // cancelled before it reached the front of the queue
            };
            let Some(ctx) = self.shared.jobs.read().get(&id).cloned() else {
                continue; // evicted from history before it could start
            };
            if ctx.is_finished() {
                continue; // already cancelled while queued
            }
            self.start(ctx, runner);
        }
    }

    fn start(&self, ctx: Arc<JobContext>, runner: Runner) {
        self.shared.running.fetch_add(1, Ordering::SeqCst);
        ctx.mark_running();

        let shared = self.shared.clone();
        let run_ctx = ctx.clone();
        tokio::spawn(async move {
            let work = runner(run_ctx.clone());
            tokio::select! {
                _ = work => {}
                _ = tokio::time::sleep(shared.timeout) => {
                    run_ctx.request_timeout();
                }
            }
            shared.running.fetch_sub(1, Ordering::SeqCst);
            Self { shared }.drain();
        });
    }

    pub fn snapshot(&self, id: JobId) -> Result<JobSnapshot> {
        self.shared
            .jobs
            .read()
            .get(&id)
            .map(|ctx| ctx.snapshot())
            .ok_or_else(|| DaemonError::JobNotFound(id.to_string()))
    }

    /// Replay history plus a live receiver, or `None` if the job is unknown.
    pub fn subscribe(
        &self,
        id: JobId,
    ) -> Option<(Vec<gd_domain::job::Event>, broadcast::Receiver<gd_domain::job::Event>)> {
        self.shared.jobs.read().get(&id).map(|ctx| ctx.subscribe())
    }

    pub fn cancel(&self, id: JobId) -> Result<()> {
        let ctx = self
            .shared
            .jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| DaemonError::JobNotFound(id.to_string()))?;

        if ctx.snapshot().state.is_terminal() {
            return Err(DaemonError::Conflict(format!(
                "job {id} is already in a terminal state"
            )));
        }

        // Drop it from the pending queue so `drain` never starts it late.
        self.shared.pending.lock().remove(&id);
        ctx.request_cancel();
        Ok(())
    }

    /// Current count of jobs in the `running` state — used by `diagnostics`.
    pub fn running_count(&self) -> usize {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Current count of jobs still sitting in the FIFO queue — used by
    /// `diagnostics`.
    pub fn queued_count(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.shared.max_concurrent
    }

    pub fn job_count(&self) -> usize {
        self.shared.jobs.read().len()
    }
}
