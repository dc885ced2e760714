//! Per-job event ring, live subscriber fan-out, and the `RunnerContext`
//! implementation child processes report through.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use gd_domain::job::{Event, JobError, JobId, JobSnapshot, JobState, LogStream, ProgressKind};
use gd_procrunner::{CancelHandle, RunnerContext};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

/// Ring capacity for a single job's events (spec §4.6 "bounded ring of ≤ N").
const EVENT_RING_CAPACITY: usize = 2000;

struct State {
    snapshot: JobSnapshot,
    /// True once a terminal state has been recorded — further transitions
    /// are refused so a late runner resolution can never clobber a
    /// cancellation or timeout (spec §9 ordering note).
    finished: bool,
}

pub struct JobContext {
    id: JobId,
    state: RwLock<State>,
    events: Mutex<VecDeque<Event>>,
    subscribers: broadcast::Sender<Event>,
    cancel: Mutex<Option<CancelHandle>>,
    cancel_requested: AtomicBool,
}

impl JobContext {
    pub fn new(id: JobId) -> Self {
        let (subscribers, _rx) = broadcast::channel(EVENT_RING_CAPACITY);
        Self {
            id,
            state: RwLock::new(State {
                snapshot: JobSnapshot {
                    id,
                    state: JobState::Queued,
                    created_at: Utc::now(),
                    started_at: None,
                    finished_at: None,
                    error: None,
                },
                finished: false,
            }),
            events: Mutex::new(VecDeque::with_capacity(64)),
            subscribers,
            cancel: Mutex::new(None),
            cancel_requested: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.read().snapshot.clone()
    }

    /// Current ring contents plus a receiver for everything emitted after
    /// this call — used by the streaming route to replay-then-follow.
    pub fn subscribe(&self) -> (Vec<Event>, broadcast::Receiver<Event>) {
        let history = self.events.lock().iter().cloned().collect();
        (history, self.subscribers.subscribe())
    }

    fn push_event(&self, event: Event) {
        {
            let mut ring = self.events.lock();
            if ring.len() >= EVENT_RING_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(event.clone());
        }
        let _ = self.subscribers.send(event);
    }

    pub fn mark_running(&self) {
        let mut state = self.state.write();
        if state.finished {
            return;
        }
        state.snapshot.state = JobState::Running;
        state.snapshot.started_at = Some(Utc::now());
        drop(state);
        self.push_event(Event::state(JobState::Running, None::<String>));
    }

    /// Transition to a terminal state. A no-op if the job is already
    /// terminal — first terminal transition wins.
    pub fn finish(&self, state: JobState, error: Option<JobError>, message: Option<String>) {
        debug_assert!(state.is_terminal());
        {
            let mut guard = self.state.write();
            if guard.finished {
                return;
            }
            guard.finished = true;
            guard.snapshot.state = state;
            guard.snapshot.finished_at = Some(Utc::now());
            guard.snapshot.error = error;
        }
        self.push_event(Event::state(state, message));
    }

    pub fn is_finished(&self) -> bool {
        self.state.read().finished
    }

    /// Best-effort kill plus an immediate terminal transition — cancellation
    /// does not wait for the child to actually exit (spec §4.6/§6.2).
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        if let Some(cancel) = self.cancel.lock().clone() {
            cancel.kill();
        }
        self.finish(JobState::Cancelled, None, Some("cancelled".into()));
    }

    /// Invoked by the job manager when the wall-clock timeout fires.
    pub fn request_timeout(&self) {
        if let Some(cancel) = self.cancel.lock().clone() {
            cancel.kill();
        }
        self.finish(
            JobState::Error,
            Some(JobError {
                error_code: "timeout".into(),
                message: "job exceeded its wall-clock timeout".into(),
            }),
            Some("timed out".into()),
        );
    }
}

impl RunnerContext for JobContext {
    fn log_stdout(&self, line: String) {
        self.push_event(Event::log(LogStream::Stdout, line));
    }

    fn log_stderr(&self, line: String) {
        self.push_event(Event::log(LogStream::Stderr, line));
    }

    fn progress(&self, kind: ProgressKind, percent: Option<u8>, detail: Option<String>) {
        self.push_event(Event::Progress { kind, percent, detail });
    }

    fn set_cancel(&self, cancel: CancelHandle) {
        *self.cancel.lock() = Some(cancel);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_queued() {
        let ctx = JobContext::new(JobId::new_v4());
        assert_eq!(ctx.snapshot().state, JobState::Queued);
    }

    #[test]
    fn mark_running_emits_state_event() {
        let ctx = JobContext::new(JobId::new_v4());
        let (_, mut rx) = ctx.subscribe();
        ctx.mark_running();
        assert_eq!(ctx.snapshot().state, JobState::Running);
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, Event::State { state: JobState::Running, .. }));
    }

    #[test]
    fn finish_is_first_writer_wins() {
        let ctx = JobContext::new(JobId::new_v4());
        ctx.finish(JobState::Cancelled, None, None);
        ctx.finish(
            JobState::Error,
            Some(JobError {
                error_code: "timeout".into(),
                message: "late".into(),
            }),
            None,
        );
        assert_eq!(ctx.snapshot().state, JobState::Cancelled);
    }

    #[test]
    fn subscribe_replays_ring_then_live_events() {
        let ctx = JobContext::new(JobId::new_v4());
        ctx.log_stdout("before".into());
        let (history, mut rx) = ctx.subscribe();
        assert_eq!(history.len(), 1);
        ctx.log_stdout("after".into());
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, Event::Log { line, .. } if line == "after"));
    }

    #[test]
    fn event_ring_drops_oldest_on_overflow() {
        let ctx = JobContext::new(JobId::new_v4());
        for i in 0..(EVENT_RING_CAPACITY + 10) {
            ctx.log_stdout(format!("{i}"));
        }
        let (history, _rx) = ctx.subscribe();
        assert_eq!(history.len(), EVENT_RING_CAPACITY);
        assert!(matches!(&history[0], Event::Log { line, .. } if line == "10"));
    }

    #[test]
    fn request_cancel_finishes_job_without_cancel_handle() {
        let ctx = JobContext::new(JobId::new_v4());
        ctx.mark_running();
        ctx.request_cancel();
        assert_eq!(ctx.snapshot().state, JobState::Cancelled);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn request_timeout_sets_timeout_error_code() {
        let ctx = JobContext::new(JobId::new_v4());
        ctx.mark_running();
        ctx.request_timeout();
        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.state, JobState::Error);
        assert_eq!(snapshot.error.unwrap().error_code, "timeout");
    }
}
