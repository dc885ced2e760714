//! Job and event types shared between the job manager, the HTTP surface,
//! and the child-process runner. Kept free of any runtime/async types so
//! it can be serialized straight into API responses and SSE frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Error,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }
}

/// Which stream a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// What a progress event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Git,
    Deps,
}

/// Tagged union of job event kinds — a discriminated variant, not an
/// inheritance hierarchy. Consumers pattern-match on `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    Log {
        stream: LogStream,
        line: String,
    },
    Progress {
        kind: ProgressKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        percent: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    State {
        state: JobState,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Event {
    pub fn state(state: JobState, message: Option<impl Into<String>>) -> Self {
        Event::State {
            state,
            message: message.map(Into::into),
        }
    }

    pub fn log(stream: LogStream, line: impl Into<String>) -> Self {
        Event::Log {
            stream,
            line: line.into(),
        }
    }

    /// True when this is a `state` event whose state is terminal.
    pub fn is_terminal_state(&self) -> bool {
        matches!(self, Event::State { state, .. } if state.is_terminal())
    }
}

/// Error detail recorded on a job once it reaches `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    #[serde(rename = "errorCode")]
    pub error_code: String,
    pub message: String,
}

/// Serializable snapshot of a job's lifecycle metadata (no event history —
/// callers fetch events via the stream endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub state: JobState,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "startedAt", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt", skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}
