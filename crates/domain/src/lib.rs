pub mod capability;
pub mod config;
pub mod error;
pub mod job;

pub use capability::Capability;
pub use config::Config;
pub use error::{DaemonError, Result};
pub use job::{Event, JobError, JobId, JobSnapshot, JobState, LogStream, ProgressKind};
