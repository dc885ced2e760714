//! Shared error type for the daemon — one `DaemonError` per API error
//! taxonomy entry, each carrying a stable `errorCode` and HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum DaemonError {
    #[error("no Authorization header")]
    AuthRequired,

    #[error("invalid or expired token")]
    AuthInvalid,

    #[error("origin not allowed")]
    OriginNotAllowed,

    #[error("rate limited")]
    RateLimited,

    #[error("request body too large")]
    RequestTooLarge,

    #[error("workspace root not configured")]
    WorkspaceRequired,

    #[error("path escapes workspace: {0}")]
    PathOutsideWorkspace(String),

    #[error("invalid repo URL")]
    InvalidRepoUrl,

    #[error("capability not granted: {0}")]
    CapabilityNotGranted(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("repo not found: {0}")]
    RepoNotFound(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    /// A request-shaped validation failure with no dedicated code of its
    /// own (e.g. a replayed/expired pairing code) — `errorCode` is
    /// `internal_error` per spec §7, but the status is 422.
    #[error("{0}")]
    Validation(String),

    /// A conflict with no dedicated code (destination already exists,
    /// cancelling an already-terminal job) — `errorCode` is
    /// `internal_error`, status 409.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InternalError(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::AuthInvalid => "auth_invalid",
            Self::OriginNotAllowed => "origin_not_allowed",
            Self::RateLimited => "rate_limited",
            Self::RequestTooLarge => "request_too_large",
            Self::WorkspaceRequired => "workspace_required",
            Self::PathOutsideWorkspace(_) => "path_outside_workspace",
            Self::InvalidRepoUrl => "invalid_repo_url",
            Self::CapabilityNotGranted(_) => "capability_not_granted",
            Self::JobNotFound(_) => "job_not_found",
            Self::RepoNotFound(_) => "repo_not_found",
            Self::PathNotFound(_) => "path_not_found",
            Self::Validation(_) | Self::Conflict(_) | Self::InternalError(_) | Self::Io(_) => {
                "internal_error"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthRequired | Self::AuthInvalid => StatusCode::UNAUTHORIZED,
            Self::OriginNotAllowed => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::WorkspaceRequired
            | Self::PathOutsideWorkspace(_)
            | Self::CapabilityNotGranted(_) => StatusCode::CONFLICT,
            Self::InvalidRepoUrl | Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::JobNotFound(_) | Self::RepoNotFound(_) | Self::PathNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InternalError(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(rename = "errorCode")]
    error_code: &'static str,
    message: String,
}

impl IntoResponse for DaemonError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error_code: self.code(),
            message: self.to_string(),
        };
        tracing::warn!(error_code = body.error_code, message = %body.message, "request rejected");
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;
