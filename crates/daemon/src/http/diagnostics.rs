//! `GET /v1/diagnostics` — operator-facing occupancy snapshot (spec
//! SUPPLEMENT: not in the distilled route table, grounded in the
//! teacher's `admin::system_info`/`admin::metrics` handlers).

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde::Serialize;

use gd_domain::error::Result;

use crate::state::AppState;

#[derive(Serialize)]
struct JobsDiagnostics {
    running: usize,
    queued: usize,
    #[serde(rename = "maxConcurrent")]
    max_concurrent: usize,
}

#[derive(Serialize)]
struct DiagnosticsResponse {
    #[serde(rename = "uptimeSeconds")]
    uptime_seconds: u64,
    jobs: JobsDiagnostics,
    #[serde(rename = "activeTokens")]
    active_tokens: usize,
    #[serde(rename = "pendingPairings")]
    pending_pairings: usize,
}

pub async fn diagnostics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(DiagnosticsResponse {
        uptime_seconds: state.uptime().as_secs(),
        jobs: JobsDiagnostics {
            running: state.jobs.running_count(),
            queued: state.jobs.queued_count(),
            max_concurrent: state.jobs.max_concurrent(),
        },
        active_tokens: state.tokens.record_count(),
        pending_pairings: state.pairing.pending_count(),
    }))
}
