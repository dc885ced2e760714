//! `GET /v1/jobs/:id`, `GET /v1/jobs/:id/stream`, `POST
//! /v1/jobs/:id/cancel` (spec §4.6/§6). Streaming follows the teacher's
//! replay-then-follow SSE shape, adapted to close on a terminal `state`
//! event instead of a terminal task status.

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::Stream;
use gd_domain::error::{DaemonError, Result};
use gd_domain::job::{Event, JobId};

use crate::state::AppState;

pub async fn get_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<impl IntoResponse> {
    let snapshot = state.jobs.snapshot(id)?;
    Ok(Json(snapshot))
}

pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<impl IntoResponse> {
    state.jobs.cancel(id)?;
    Ok(Json(state.jobs.snapshot(id)?))
}

pub async fn stream_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<impl IntoResponse> {
    let (history, rx) = state
        .jobs
        .subscribe(id)
        .ok_or_else(|| DaemonError::JobNotFound(id.to_string()))?;

    let stream = make_job_event_stream(history, rx);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn make_job_event_stream(
    history: Vec<Event>,
    mut rx: tokio::sync::broadcast::Receiver<Event>,
) -> impl Stream<Item = std::result::Result<SseEvent, std::convert::Infallible>> {
    async_stream::stream! {
        for event in history {
            let data = serde_json::to_string(&event).unwrap_or_default();
            let terminal = event.is_terminal_state();
            yield Ok(SseEvent::default().data(data));
            if terminal {
                return;
            }
        }

        loop {
            match rx.recv().await {
                Ok(event) => {
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    let terminal = event.is_terminal_state();
                    yield Ok(SseEvent::default().data(data));
                    if terminal {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    yield Ok(SseEvent::default().data(format!("{{\"warning\":\"missed {n} events\"}}")));
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
