//! Bearer-token guard for protected routes (spec §4.2/§7: `auth_required`
//! when the header is absent, `auth_invalid` when it doesn't verify).
//! Unlike the teacher's single shared `SA_API_TOKEN`, tokens here are
//! minted per origin by the pairing flow, so the guard looks the
//! presented token up against the caller's own `Origin` header.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use gd_domain::error::DaemonError;

use crate::state::AppState;

pub async fn require_bearer_token(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    match check(&state, &req) {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

fn check(state: &AppState, req: &Request<Body>) -> Result<(), DaemonError> {
    let origin = req
        .headers()
        .get(axum::http::header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .ok_or(DaemonError::AuthRequired)?;

    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(DaemonError::AuthRequired)?;

    if state.tokens.verify_token(origin, token) {
        Ok(())
    } else {
        Err(DaemonError::AuthInvalid)
    }
}
