//! The HTTP surface (spec §4.8/§6). Route layout mirrors the teacher's
//! `api::router` split into a public group (`meta`, `pair` — origin/rate
//! checks only) and a protected group (bearer token required), with the
//! admission filter wrapping both as the outermost layer.

pub mod common;
pub mod deps;
pub mod diagnostics;
pub mod git;
pub mod jobs;
pub mod meta;
pub mod os;
pub mod pair;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::admission::{admission_filter, build_cors_layer};
use crate::auth::require_bearer_token;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/v1/meta", get(meta::meta))
        .route("/v1/pair", post(pair::pair));

    let protected = Router::new()
        .route("/v1/jobs/:id", get(jobs::get_job))
        .route("/v1/jobs/:id/stream", get(jobs::stream_job))
        .route("/v1/jobs/:id/cancel", post(jobs::cancel_job))
        .route("/v1/git/clone", post(git::clone))
        .route("/v1/git/fetch", post(git::fetch))
        .route("/v1/git/status", get(git::status))
        .route("/v1/os/open", post(os::open))
        .route("/v1/deps/install", post(deps::install))
        .route("/v1/diagnostics", get(diagnostics::diagnostics))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token));

    let cors_layer = build_cors_layer(&state.config.read().origin_allowlist);

    public
        .merge(protected)
        .route_layer(middleware::from_fn_with_state(state.clone(), admission_filter))
        .layer(cors_layer)
        .with_state(state)
}
