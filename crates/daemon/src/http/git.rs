//! `POST /v1/git/clone`, `POST /v1/git/fetch`, `GET /v1/git/status` (spec
//! §4.8/§6).

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use gd_domain::error::{DaemonError, Result};
use gd_domain::job::{JobState, ProgressKind};
use serde::Deserialize;

use crate::git::{self, CloneOptions};
use crate::http::common::workspace_root;
use crate::sandbox::{ensure_relative, resolve_inside_workspace};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CloneRequest {
    #[serde(rename = "repoUrl")]
    repo_url: String,
    #[serde(rename = "destRelative")]
    dest_relative: String,
    #[serde(default)]
    options: CloneRequestOptions,
}

#[derive(Deserialize, Default)]
pub struct CloneRequestOptions {
    branch: Option<String>,
    depth: Option<u32>,
}

#[derive(Deserialize)]
pub struct FetchRequest {
    #[serde(rename = "repoPath")]
    repo_path: String,
    #[serde(default = "d_remote")]
    remote: String,
    #[serde(default)]
    prune: bool,
}

fn d_remote() -> String {
    "origin".to_string()
}

#[derive(Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "repoPath")]
    repo_path: String,
}

#[derive(serde::Serialize)]
struct JobAccepted {
    #[serde(rename = "jobId")]
    job_id: gd_domain::job::JobId,
}

pub async fn clone(State(state): State<AppState>, Json(body): Json<CloneRequest>) -> Result<impl IntoResponse> {
    git::validate_repo_url(&body.repo_url)?;
    ensure_relative(&body.dest_relative)?;

    let root = workspace_root(&state)?;
    let dest = resolve_inside_workspace(&root, &body.dest_relative, true)?;

    if dest.exists() {
        return Err(DaemonError::Conflict(format!(
            "{} already exists",
            body.dest_relative
        )));
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(DaemonError::Io)?;
    }

    let options = CloneOptions {
        branch: body.options.branch,
        depth: body.options.depth,
    };
    let argv = git::clone_argv(&body.repo_url, &dest, &options);

    let job_id = state.jobs.enqueue(move |ctx| async move {
        run_git_job(ctx, argv, root).await;
    });

    Ok((axum::http::StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}

pub async fn fetch(State(state): State<AppState>, Json(body): Json<FetchRequest>) -> Result<impl IntoResponse> {
    let root = workspace_root(&state)?;
    let repo = git::resolve_repo_path(&root, &body.repo_path)?;
    let argv = git::fetch_argv(&repo, &body.remote, body.prune);

    let job_id = state.jobs.enqueue(move |ctx| async move {
        run_git_job(ctx, argv, root).await;
    });

    Ok((axum::http::StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}

pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse> {
    let root = workspace_root(&state)?;
    let repo = git::resolve_repo_path(&root, &query.repo_path)?;
    let status = git::run_status(&repo).await?;
    Ok(Json(status))
}

/// Shared clone/fetch job body: runs `git <argv>` with cwd = workspace
/// root and the shared git-progress parser on stderr.
async fn run_git_job(ctx: std::sync::Arc<crate::jobs::JobContext>, argv: Vec<String>, root: std::path::PathBuf) {
    let outcome = gd_procrunner::run_command(
        ctx.clone(),
        "git",
        &argv,
        &root,
        Some(ProgressKind::Git),
        Some(git::parse_git_progress),
    )
    .await;

    if ctx.is_finished() {
        return;
    }

    match outcome {
        Ok(outcome) if outcome.success => ctx.finish(JobState::Done, None, None),
        Ok(outcome) => ctx.finish(
            JobState::Error,
            Some(gd_domain::job::JobError {
                error_code: "internal_error".into(),
                message: format!("git exited with {:?}", outcome.exit_code),
            }),
            None,
        ),
        Err(e) => ctx.finish(
            JobState::Error,
            Some(gd_domain::job::JobError {
                error_code: "internal_error".into(),
                message: e.to_string(),
            }),
            None,
        ),
    }
}
