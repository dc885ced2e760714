//! `POST /v1/deps/install` (spec §4.8/§6).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use gd_domain::capability::Capability;
use gd_domain::error::{DaemonError, Result};
use gd_domain::job::{JobState, ProgressKind};

use crate::deps::{binary_name, install_argv, select_manager, InstallMode, Manager};
use crate::http::common::{ensure_capability, origin_header, workspace_root};
use crate::sandbox::resolve_inside_workspace;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct InstallRequest {
    #[serde(rename = "repoPath")]
    repo_path: String,
    #[serde(default)]
    manager: Manager,
    #[serde(default)]
    mode: InstallMode,
    safer: Option<bool>,
}

#[derive(serde::Serialize)]
struct JobAccepted {
    #[serde(rename = "jobId")]
    job_id: gd_domain::job::JobId,
}

pub async fn install(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<InstallRequest>,
) -> Result<impl IntoResponse> {
    let root = workspace_root(&state)?;
    let repo = resolve_inside_workspace(&root, &body.repo_path, false)?;

    if !repo.join("package.json").exists() {
        return Err(DaemonError::Validation(
            "repoPath does not contain a package.json".into(),
        ));
    }

    let origin = origin_header(&headers)?;
    ensure_capability(&state, &origin, &repo, &root, Capability::DepsInstall).await?;

    let safer = body.safer.unwrap_or(state.config.read().deps.default_safer);
    let manager = select_manager(&repo, body.manager);
    let argv = install_argv(&repo, manager, body.mode, safer)?;
    let program = binary_name(manager).to_string();

    let job_id = state.jobs.enqueue(move |ctx| async move {
        let outcome = gd_procrunner::run_command(
            ctx.clone(),
            &program,
            &argv,
            &repo,
            Some(ProgressKind::Deps),
            None,
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
                    message: format!("{program} exited with {:?}", outcome.exit_code),
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
    });

    Ok((axum::http::StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}
