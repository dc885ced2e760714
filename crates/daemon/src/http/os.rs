//! `POST /v1/os/open` (spec §4.8). Folder opens need no approval; terminal
//! and vscode opens go through the capability-grant flow first.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use gd_domain::capability::Capability;
use gd_domain::error::Result;

use crate::http::common::{ensure_capability, origin_header, workspace_root};
use crate::os_open::{spawn_opener, OpenTarget};
use crate::sandbox::resolve_inside_workspace;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OpenRequest {
    target: OpenTarget,
    path: String,
}

fn capability_for(target: OpenTarget) -> Option<Capability> {
    match target {
        OpenTarget::Folder => None,
        OpenTarget::Terminal => Some(Capability::OpenTerminal),
        OpenTarget::Vscode => Some(Capability::OpenVscode),
    }
}

pub async fn open(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OpenRequest>,
) -> Result<impl IntoResponse> {
    let root = workspace_root(&state)?;
    let resolved = resolve_inside_workspace(&root, &body.path, false)?;

    if let Some(capability) = capability_for(body.target) {
        let origin = origin_header(&headers)?;
        ensure_capability(&state, &origin, &resolved, &root, capability).await?;
    }

    spawn_opener(body.target, &resolved)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
