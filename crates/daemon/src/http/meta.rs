//! `GET /v1/meta` — unauthenticated capability/pairing/workspace summary
//! (spec §4.8). The one route a fresh, unpaired extension can call to
//! discover what to do next.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json};
use serde::Serialize;

use gd_domain::error::Result;

use crate::http::common::origin_header;
use crate::state::AppState;

#[derive(Serialize)]
struct Build {
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    git_sha: Option<&'static str>,
    rust_version: &'static str,
}

#[derive(Serialize)]
struct Pairing {
    paired: bool,
}

#[derive(Serialize)]
struct Workspace {
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<String>,
}

#[derive(Serialize)]
struct MetaResponse {
    version: &'static str,
    build: Build,
    pairing: Pairing,
    workspace: Workspace,
    capabilities: Vec<&'static str>,
}

pub async fn meta(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    let origin = origin_header(&headers)?;
    let paired = state.tokens.has_active(&origin);

    let config = state.config.read();
    let workspace = Workspace {
        configured: config.workspace_root.is_some(),
        root: config.workspace_root.as_ref().map(|p| p.display().to_string()),
    };

    Ok(Json(MetaResponse {
        version: env!("CARGO_PKG_VERSION"),
        build: Build {
            version: env!("CARGO_PKG_VERSION"),
            git_sha: option_env!("GIT_DAEMON_GIT_SHA"),
            rust_version: env!("CARGO_PKG_RUST_VERSION"),
        },
        pairing: Pairing { paired },
        workspace,
        capabilities: vec![
            "git.clone",
            "git.fetch",
            "git.status",
            "os.open",
            "deps.install",
        ],
    }))
}
