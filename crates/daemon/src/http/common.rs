//! Shared helpers for HTTP handlers: origin extraction, workspace-root
//! lookup, and the approval grant flow (spec §4.5).

use std::path::{Path, PathBuf};

use axum::http::HeaderMap;

use gd_domain::capability::Capability;
use gd_domain::error::{DaemonError, Result};

use crate::approval::{grant_wildcard, has_approval, prompt_yes_no};
use crate::state::AppState;

/// By the time a handler runs, the admission filter has already verified
/// `Origin` is present and allowlisted — this just re-reads it.
pub fn origin_header(headers: &HeaderMap) -> Result<String> {
    headers
        .get(axum::http::header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| DaemonError::Validation("missing Origin header".into()))
}

pub fn workspace_root(state: &AppState) -> Result<PathBuf> {
    state
        .config
        .read()
        .workspace_root
        .clone()
        .ok_or(DaemonError::WorkspaceRequired)
}

/// Check the approval policy; on a miss, run the interactive grant flow
/// and persist the result. Returns `capability_not_granted` if the
/// prompt is declined or no controlling terminal is reachable.
pub async fn ensure_capability(
    state: &AppState,
    origin: &str,
    absolute_path: &Path,
    root: &Path,
    capability: Capability,
) -> Result<()> {
    {
        let config = state.config.read();
        if has_approval(&config.approvals, origin, absolute_path, root, capability) {
            return Ok(());
        }
    }

    let question = format!(
        "Allow {origin} to use {capability} on {}?",
        absolute_path.display()
    );
    let granted = tokio::task::spawn_blocking(move || prompt_yes_no(&question))
        .await
        .map_err(|e| DaemonError::InternalError(format!("approval prompt task: {e}")))??;

    if !granted {
        return Err(DaemonError::CapabilityNotGranted(capability.to_string()));
    }

    let mut config = state.config.write();
    grant_wildcard(&mut config.approvals, origin, capability);
    crate::config_io::save_config(&state.config_path, &config)?;
    Ok(())
}
