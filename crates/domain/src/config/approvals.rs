use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::Capability;

/// A persisted grant: `origin` may perform `capabilities` against
/// `repo_path` (or any path under the workspace root, if `repo_path` is
/// `None` — the wildcard form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalEntry {
    pub origin: String,
    #[serde(rename = "repoPath", skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<String>,
    pub capabilities: HashSet<Capability>,
    #[serde(rename = "approvedAt")]
    pub approved_at: DateTime<Utc>,
}

impl ApprovalEntry {
    pub fn is_wildcard(&self) -> bool {
        self.repo_path.is_none()
    }
}
