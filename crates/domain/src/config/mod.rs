mod approvals;
mod deps;
mod jobs;
mod pairing;
mod server;

pub use approvals::*;
pub use deps::*;
pub use jobs::*;
pub use pairing::*;
pub use server::*;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Ordered, exact-match allowed origins. Must be non-empty.
    #[serde(default, rename = "originAllowlist")]
    pub origin_allowlist: Vec<String>,
    /// Absent = path-taking routes are disabled (`workspace_required`).
    #[serde(default, rename = "workspaceRoot")]
    pub workspace_root: Option<PathBuf>,
    #[serde(default)]
    pub pairing: PairingConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub deps: DepsConfig,
    #[serde(default)]
    pub approvals: Vec<ApprovalEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Config {
    /// Validate the invariants from spec §3/§6. Does not mutate.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.host != "127.0.0.1" && self.server.host != "localhost" {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: format!(
                    "server.host must be a loopback literal, got {:?}",
                    self.server.host
                ),
            });
        }

        if self.origin_allowlist.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "originAllowlist must not be empty".into(),
            });
        }

        if self.jobs.max_concurrent == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "jobs.maxConcurrent must be >= 1".into(),
            });
        }

        if self.jobs.timeout_seconds == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "jobs.timeoutSeconds must be > 0".into(),
            });
        }

        if self.workspace_root.is_none() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "workspaceRoot is not configured — all path-taking routes will return workspace_required".into(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_invalid_without_allowlist() {
        let cfg = Config::default();
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("originAllowlist")));
    }

    #[test]
    fn non_loopback_host_is_an_error() {
        let mut cfg = Config {
            origin_allowlist: vec!["http://localhost:5173".into()],
            ..Default::default()
        };
        cfg.server.host = "0.0.0.0".into();
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn valid_config_has_no_errors() {
        let cfg = Config {
            origin_allowlist: vec!["http://localhost:5173".into()],
            workspace_root: Some(PathBuf::from("/tmp/ws")),
            ..Default::default()
        };
        let issues = cfg.validate();
        assert!(!issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn zero_max_concurrent_is_an_error() {
        let mut cfg = Config {
            origin_allowlist: vec!["http://localhost:5173".into()],
            ..Default::default()
        };
        cfg.jobs.max_concurrent = 0;
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.message.contains("maxConcurrent")));
    }
}
