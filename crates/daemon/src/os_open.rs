//! `os.open` — spawn the platform's folder/terminal/editor opener (spec
//! §4.8). These are fire-and-forget child processes, not jobs: there is
//! no output to stream and no meaningful exit code to wait on (the
//! opened window outlives the request).

use std::path::Path;

use gd_domain::error::{DaemonError, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenTarget {
    Folder,
    Terminal,
    Vscode,
}

impl OpenTarget {
    /// `terminal` and `vscode` require prior capability approval (spec
    /// §4.8); opening a plain folder does not.
    pub fn requires_approval(self) -> bool {
        matches!(self, OpenTarget::Terminal | OpenTarget::Vscode)
    }
}

pub fn spawn_opener(target: OpenTarget, path: &Path) -> Result<()> {
    let result = match target {
        OpenTarget::Folder => spawn_folder(path),
        OpenTarget::Vscode => std::process::Command::new("code").arg(path).spawn().map(|_| ()),
        OpenTarget::Terminal => spawn_terminal(path),
    };
    result.map_err(|e| DaemonError::InternalError(format!("failed to open {target:?}: {e}")))
}

#[cfg(target_os = "macos")]
fn spawn_folder(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("open").arg(path).spawn().map(|_| ())
}

#[cfg(target_os = "linux")]
fn spawn_folder(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("xdg-open").arg(path).spawn().map(|_| ())
}

#[cfg(target_os = "windows")]
fn spawn_folder(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("explorer").arg(path).spawn().map(|_| ())
}

#[cfg(target_os = "macos")]
fn spawn_terminal(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("open")
        .args(["-a", "Terminal"])
        .arg(path)
        .spawn()
        .map(|_| ())
}

#[cfg(target_os = "linux")]
fn spawn_terminal(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("x-terminal-emulator")
        .arg("--working-directory")
        .arg(path)
        .spawn()
        .map(|_| ())
}

#[cfg(target_os = "windows")]
fn spawn_terminal(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("cmd")
        .args(["/C", "start", "cmd"])
        .current_dir(path)
        .spawn()
        .map(|_| ())
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn spawn_folder(_path: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "unsupported platform"))
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn spawn_terminal(_path: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "unsupported platform"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_terminal_and_vscode_require_approval() {
        assert!(!OpenTarget::Folder.requires_approval());
        assert!(OpenTarget::Terminal.requires_approval());
        assert!(OpenTarget::Vscode.requires_approval());
    }

    #[test]
    fn deserializes_lowercase_targets() {
        let target: OpenTarget = serde_json::from_str("\"vscode\"").unwrap();
        assert_eq!(target, OpenTarget::Vscode);
    }
}
