//! Package-manager selection and `deps/install` argv construction (spec §6).

use std::path::Path;

use gd_domain::error::{DaemonError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manager {
    #[default]
    Auto,
    Npm,
    Pnpm,
    Yarn,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Auto,
    Ci,
    Install,
}

#[derive(Debug, Clone, Deserialize)]
struct PackageJson {
    #[serde(rename = "packageManager")]
    package_manager: Option<String>,
}

/// `manager=auto`: prefer the `packageManager` field in `package.json` if
/// that tool is actually installed; otherwise pnpm/yarn/npm by lockfile
/// presence; otherwise npm.
pub fn select_manager(repo: &Path, requested: Manager) -> Manager {
    if requested != Manager::Auto {
        return requested;
    }

    if let Some(manager) = package_manager_field(repo).filter(|m| is_tool_installed(*m)) {
        return manager;
    }

    if repo.join("pnpm-lock.yaml").exists() {
        Manager::Pnpm
    } else if repo.join("yarn.lock").exists() {
        Manager::Yarn
    } else if repo.join("package-lock.json").exists() {
        Manager::Npm
    } else {
        Manager::Npm
    }
}

fn package_manager_field(repo: &Path) -> Option<Manager> {
    let raw = std::fs::read_to_string(repo.join("package.json")).ok()?;
    let parsed: PackageJson = serde_json::from_str(&raw).ok()?;
    let field = parsed.package_manager?;
    let name = field.split('@').next()?;
    match name {
        "npm" => Some(Manager::Npm),
        "pnpm" => Some(Manager::Pnpm),
        "yarn" => Some(Manager::Yarn),
        _ => None,
    }
}

fn is_tool_installed(manager: Manager) -> bool {
    which::which(binary_name(manager)).is_ok()
}

pub fn binary_name(manager: Manager) -> &'static str {
    match manager {
        Manager::Auto => "npm",
        Manager::Npm => "npm",
        Manager::Pnpm => "pnpm",
        Manager::Yarn => "yarn",
    }
}

/// Build the install argv for an already-resolved (non-`auto`) manager.
pub fn install_argv(repo: &Path, manager: Manager, mode: InstallMode, safer: bool) -> Result<Vec<String>> {
    let argv = match manager {
        Manager::Npm => {
            let lockfile_present = repo.join("package-lock.json").exists();
            let mut argv = if lockfile_present && mode != InstallMode::Install {
                vec!["ci".to_string()]
            } else {
                vec!["install".to_string()]
            };
            if safer {
                argv.push("--ignore-scripts".into());
            }
            argv
        }
        Manager::Pnpm => {
            let lockfile_present = repo.join("pnpm-lock.yaml").exists();
            let mut argv = vec!["install".to_string()];
            if mode == InstallMode::Ci || (mode == InstallMode::Auto && lockfile_present) {
                argv.push("--frozen-lockfile".into());
            }
            if safer {
                argv.push("--ignore-scripts".into());
            }
            argv
        }
        Manager::Yarn => {
            let lockfile_present = repo.join("yarn.lock").exists();
            let is_berry = repo.join(".yarnrc.yml").exists();
            let mut argv = vec!["install".to_string()];
            if mode == InstallMode::Ci || (mode == InstallMode::Auto && lockfile_present) || is_berry {
                argv.push("--immutable".into());
            }
            if safer {
                argv.push("--ignore-scripts".into());
            }
            argv
        }
        Manager::Auto => {
            return Err(DaemonError::InternalError(
                "install_argv requires a resolved manager".into(),
            ))
        }
    };
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_falls_back_to_npm_with_no_lockfiles() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(select_manager(dir.path(), Manager::Auto), Manager::Npm);
    }

    #[test]
    fn auto_detects_pnpm_lockfile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        assert_eq!(select_manager(dir.path(), Manager::Auto), Manager::Pnpm);
    }

    #[test]
    fn auto_detects_yarn_lockfile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yarn.lock"), "").unwrap();
        assert_eq!(select_manager(dir.path(), Manager::Auto), Manager::Yarn);
    }

    #[test]
    fn explicit_manager_is_never_overridden() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        assert_eq!(select_manager(dir.path(), Manager::Npm), Manager::Npm);
    }

    #[test]
    fn npm_uses_ci_when_lockfile_present_and_mode_not_install() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "").unwrap();
        let argv = install_argv(dir.path(), Manager::Npm, InstallMode::Auto, false).unwrap();
        assert_eq!(argv, vec!["ci"]);
    }

    #[test]
    fn npm_uses_install_when_mode_is_install() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "").unwrap();
        let argv = install_argv(dir.path(), Manager::Npm, InstallMode::Install, false).unwrap();
        assert_eq!(argv, vec!["install"]);
    }

    #[test]
    fn npm_appends_ignore_scripts_when_safer() {
        let dir = tempfile::tempdir().unwrap();
        let argv = install_argv(dir.path(), Manager::Npm, InstallMode::Install, true).unwrap();
        assert_eq!(argv, vec!["install", "--ignore-scripts"]);
    }

    #[test]
    fn pnpm_appends_frozen_lockfile_in_ci_mode() {
        let dir = tempfile::tempdir().unwrap();
        let argv = install_argv(dir.path(), Manager::Pnpm, InstallMode::Ci, false).unwrap();
        assert_eq!(argv, vec!["install", "--frozen-lockfile"]);
    }

    #[test]
    fn pnpm_auto_mode_checks_lockfile_presence() {
        let dir = tempfile::tempdir().unwrap();
        let argv = install_argv(dir.path(), Manager::Pnpm, InstallMode::Auto, false).unwrap();
        assert_eq!(argv, vec!["install"]);
        std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        let argv = install_argv(dir.path(), Manager::Pnpm, InstallMode::Auto, false).unwrap();
        assert_eq!(argv, vec!["install", "--frozen-lockfile"]);
    }

    #[test]
    fn yarn_berry_forces_immutable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".yarnrc.yml"), "").unwrap();
        let argv = install_argv(dir.path(), Manager::Yarn, InstallMode::Auto, false).unwrap();
        assert_eq!(argv, vec!["install", "--immutable"]);
    }

    #[test]
    fn install_argv_rejects_auto_manager() {
        let dir = tempfile::tempdir().unwrap();
        assert!(install_argv(dir.path(), Manager::Auto, InstallMode::Auto, false).is_err());
    }
}
