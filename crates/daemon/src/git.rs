//! Git operations: `repoUrl` validation, clone/fetch argv construction, and
//! synchronous `status --porcelain=2 -b` parsing (spec §4.8).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use gd_domain::error::{DaemonError, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::sandbox::resolve_inside_workspace;

fn repo_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:git@[A-Za-z0-9._-]+:[\w./-]+(?:\.git)?|(?:https|ssh)://[A-Za-z0-9._-]+(?::\d+)?/[\w./-]+(?:\.git)?)$",
        )
        .expect("static repo url pattern compiles")
    })
}

/// Accepts `git@host:path`, `https://host/path`, `ssh://host/path`; rejects
/// `file://` and anything beginning with `/`, `./`, `../`.
pub fn validate_repo_url(url: &str) -> Result<()> {
    if url.starts_with('/') || url.starts_with("./") || url.starts_with("../") || url.starts_with("file://") {
        return Err(DaemonError::InvalidRepoUrl);
    }
    if repo_url_pattern().is_match(url) {
        Ok(())
    } else {
        Err(DaemonError::InvalidRepoUrl)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub branch: Option<String>,
    pub depth: Option<u32>,
}

/// Build `git clone [--branch X] [--depth N] <url> <dest>` argv, run with
/// cwd = workspace root.
pub fn clone_argv(url: &str, dest: &Path, options: &CloneOptions) -> Vec<String> {
    let mut argv = vec!["clone".to_string()];
    if let Some(branch) = &options.branch {
        argv.push("--branch".into());
        argv.push(branch.clone());
    }
    if let Some(depth) = options.depth {
        argv.push("--depth".into());
        argv.push(depth.to_string());
    }
    argv.push(url.to_string());
    argv.push(dest.display().to_string());
    argv
}

/// Build `git -C repo fetch <remote> [--prune]` argv.
pub fn fetch_argv(repo: &Path, remote: &str, prune: bool) -> Vec<String> {
    let mut argv = vec![
        "-C".to_string(),
        repo.display().to_string(),
        "fetch".to_string(),
        remote.to_string(),
    ];
    if prune {
        argv.push("--prune".into());
    }
    argv
}

/// `resolveInsideWorkspace(...)`, then assert the resolved path is a
/// directory containing a `.git` entry — otherwise `repo_not_found`.
pub fn resolve_repo_path(root: &Path, rel: &str) -> Result<PathBuf> {
    let resolved = resolve_inside_workspace(root, rel, false)?;
    if !resolved.is_dir() || !resolved.join(".git").exists() {
        return Err(DaemonError::RepoNotFound(rel.to_string()));
    }
    Ok(resolved)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GitStatus {
    pub branch: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    #[serde(rename = "untrackedCount")]
    pub untracked_count: u32,
    #[serde(rename = "stagedCount")]
    pub staged_count: u32,
    #[serde(rename = "unstagedCount")]
    pub unstaged_count: u32,
    #[serde(rename = "conflictsCount")]
    pub conflicts_count: u32,
    pub clean: bool,
}

/// Parse `git status --porcelain=2 -b` output per spec §4.8.
pub fn parse_status(output: &str) -> GitStatus {
    let mut branch = None;
    let mut ahead = 0;
    let mut behind = 0;
    let mut untracked_count = 0;
    let mut staged_count = 0;
    let mut unstaged_count = 0;
    let mut conflicts_count = 0;

    for line in output.lines() {
        if let Some(name) = line.strip_prefix("# branch.head ") {
            branch = Some(name.trim().to_string());
        } else if let Some(ab) = line.strip_prefix("# branch.ab ") {
            for token in ab.split_whitespace() {
                if let Some(n) = token.strip_prefix('+') {
                    ahead = n.parse().unwrap_or(0);
                } else if let Some(n) = token.strip_prefix('-') {
                    behind = n.parse().unwrap_or(0);
                }
            }
        } else if line.starts_with('?') {
            untracked_count += 1;
        } else if line.starts_with("u ") {
            conflicts_count += 1;
        } else if line.starts_with("1 ") || line.starts_with("2 ") {
            if let Some(xy) = line.split_whitespace().nth(1) {
                let mut chars = xy.chars();
                let index = chars.next().unwrap_or('.');
                let worktree = chars.next().unwrap_or('.');
                if index != '.' {
                    staged_count += 1;
                }
                if worktree != '.' {
                    unstaged_count += 1;
                }
            }
        }
    }

    let clean = untracked_count == 0 && staged_count == 0 && unstaged_count == 0 && conflicts_count == 0;

    GitStatus {
        branch,
        ahead,
        behind,
        untracked_count,
        staged_count,
        unstaged_count,
        conflicts_count,
        clean,
    }
}

/// Parse a `git clone --progress`/`git fetch --progress` stderr line into
/// `(percent, detail)`, e.g. `Receiving objects:  42% (123/456), 1.2 MiB`
/// or `Resolving deltas: 100% (10/10)`. Returns `None` for lines that
/// aren't progress lines (most of stderr output).
pub fn parse_git_progress(line: &str) -> Option<(Option<u8>, Option<String>)> {
    let trimmed = line.trim();
    let prefix = ["Receiving objects:", "Resolving deltas:", "Compressing objects:"]
        .iter()
        .find(|p| trimmed.starts_with(**p))?;
    let rest = trimmed[prefix.len()..].trim();
    let percent_str = rest.split('%').next()?.trim();
    let percent = percent_str.parse::<u8>().ok();
    Some((percent, Some(trimmed.to_string())))
}

/// Run `git -C repo status --porcelain=2 -b` synchronously — spec §5 calls
/// this out as the one child-process spawn/await on the request path
/// itself, rather than a job.
pub async fn run_status(repo: &Path) -> Result<GitStatus> {
    let output = tokio::process::Command::new("git")
        .arg("-C")
        .arg(repo)
        .arg("status")
        .arg("--porcelain=2")
        .arg("-b")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(DaemonError::Io)?;

    if !output.status.success() {
        return Err(DaemonError::InternalError(format!(
            "git status exited with {:?}",
            output.status.code()
        )));
    }

    Ok(parse_status(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_scp_like_url() {
        assert!(validate_repo_url("git@github.com:org/repo.git").is_ok());
    }

    #[test]
    fn accepts_https_url() {
        assert!(validate_repo_url("https://github.com/org/repo.git").is_ok());
    }

    #[test]
    fn accepts_ssh_url() {
        assert!(validate_repo_url("ssh://git@host/org/repo.git").is_ok());
    }

    #[test]
    fn rejects_file_scheme() {
        assert!(validate_repo_url("file:///tmp/repo").is_err());
    }

    #[test]
    fn rejects_leading_slash() {
        assert!(validate_repo_url("/etc/passwd").is_err());
    }

    #[test]
    fn rejects_dot_relative() {
        assert!(validate_repo_url("./escape").is_err());
        assert!(validate_repo_url("../escape").is_err());
    }

    #[test]
    fn clone_argv_includes_options() {
        let opts = CloneOptions {
            branch: Some("main".into()),
            depth: Some(1),
        };
        let argv = clone_argv("git@host:o/r.git", Path::new("/ws/r"), &opts);
        assert_eq!(
            argv,
            vec!["clone", "--branch", "main", "--depth", "1", "git@host:o/r.git", "/ws/r"]
        );
    }

    #[test]
    fn clone_argv_omits_absent_options() {
        let argv = clone_argv("git@host:o/r.git", Path::new("/ws/r"), &CloneOptions::default());
        assert_eq!(argv, vec!["clone", "git@host:o/r.git", "/ws/r"]);
    }

    #[test]
    fn fetch_argv_includes_prune() {
        let argv = fetch_argv(Path::new("/ws/r"), "origin", true);
        assert_eq!(argv, vec!["-C", "/ws/r", "fetch", "origin", "--prune"]);
    }

    #[test]
    fn parses_clean_status() {
        let output = "# branch.head main\n# branch.ab +0 -0\n";
        let status = parse_status(output);
        assert!(status.clean);
        assert_eq!(status.branch.as_deref(), Some("main"));
    }

    #[test]
    fn parses_ahead_behind() {
        let output = "# branch.head main\n# branch.ab +3 -2\n";
        let status = parse_status(output);
        assert_eq!(status.ahead, 3);
        assert_eq!(status.behind, 2);
    }

    #[test]
    fn counts_untracked_staged_unstaged_conflicts() {
        let output = "# branch.head main\n# branch.ab +0 -0\n\
            1 M. N... 100644 100644 100644 aaa bbb src/a.rs\n\
            1 .M N... 100644 100644 100644 aaa bbb src/b.rs\n\
            2 R. N... 100644 100644 100644 aaa bbb src/c.rs\tsrc/old.rs\n\
            u UU N... 100644 100644 100644 100644 aaa bbb ccc src/d.rs\n\
            ? src/e.rs\n";
        let status = parse_status(output);
        assert_eq!(status.staged_count, 2);
        assert_eq!(status.unstaged_count, 1);
        assert_eq!(status.conflicts_count, 1);
        assert_eq!(status.untracked_count, 1);
        assert!(!status.clean);
    }

    #[tokio::test]
    async fn resolve_repo_path_rejects_non_git_directory() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("plain")).unwrap();
        let err = resolve_repo_path(root.path(), "plain").unwrap_err();
        assert_eq!(err.code(), "repo_not_found");
    }

    #[test]
    fn parses_receiving_objects_percent() {
        let (percent, detail) = parse_git_progress("Receiving objects:  42% (123/456), 1.2 MiB").unwrap();
        assert_eq!(percent, Some(42));
        assert!(detail.unwrap().contains("Receiving objects"));
    }

    #[test]
    fn ignores_non_progress_lines() {
        assert!(parse_git_progress("Cloning into 'repo'...").is_none());
    }

    #[tokio::test]
    async fn resolve_repo_path_accepts_git_directory() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("repo/.git")).unwrap();
        let resolved = resolve_repo_path(root.path(), "repo").unwrap();
        assert!(resolved.ends_with("repo"));
    }
}
