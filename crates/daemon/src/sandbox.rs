//! Workspace sandbox — canonical path resolution with symlink-escape
//! detection. Every filesystem path the daemon ever touches passes
//! through here first.

use std::path::{Component, Path, PathBuf};

use gd_domain::error::{DaemonError, Result};

const MAX_CANDIDATE_LEN: usize = 4096;

/// Resolve `candidate` (a path relative to `root`, or an absolute path —
/// both are accepted and then checked) against the canonical workspace
/// root, rejecting anything that escapes it even via a symlinked
/// subcomponent.
///
/// `allow_missing`: when false, the resolved path must already exist.
pub fn resolve_inside_workspace(
    root: &Path,
    candidate: &str,
    allow_missing: bool,
) -> Result<PathBuf> {
    if candidate.len() > MAX_CANDIDATE_LEN {
        return Err(DaemonError::PathOutsideWorkspace(
            "candidate path too long".into(),
        ));
    }

    let canonical_root = std::fs::canonicalize(root)
        .map_err(|e| DaemonError::InternalError(format!("canonicalizing workspace root: {e}")))?;

    let joined = canonical_root.join(candidate);

    let (canonical_target, existed) = if joined.exists() {
        (std::fs::canonicalize(&joined).map_err(DaemonError::Io)?, true)
    } else {
        // Walk up from the candidate to the nearest existing ancestor,
        // canonicalise *that* (collapsing any symlinks in the part that
        // does exist), then re-append the not-yet-created tail verbatim
        // — those components can't be symlinks if they don't exist yet.
        let mut tail = Vec::new();
        let mut ancestor = joined.as_path();
        loop {
            if ancestor.exists() {
                break;
            }
            let Some(name) = ancestor.file_name() else {
                return Err(DaemonError::PathOutsideWorkspace(
                    "no existing ancestor under the workspace root".into(),
                ));
            };
            tail.push(name.to_owned());
            let Some(parent) = ancestor.parent() else {
                return Err(DaemonError::PathOutsideWorkspace(
                    "no existing ancestor under the workspace root".into(),
                ));
            };
            ancestor = parent;
        }
        let canonical_ancestor = std::fs::canonicalize(ancestor).map_err(DaemonError::Io)?;
        let mut target = canonical_ancestor;
        for name in tail.into_iter().rev() {
            target.push(name);
        }
        (target, false)
    };

    if !is_descendant_or_equal(&canonical_root, &canonical_target) {
        return Err(DaemonError::PathOutsideWorkspace(format!(
            "{candidate} resolves outside the workspace root"
        )));
    }

    if !allow_missing && !existed {
        return Err(DaemonError::PathNotFound(candidate.to_string()));
    }

    Ok(canonical_target)
}

/// True iff `target` is `root` itself or strictly descends from it —
/// computed on already-canonicalized paths, so this is a pure
/// prefix/component comparison, not another filesystem hit.
fn is_descendant_or_equal(root: &Path, target: &Path) -> bool {
    let Ok(rel) = target.strip_prefix(root) else {
        return false;
    };
    // `strip_prefix` never yields a leading `..`; guard against an empty
    // relative path being treated specially elsewhere (it means "root
    // itself", which is allowed).
    !rel
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

/// Reject absolute paths and any path that, after normalisation, is `.`
/// or begins with `..`. Used for request fields that must describe a
/// location *relative to* the workspace root (e.g. `git.clone`'s
/// `destRelative`).
pub fn ensure_relative(candidate: &str) -> Result<()> {
    let path = Path::new(candidate);
    if path.is_absolute() {
        return Err(DaemonError::PathOutsideWorkspace(format!(
            "{candidate} must be relative"
        )));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(DaemonError::PathOutsideWorkspace(format!(
                    "{candidate} must not traverse above the workspace root"
                )));
            }
            Component::CurDir => {}
            Component::Normal(part) => normalized.push(part),
            Component::RootDir | Component::Prefix(_) => {
                return Err(DaemonError::PathOutsideWorkspace(format!(
                    "{candidate} must be relative"
                )));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(DaemonError::PathOutsideWorkspace(
            "path must not be empty".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    #[test]
    fn resolves_plain_relative_path() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("repo")).unwrap();
        let resolved = resolve_inside_workspace(root.path(), "repo", false).unwrap();
        assert_eq!(
            resolved,
            std::fs::canonicalize(root.path().join("repo")).unwrap()
        );
    }

    #[test]
    fn rejects_dotdot_escape() {
        let root = tempfile::tempdir().unwrap();
        let err = resolve_inside_workspace(root.path(), "../escape", true).unwrap_err();
        assert_eq!(err.code(), "path_outside_workspace");
    }

    #[test]
    fn rejects_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        symlink(outside.path(), root.path().join("link")).unwrap();
        let err = resolve_inside_workspace(root.path(), "link/inside", true).unwrap_err();
        assert_eq!(err.code(), "path_outside_workspace");
    }

    #[test]
    fn allows_missing_when_flag_set() {
        let root = tempfile::tempdir().unwrap();
        let resolved = resolve_inside_workspace(root.path(), "not-yet-cloned", true).unwrap();
        assert!(resolved.starts_with(std::fs::canonicalize(root.path()).unwrap()));
    }

    #[test]
    fn missing_without_allow_missing_errors() {
        let root = tempfile::tempdir().unwrap();
        let err = resolve_inside_workspace(root.path(), "nope", false).unwrap_err();
        assert_eq!(err.code(), "path_not_found");
    }

    #[test]
    fn candidate_too_long_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let huge = "a".repeat(5000);
        let err = resolve_inside_workspace(root.path(), &huge, true).unwrap_err();
        assert_eq!(err.code(), "path_outside_workspace");
    }

    #[test]
    fn missing_parent_under_root_still_resolves() {
        let root = tempfile::tempdir().unwrap();
        let resolved = resolve_inside_workspace(root.path(), "sub/dest", true).unwrap();
        assert!(resolved.ends_with("sub/dest"));
    }

    #[test]
    fn ensure_relative_rejects_absolute() {
        assert!(ensure_relative("/etc/passwd").is_err());
    }

    #[test]
    fn ensure_relative_rejects_parent_traversal() {
        assert!(ensure_relative("../escape").is_err());
        assert!(ensure_relative("a/../../b").is_err());
    }

    #[test]
    fn ensure_relative_rejects_current_dir_only() {
        assert!(ensure_relative(".").is_err());
    }

    #[test]
    fn ensure_relative_accepts_plain_relative() {
        assert!(ensure_relative("repos/my-repo").is_ok());
    }
}
