//! Approval policy — a pure predicate over persisted approval records,
//! plus a prompt-driven grant flow invoked on a miss.

use std::path::Path;

use chrono::Utc;
use gd_domain::capability::Capability;
use gd_domain::config::ApprovalEntry;
use gd_domain::error::{DaemonError, Result};

/// True iff some entry grants `capability` to `origin` over
/// `absolute_repo_path`. `repoPath` matches when it is absent (wildcard),
/// equal to the argument verbatim, or — if relative — equal once resolved
/// against `workspace_root`.
pub fn has_approval(
    entries: &[ApprovalEntry],
    origin: &str,
    absolute_repo_path: &Path,
    workspace_root: &Path,
    capability: Capability,
) -> bool {
    entries.iter().any(|entry| {
        entry.origin == origin
            && entry.capabilities.contains(&capability)
            && matches_repo_path(entry, absolute_repo_path, workspace_root)
    })
}

fn matches_repo_path(entry: &ApprovalEntry, absolute_repo_path: &Path, workspace_root: &Path) -> bool {
    let Some(repo_path) = entry.repo_path.as_deref() else {
        return true; // wildcard
    };
    let candidate = Path::new(repo_path);
    if candidate.is_absolute() {
        return candidate == absolute_repo_path;
    }
    workspace_root.join(candidate) == absolute_repo_path
}

/// Insert or extend a wildcard `(origin, capability)` grant, unioning
/// capability sets so concurrent grants for the same origin stay
/// idempotent (spec §9 "Approval persistence race").
pub fn grant_wildcard(entries: &mut Vec<ApprovalEntry>, origin: &str, capability: Capability) {
    if let Some(existing) = entries
        .iter_mut()
        .find(|e| e.origin == origin && e.is_wildcard())
    {
        existing.capabilities.insert(capability);
        existing.approved_at = Utc::now();
        return;
    }
    let mut capabilities = std::collections::HashSet::new();
    capabilities.insert(capability);
    entries.push(ApprovalEntry {
        origin: origin.to_string(),
        repo_path: None,
        capabilities,
        approved_at: Utc::now(),
    });
}

/// Prompt on the controlling terminal for a y/N decision. Opens `/dev/tty`
/// directly so the prompt still works when stdio is piped (e.g. running
/// under a process supervisor); if no terminal is reachable at all, the
/// capability is denied rather than blocking forever.
#[cfg(unix)]
pub fn prompt_yes_no(question: &str) -> Result<bool> {
    use std::io::{BufRead, Write};

    let mut tty = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")
        .map_err(|_| DaemonError::CapabilityNotGranted("no controlling terminal available".into()))?;

    write!(tty, "{question} [y/N] ").map_err(DaemonError::Io)?;
    tty.flush().map_err(DaemonError::Io)?;

    let mut reader = std::io::BufReader::new(tty);
    let mut line = String::new();
    reader.read_line(&mut line).map_err(DaemonError::Io)?;

    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes" | "YES"))
}

#[cfg(not(unix))]
pub fn prompt_yes_no(_question: &str) -> Result<bool> {
    Err(DaemonError::CapabilityNotGranted(
        "interactive approval prompts are only supported on Unix".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn entry(origin: &str, repo_path: Option<&str>, caps: &[Capability]) -> ApprovalEntry {
        ApprovalEntry {
            origin: origin.to_string(),
            repo_path: repo_path.map(str::to_string),
            capabilities: caps.iter().copied().collect::<HashSet<_>>(),
            approved_at: Utc::now(),
        }
    }

    #[test]
    fn wildcard_entry_grants_any_path() {
        let entries = vec![entry("http://a", None, &[Capability::OpenTerminal])];
        let root = PathBuf::from("/ws");
        assert!(has_approval(
            &entries,
            "http://a",
            Path::new("/ws/repo1"),
            &root,
            Capability::OpenTerminal
        ));
        assert!(has_approval(
            &entries,
            "http://a",
            Path::new("/ws/repo2"),
            &root,
            Capability::OpenTerminal
        ));
    }

    #[test]
    fn exact_path_entry_is_scoped() {
        let entries = vec![entry("http://a", Some("/ws/repo1"), &[Capability::DepsInstall])];
        let root = PathBuf::from("/ws");
        assert!(has_approval(
            &entries,
            "http://a",
            Path::new("/ws/repo1"),
            &root,
            Capability::DepsInstall
        ));
        assert!(!has_approval(
            &entries,
            "http://a",
            Path::new("/ws/repo2"),
            &root,
            Capability::DepsInstall
        ));
    }

    #[test]
    fn relative_path_resolves_against_root() {
        let entries = vec![entry("http://a", Some("repo1"), &[Capability::OpenVscode])];
        let root = PathBuf::from("/ws");
        assert!(has_approval(
            &entries,
            "http://a",
            Path::new("/ws/repo1"),
            &root,
            Capability::OpenVscode
        ));
    }

    #[test]
    fn wrong_origin_never_matches() {
        let entries = vec![entry("http://a", None, &[Capability::OpenTerminal])];
        let root = PathBuf::from("/ws");
        assert!(!has_approval(
            &entries,
            "http://b",
            Path::new("/ws/repo1"),
            &root,
            Capability::OpenTerminal
        ));
    }

    #[test]
    fn missing_capability_never_matches() {
        let entries = vec![entry("http://a", None, &[Capability::OpenTerminal])];
        let root = PathBuf::from("/ws");
        assert!(!has_approval(
            &entries,
            "http://a",
            Path::new("/ws/repo1"),
            &root,
            Capability::DepsInstall
        ));
    }

    #[test]
    fn grant_wildcard_creates_new_entry() {
        let mut entries = vec![];
        grant_wildcard(&mut entries, "http://a", Capability::OpenTerminal);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].capabilities.contains(&Capability::OpenTerminal));
    }

    #[test]
    fn grant_wildcard_unions_into_existing_entry() {
        let mut entries = vec![entry("http://a", None, &[Capability::OpenTerminal])];
        grant_wildcard(&mut entries, "http://a", Capability::DepsInstall);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].capabilities.contains(&Capability::OpenTerminal));
        assert!(entries[0].capabilities.contains(&Capability::DepsInstall));
    }

    #[test]
    fn grant_wildcard_is_idempotent_per_origin() {
        let mut entries = vec![];
        grant_wildcard(&mut entries, "http://a", Capability::OpenTerminal);
        grant_wildcard(&mut entries, "http://a", Capability::OpenTerminal);
        assert_eq!(entries.len(), 1);
    }
}
