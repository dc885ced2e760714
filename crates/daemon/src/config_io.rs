//! Config and token-file persistence. Both live in an OS-appropriate
//! config directory, overridable via `GIT_DAEMON_CONFIG_DIR` (spec §6
//! "Persisted layout"). Readers tolerate an absent file by falling back
//! to defaults; writers go through here so every mutation gets the same
//! pretty-printed JSON and, on Unix, `0600` permissions.

use std::path::{Path, PathBuf};

use gd_domain::config::Config;
use gd_domain::error::{DaemonError, Result};

use crate::auth::token_store::{TokenFile, TokenPersist};

pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("GIT_DAEMON_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("git-daemon")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn tokens_path() -> PathBuf {
    config_dir().join("tokens.json")
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(DaemonError::Io)?;
    serde_json::from_str(&raw)
        .map_err(|e| DaemonError::InternalError(format!("parsing {}: {e}", path.display())))
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    write_json(path, config)
}

pub fn load_tokens(path: &Path) -> Result<Vec<crate::auth::token_store::TokenRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).map_err(DaemonError::Io)?;
    let file: TokenFile = serde_json::from_str(&raw)
        .map_err(|e| DaemonError::InternalError(format!("parsing {}: {e}", path.display())))?;
    Ok(file.entries)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(DaemonError::Io)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| DaemonError::InternalError(format!("serializing {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(DaemonError::Io)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(DaemonError::Io)?;
    }
    Ok(())
}

/// [`TokenPersist`] implementation that writes straight to `tokens.json`
/// under the config directory.
pub struct JsonTokenPersist {
    pub path: PathBuf,
}

impl TokenPersist for JsonTokenPersist {
    fn save(&self, file: &TokenFile) -> Result<()> {
        write_json(&self.path, file)
    }
}
