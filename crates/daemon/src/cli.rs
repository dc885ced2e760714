//! Command-line surface (spec SUPPLEMENT — adapted from the teacher's
//! `serve`/`doctor`/`config` subcommands to this daemon's JSON,
//! OS-config-dir persisted layout).

use clap::{Parser, Subcommand};

use gd_domain::config::{Config, ConfigSeverity};

#[derive(Debug, Parser)]
#[command(name = "git-daemon", version, about = "Loopback-only git/workspace broker daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the daemon (default when no subcommand is given).
    Serve,
    /// Run startup diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any validation issues.
    Validate,
    /// Print the resolved configuration (with defaults filled in) as JSON.
    Show,
}

/// Load `config.json` from the OS config directory, falling back to
/// defaults if it does not exist yet.
pub fn load_config() -> anyhow::Result<(Config, std::path::PathBuf)> {
    let path = crate::config_io::config_path();
    let config = crate::config_io::load_config(&path)?;
    Ok((config, path))
}

/// Parse and print config validation issues. Returns `true` iff there are
/// no `Error`-severity issues.
pub fn validate(config: &Config, config_path: &std::path::Path) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({})", config_path.display());
        return true;
    }

    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        let marker = match issue.severity {
            ConfigSeverity::Error => "error",
            ConfigSeverity::Warning => "warning",
        };
        println!("[{marker}] {issue}");
    }

    println!(
        "\n{error_count} error(s), {warning_count} warning(s) in {}",
        config_path.display()
    );

    error_count == 0
}

pub fn show(config: &Config) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    println!("{json}");
    Ok(())
}

/// Run a handful of startup-equivalent checks and print a pass/fail
/// summary, mirroring the teacher's `doctor` subcommand.
pub async fn doctor(config: &Config, config_path: &std::path::Path) -> bool {
    println!("git-daemon doctor");
    println!("=================\n");

    let mut all_passed = true;

    let config_exists = config_path.exists();
    print_check(
        "Config file exists",
        config_exists,
        if config_exists {
            config_path.display().to_string()
        } else {
            format!("{} not found (using defaults)", config_path.display())
        },
    );

    let issues = config.validate();
    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({error_count} error(s))", issues.len()),
        );
        for issue in &issues {
            println!("      {issue}");
        }
    }
    if error_count > 0 {
        all_passed = false;
    }

    match &config.workspace_root {
        Some(root) => {
            let exists = root.is_dir();
            print_check("Workspace root exists", exists, root.display().to_string());
            if !exists {
                all_passed = false;
            }
        }
        None => print_check("Workspace root configured", false, "not set".into()),
    }

    let git_installed = which::which("git").is_ok();
    print_check(
        "git executable on PATH",
        git_installed,
        if git_installed { "found".into() } else { "not found".into() },
    );
    if !git_installed {
        all_passed = false;
    }

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    all_passed
}

fn print_check(name: &str, passed: bool, detail: String) {
    let mark = if passed { "OK" } else { "FAIL" };
    println!("[{mark:>4}] {name}: {detail}");
}
