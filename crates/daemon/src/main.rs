use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gd_daemon::cli::{self, Cli, Command, ConfigCommand};
use gd_daemon::http;
use gd_daemon::state::AppState;
use gd_domain::config::ConfigSeverity;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, config_path) = cli::load_config()?;
            run_server(config, config_path).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = cli::load_config()?;
            let passed = cli::doctor(&config, &config_path).await;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            if !cli::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config()?;
            cli::show(&config)
        }
    }
}

/// Structured JSON logs by default; `RUST_LOG` overrides the filter, e.g.
/// `RUST_LOG=debug,gd_daemon=trace`.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,gd_daemon=debug")),
        )
        .json()
        .init();
}

async fn run_server(config: gd_domain::config::Config, config_path: std::path::PathBuf) -> anyhow::Result<()> {
    tracing::info!("git-daemon starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    if let Some(tls) = &config.server.tls {
        if !tls.cert_path.exists() || !tls.key_path.exists() {
            anyhow::bail!(
                "server.tls is configured but cert/key path does not exist: {} / {}",
                tls.cert_path.display(),
                tls.key_path.display()
            );
        }
    }

    let tokens_path = gd_daemon::config_io::tokens_path();
    let tokens = gd_daemon::config_io::load_tokens(&tokens_path)?;
    tracing::info!(count = tokens.len(), "token store loaded");

    let host = config.server.host.clone();
    let port = config.server.port;
    let tls = config.server.tls.clone();

    let state = AppState::new(config, config_path, tokens);
    tracing::info!(max_concurrent = state.jobs.max_concurrent(), "job manager ready");

    let app = http::router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "git-daemon listening");

    let serve = axum::serve(listener, app.clone().into_make_service_with_connect_info::<SocketAddr>());

    if let Some(tls) = tls {
        let tls_addr = SocketAddr::new(addr.ip(), tls.port);
        tracing::info!(addr = %tls_addr, "git-daemon TLS mirror listening");
        let rustls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await?;
        let tls_app = app.clone();
        let tls_server = axum_server::bind_rustls(tls_addr, rustls_config)
            .serve(tls_app.into_make_service_with_connect_info::<SocketAddr>());

        tokio::select! {
            result = serve => result.map_err(anyhow::Error::from)?,
            result = tls_server => result.map_err(anyhow::Error::from)?,
        }
    } else {
        serve.await?;
    }

    Ok(())
}
