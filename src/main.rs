use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use taskgate::app::{Gateway, JANITOR_INTERVAL};
use taskgate::config::GatewayConfig;
use taskgate::logging::init_logging;

/// Asynchronous task-submission gateway
#[derive(Parser, Debug)]
#[command(name = "taskgate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted
    #[arg(short, long, env = "TASKGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Check the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GatewayConfig::default(),
    }
    .apply_env();
    config.validate()?;

    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    init_logging(&config.log)?;
    tracing::info!(
        addr = %config.listen_addr()?,
        store = ?config.store.backend,
        "starting taskgate"
    );

    let gateway = Gateway::from_config(&config).await?;
    let cancel = CancellationToken::new();
    let janitor = gateway.spawn_janitor(JANITOR_INTERVAL, cancel.clone());

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, gateway.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    cancel.cancel();
    janitor.await?;
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
