use anyhow::{Context, Result};
use std::sync::Arc;

use tiktok_lookup::config::{Config, LogFormat};
use tiktok_lookup::{Dispatcher, RequestState, Session};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, args) = Config::load()?;

    init_logging(&config);
    config.validate()?;

    tracing::debug!(
        encoding = ?config.encoding,
        accept_error_status = config.accept_error_status,
        "Configuration loaded"
    );

    let dispatcher = Arc::new(Dispatcher::new(&config)?);
    let session = Session::new(dispatcher);
    let params = args.request_params();

    tokio::select! {
        _ = session.submit(args.kind, &params) => {},
        _ = shutdown_signal() => {
            session.cancel();
        },
    }

    match session.state() {
        RequestState::Success { body, .. } => {
            let rendered =
                serde_json::to_string_pretty(&body).context("Failed to render response")?;
            println!("{}", rendered);
            Ok(())
        }
        RequestState::Failed { kind, message, .. } => {
            anyhow::bail!("{} lookup failed: {}", kind.label(), message)
        }
        RequestState::Idle => anyhow::bail!("Request cancelled"),
        RequestState::Pending { .. } => anyhow::bail!("Request did not complete"),
    }
}

/// Install the tracing subscriber. Logs go to stderr; stdout carries JSON.
fn init_logging(config: &Config) {
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, cancelling request...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, cancelling request...");
        },
    }
}
