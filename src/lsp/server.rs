use anyhow::Context;
use tower_lsp::{LspService, Server};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LOG_ENV, LOG_FILE_NAME, log_dir};
use crate::lsp::backend::Backend;

/// JSON logs to a daily rotated file; stdout is reserved for the protocol.
///
/// The returned guard flushes pending records when dropped.
fn init_logging() -> anyhow::Result<WorkerGuard> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

pub async fn run_server() -> anyhow::Result<()> {
    let _guard = init_logging()?;
    info!("Starting version-lens {}", env!("CARGO_PKG_VERSION"));

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    info!("version-lens stopped");
    Ok(())
}
