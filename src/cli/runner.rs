//! CLI runner - builds the engine and runs it until a shutdown signal

use crate::checkpoint::CheckpointStore;
use crate::cli::commands::Cli;
use crate::config::TailConfig;
use crate::engine::TailEngine;
use crate::error::Result;
use crate::transport::build_transport;
use crate::types::SFTP_PASSWORD_ENV;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Build the validated config from CLI arguments and environment
    pub fn config(&self) -> Result<TailConfig> {
        TailConfig::builder(self.cli.url.as_str())
            .env_password(std::env::var(SFTP_PASSWORD_ENV).ok())
            .interval_secs(self.cli.interval_sec)
            .request_timeout_secs(self.cli.request_timeout_sec)
            .checkpoint_path(self.cli.state_file.clone())
            .build()
    }

    /// Tail until interrupted
    ///
    /// Configuration and checkpoint problems are returned before the first
    /// poll. After that only an unwritable output ends the run early.
    pub async fn run(&self) -> Result<()> {
        let config = self.config()?;
        debug!("Using configuration: {config:?}");

        let transport = build_transport(&config)?;
        let checkpoint = CheckpointStore::from_option(config.checkpoint_path.clone());

        let mut engine =
            TailEngine::new(transport, checkpoint).with_poll_interval(config.poll_interval);
        engine.load_checkpoint().await?;

        let shutdown = shutdown_signal()?;
        let mut stdout = std::io::stdout();
        engine.run(&mut stdout, shutdown).await
    }
}

/// Resolve on SIGINT or SIGTERM
///
/// Handlers are installed before this returns so a signal that arrives
/// during a poll is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => debug!("Received SIGINT"),
            _ = terminate.recv() => debug!("Received SIGTERM"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
}
