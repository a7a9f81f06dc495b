//! serve サブコマンド
//!
//! 監視スケジューラを起動し、Ctrl-C / SIGTERM まで実行する。

use super::GlobalOptions;
use crate::monitor::Scheduler;
use crate::shutdown::ShutdownController;
use clap::Args;
use tracing::{info, warn};

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Seconds between scheduled checks (overrides PULSEWATCH_CHECK_INTERVAL_SECS)
    #[arg(long)]
    pub interval_secs: Option<u64>,
}

/// serve コマンドを実行
pub async fn execute(args: &ServeArgs, options: &GlobalOptions) -> Result<(), anyhow::Error> {
    info!("pulsewatch v{}", env!("CARGO_PKG_VERSION"));

    let mut ctx = options.open().await?;
    if let Some(secs) = args.interval_secs.filter(|s| *s > 0) {
        ctx.config.check_interval = std::time::Duration::from_secs(secs);
    }

    info!(
        interval_secs = ctx.config.check_interval.as_secs(),
        probe_timeout_secs = ctx.config.probe_timeout.as_secs(),
        cooldown_secs = ctx.config.notify_cooldown.as_secs(),
        max_concurrent_probes = ctx.config.max_concurrent_probes,
        "Monitor configuration loaded"
    );

    let shutdown = ShutdownController::default();
    let handle = Scheduler::from_config(ctx.monitor.clone(), &ctx.config).start(shutdown.clone());

    shutdown_signal(shutdown.clone()).await;
    shutdown.request_shutdown();

    if let Err(e) = handle.await {
        warn!(error = %e, "Scheduler task ended abnormally");
    }
    ctx.store.pool().close().await;

    info!("Monitor shutdown complete");
    Ok(())
}

/// シャットダウンシグナルを待機
async fn shutdown_signal(shutdown: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = shutdown.wait() => {
            info!("Shutdown requested, shutting down...");
        }
    }
}
