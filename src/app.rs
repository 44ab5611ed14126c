use crate::config::Config;
use crate::state::AppState;
use crate::store::snapshot;
use crate::utils::fmt_duration;
use crate::video::VideoService;
use crate::web::create_router;
use anyhow::Context;
use std::net::SocketAddr;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
    shutdown: CancellationToken,
    flush_task: JoinHandle<()>,
}

impl App {
    /// Load the snapshot, build the service, and start the background flush.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let store_config = config.store_config();
        let cache = snapshot::load(&store_config.path).await;
        let entries = cache.len().await;

        let videos = VideoService::new(cache.clone(), config.default_limit_time);
        let app_state = AppState::new(cache.clone(), videos);

        let shutdown = CancellationToken::new();
        let flush_task = snapshot::spawn_flush_task(cache, store_config, shutdown.clone());

        info!(
            entries,
            default_limit_time = config.default_limit_time,
            flush_interval = fmt_duration(config.db_save_duration),
            "application initialized"
        );

        Ok(App {
            config,
            app_state,
            shutdown,
            flush_task,
        })
    }

    /// Serve HTTP until a shutdown signal, then flush the snapshot one last time.
    pub async fn run(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let serve_result = Self::serve(addr, self.app_state, self.shutdown.clone()).await;

        self.shutdown.cancel();
        let exit = match serve_result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "web server failed");
                ExitCode::FAILURE
            }
        };

        match tokio::time::timeout(self.config.shutdown_timeout, self.flush_task).await {
            Ok(Ok(())) => info!("shutdown complete"),
            Ok(Err(e)) => error!(error = %e, "flush task panicked"),
            Err(_) => warn!(
                timeout = fmt_duration(self.config.shutdown_timeout),
                "final flush timed out, exiting anyway"
            ),
        }
        exit
    }

    async fn serve(
        addr: SocketAddr,
        app_state: AppState,
        shutdown: CancellationToken,
    ) -> Result<(), anyhow::Error> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(address = %addr, "web server listening");

        axum::serve(listener, create_router(app_state))
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {}
                    _ = shutdown.cancelled() => {}
                }
                info!("shutdown signal received, draining requests");
            })
            .await
            .context("Web server error")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
