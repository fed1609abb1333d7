use std::sync::Arc;

use actix_web::dev::ServerHandle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::db::JobLedger;

/// Handles graceful shutdown of the application
///
/// On SIGTERM or CTRL+C:
/// 1. Stop the HTTP server (no new jobs are accepted)
/// 2. Signal the dispatcher to stop taking messages
/// 3. Wait for in-flight jobs to finish
/// 4. Close the ledger
pub struct ShutdownCoordinator {
    server_handle: ServerHandle,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    dispatcher_task: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    ledger: Arc<dyn JobLedger>,
}

impl ShutdownCoordinator {
    pub fn new(
        server_handle: ServerHandle,
        server_task: JoinHandle<Result<(), std::io::Error>>,
        dispatcher_task: JoinHandle<()>,
        shutdown_tx: watch::Sender<bool>,
        ledger: Arc<dyn JobLedger>,
    ) -> Self {
        Self {
            server_handle,
            server_task,
            dispatcher_task,
            shutdown_tx,
            ledger,
        }
    }

    /// Wait for a shutdown signal, then shut down gracefully
    pub async fn wait_for_shutdown(self) -> Result<(), std::io::Error> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for CTRL+C: {}", e);
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
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received CTRL+C signal, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM signal, initiating graceful shutdown...");
            }
        }

        self.shutdown().await
    }

    async fn shutdown(self) -> Result<(), std::io::Error> {
        info!("Stopping HTTP server (no longer accepting new requests)...");
        self.server_handle.stop(true).await;

        info!("Signaling dispatcher to stop taking new jobs...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal to dispatcher: {:?}", e);
        }

        match self.dispatcher_task.await {
            Ok(()) => info!("Dispatcher stopped"),
            Err(e) => error!("Dispatcher failed to stop: {:?}", e),
        }

        let server_result = match self.server_task.await {
            Ok(result) => result,
            Err(e) => {
                error!("HTTP server task panicked: {:?}", e);
                Ok(())
            }
        };
        if let Err(e) = &server_result {
            error!("HTTP server encountered error during shutdown: {:?}", e);
        }

        info!("Closing job ledger...");
        self.ledger.close().await;

        info!("Graceful shutdown completed");
        server_result
    }
}
