//! Serving entrypoint shared by binaries and tests.

use crate::{config::GatewayConfig, router::router, state::Gateway};
use anyhow::{Context, Result};
use fcore::Registry;
use tokio::sync::oneshot;

/// Handle returned by [`serve`]: the bound port and the shutdown trigger.
pub struct ServeHandle {
    /// The port the gateway is listening on.
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<tokio::task::JoinHandle<Result<(), std::io::Error>>>,
}

impl ServeHandle {
    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            join.await??;
        }
        Ok(())
    }
}

/// Bind the configured address and serve `registry` in a spawned task.
///
/// Call [`ServeHandle::shutdown`] to stop.
pub async fn serve(registry: Registry, config: &GatewayConfig) -> Result<ServeHandle> {
    let bind = config.server.bind.as_str();
    let routes = registry.len();
    let app = router(Gateway::new(registry, config.invoke.clone()));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let port = listener.local_addr()?.port();
    tracing::info!("serving {routes} routes on {bind} (port {port})");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("received shutdown signal");
            })
            .await
    });

    Ok(ServeHandle {
        port,
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
    })
}
