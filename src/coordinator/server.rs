//! Coordinator server

use crate::common::utils::shutdown_signal;
use crate::common::{CoordinatorConfig, Result};
use crate::coordinator::http::{create_router, CoordState};
use crate::coordinator::node::WorkerNode;
use crate::coordinator::transaction::TransactionCoordinator;
use crate::coordinator::worker_client::RemoteWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Health check deadline per worker when no call timeout is configured
pub const STARTUP_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Coordinator {
    config: CoordinatorConfig,
    node_id: String,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, node_id: String) -> Self {
        Self { config, node_id }
    }

    /// Resolve the workers, bind the API and serve until shutdown.
    /// Any unreachable worker or a failed bind stops startup.
    pub async fn serve(self) -> Result<()> {
        self.config.validate()?;

        tracing::info!("Starting coordinator: {}", self.node_id);
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Workers: {}", self.config.workers.join(", "));
        tracing::info!("  Dispatch pool: {}", self.config.dispatch_pool_size);
        if let Some(timeout) = self.config.call_timeout() {
            tracing::info!("  Call timeout: {:?}", timeout);
        }

        let health_timeout = self.config.call_timeout().unwrap_or(STARTUP_HEALTH_TIMEOUT);
        let workers = resolve_workers(&self.config.workers, health_timeout).await?;
        let coordinator = TransactionCoordinator::new(workers, self.config.dispatch_pool_size)
            .with_call_timeout(self.config.call_timeout());

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        run(
            listener,
            CoordState {
                coordinator: Arc::new(coordinator),
                node_id: self.node_id,
            },
        )
        .await
    }
}

/// Connect to every worker once. The resulting list never changes.
/// A worker that does not answer its health check within `timeout`
/// stops startup.
pub async fn resolve_workers(
    addrs: &[String],
    timeout: Duration,
) -> Result<Vec<Arc<dyn WorkerNode>>> {
    let mut workers: Vec<Arc<dyn WorkerNode>> = Vec::with_capacity(addrs.len());
    for addr in addrs {
        let worker = RemoteWorker::connect(addr, timeout).await.map_err(|e| {
            tracing::error!("Error connecting to worker node {}: {}", addr, e);
            e
        })?;
        workers.push(Arc::new(worker));
    }
    Ok(workers)
}

/// Serve the coordinator API on an already bound listener
pub async fn run(listener: TcpListener, state: CoordState) -> Result<()> {
    let addr = listener.local_addr()?;
    let router = create_router(state);

    tracing::info!("✓ Coordinator ready on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
