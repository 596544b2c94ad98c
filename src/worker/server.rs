//! Worker server

use crate::common::utils::shutdown_signal;
use crate::common::{Result, WorkerConfig};
use crate::worker::executor::WorkerExecutor;
use crate::worker::http::{create_router, WorkerState};
use crate::worker::store::Store;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct WorkerServer {
    config: WorkerConfig,
    worker_id: String,
}

impl WorkerServer {
    pub fn new(config: WorkerConfig, worker_id: String) -> Self {
        Self { config, worker_id }
    }

    pub async fn serve(self) -> Result<()> {
        self.config.validate()?;

        tracing::info!("Starting worker: {}", self.worker_id);
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Execution pool: {}", self.config.execution_pool_size);

        let executor = WorkerExecutor::new(
            self.worker_id,
            Arc::new(Store::new()),
            self.config.execution_pool_size,
        );

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        run(listener, Arc::new(executor)).await
    }
}

/// Serve the phase endpoints of `executor` on an already bound listener
pub async fn run(listener: TcpListener, executor: Arc<WorkerExecutor>) -> Result<()> {
    let addr = listener.local_addr()?;
    let router = create_router(WorkerState { executor });

    tracing::info!("✓ Worker ready on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
