//! Client-facing HTTP API of the coordinator
//!
//! - `POST /command` runs one client command through the protocol. The
//!   answer is always `200` with a [`PhaseReply`]; protocol failures are
//!   part of the result string.
//! - `GET /health` reports the number of workers being coordinated.
//! - `GET /metrics` exposes transaction counters in Prometheus format.

use crate::common::rpc::{HealthReply, PhaseReply, PhaseRequest};
use crate::common::tracing_middleware::{request_tracing_middleware, RequestId};
use crate::coordinator::transaction::TransactionCoordinator;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared coordinator state for HTTP handlers.
#[derive(Clone)]
pub struct CoordState {
    pub coordinator: Arc<TransactionCoordinator>,
    pub node_id: String,
}

/// Creates the HTTP router with all public endpoints.
pub fn create_router(state: CoordState) -> Router {
    Router::new()
        .route("/command", post(handle_command))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(axum::middleware::from_fn(request_tracing_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn handle_command(
    State(state): State<CoordState>,
    Extension(RequestId(txn_id)): Extension<RequestId>,
    Json(req): Json<PhaseRequest>,
) -> Json<PhaseReply> {
    // Run on its own task so a client hanging up mid-protocol does not
    // cut a transaction off between phases.
    let coordinator = state.coordinator.clone();
    let transaction = tokio::spawn(async move {
        coordinator
            .handle_command_with_id(req.into(), txn_id)
            .await
    });

    let result = match transaction.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Transaction task failed: {}", e);
            format!("Error handling command: {}", e)
        }
    };
    Json(PhaseReply::new(result))
}

async fn health(State(state): State<CoordState>) -> Json<HealthReply> {
    Json(HealthReply {
        status: "ok".to_string(),
        node: state.node_id.clone(),
        workers: Some(state.coordinator.workers().len()),
    })
}

async fn metrics(State(state): State<CoordState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.coordinator.metrics().to_prometheus(),
    )
}
