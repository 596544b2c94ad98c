//! Phase endpoints of a worker
//!
//! `POST /prepare`, `POST /commit` and `POST /rollback` take a
//! [`PhaseRequest`] and answer with the executor's result string.

use crate::common::rpc::{HealthReply, PhaseReply, PhaseRequest};
use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::Command;
use crate::worker::executor::WorkerExecutor;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct WorkerState {
    pub executor: Arc<WorkerExecutor>,
}

pub fn create_router(state: WorkerState) -> Router {
    Router::new()
        .route("/prepare", post(prepare))
        .route("/commit", post(commit))
        .route("/rollback", post(rollback))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(axum::middleware::from_fn(request_tracing_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn prepare(State(state): State<WorkerState>, Json(req): Json<PhaseRequest>) -> Json<PhaseReply> {
    let command = Command::from(req);
    Json(PhaseReply::new(state.executor.prepare(&command)))
}

async fn commit(State(state): State<WorkerState>, Json(req): Json<PhaseRequest>) -> Json<PhaseReply> {
    let command = Command::from(req);
    Json(PhaseReply::new(state.executor.commit(&command).await))
}

async fn rollback(State(state): State<WorkerState>, Json(req): Json<PhaseRequest>) -> Json<PhaseReply> {
    let command = Command::from(req);
    Json(PhaseReply::new(state.executor.rollback(&command)))
}

async fn health(State(state): State<WorkerState>) -> Json<HealthReply> {
    Json(HealthReply {
        status: "ok".to_string(),
        node: state.executor.id().to_string(),
        workers: None,
    })
}

async fn metrics(State(state): State<WorkerState>) -> impl IntoResponse {
    let executor = &state.executor;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        executor.metrics().to_prometheus(executor.store().len()),
    )
}
