//! Phase command executor of a worker
//!
//! PREPARE and ROLLBACK only acknowledge; the store is touched exactly
//! once, at COMMIT. Each commit runs as its own task on the worker's
//! execution pool, a semaphore bounding how many commits reach the store
//! at the same time.

use crate::common::command::{
    Command, Phase, Verb, DELETE_SUCCESS, INVALID_COMMAND, KEY_NOT_FOUND, PREPARED,
    PUT_SUCCESS, ROLLBACK_SUCCESS,
};
use crate::common::{Error, Result, WorkerMetrics};
use crate::coordinator::node::WorkerNode;
use crate::worker::store::Store;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct WorkerExecutor {
    id: String,
    store: Arc<Store>,
    pool: Arc<Semaphore>,
    metrics: Arc<WorkerMetrics>,
}

impl WorkerExecutor {
    /// Executor over `store` running at most `pool_size` commits at once
    pub fn new(id: impl Into<String>, store: Arc<Store>, pool_size: usize) -> Self {
        Self {
            id: id.into(),
            store,
            pool: Arc::new(Semaphore::new(pool_size.max(1))),
            metrics: Arc::new(WorkerMetrics::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<WorkerMetrics> {
        &self.metrics
    }

    /// Acknowledge the command. Nothing is reserved or validated.
    pub fn prepare(&self, command: &Command) -> String {
        self.metrics.record(Phase::Prepare);
        self.log_request(Phase::Prepare, command);
        PREPARED.to_string()
    }

    /// Run the command against the store on the execution pool and wait
    /// for its result. Task failures come back as text, never as errors.
    pub async fn commit(&self, command: &Command) -> String {
        self.metrics.record(Phase::Commit);
        self.log_request(Phase::Commit, command);

        let store = self.store.clone();
        let pool = self.pool.clone();
        let task_command = command.clone();
        let worker = self.id.clone();

        let task = tokio::spawn(async move {
            let _permit = pool.acquire_owned().await.map_err(|_| Error::PoolClosed)?;
            let result = execute(&store, &task_command);
            tracing::info!(worker = %worker, response = %result, "Sending response");
            Ok::<_, Error>(result)
        });

        match task.await.map_err(Error::from).and_then(|res| res) {
            Ok(result) => result,
            Err(e) => {
                self.metrics.commit_failures.inc();
                tracing::error!(
                    worker = %self.id,
                    command = %command.name,
                    "Commit task failed: {}",
                    e
                );
                format!("Error during commit: {}", e)
            }
        }
    }

    /// Acknowledge the rollback. Nothing was mutated, so nothing is undone.
    pub fn rollback(&self, command: &Command) -> String {
        self.metrics.record(Phase::Rollback);
        self.log_request(Phase::Rollback, command);
        ROLLBACK_SUCCESS.to_string()
    }

    fn log_request(&self, phase: Phase, command: &Command) {
        tracing::info!(
            worker = %self.id,
            phase = %phase,
            command = %command.name,
            args = %command.args.join(", "),
            "Received command"
        );
    }
}

/// Apply one command to the store and describe the outcome
pub fn execute(store: &Store, command: &Command) -> String {
    let Some(verb) = command.verb() else {
        return INVALID_COMMAND.to_string();
    };
    if command.args.len() != verb.arity() {
        return verb.arity_error().to_string();
    }

    let key = &command.args[0];
    match verb {
        Verb::Put => {
            store.put(key, &command.args[1]);
            PUT_SUCCESS.to_string()
        }
        Verb::Get => store.get(key).unwrap_or_else(|| KEY_NOT_FOUND.to_string()),
        Verb::Delete => {
            if store.delete(key) {
                DELETE_SUCCESS.to_string()
            } else {
                KEY_NOT_FOUND.to_string()
            }
        }
    }
}

#[async_trait]
impl WorkerNode for WorkerExecutor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn prepare_command(&self, command: &Command) -> Result<String> {
        Ok(self.prepare(command))
    }

    async fn commit_command(&self, command: &Command) -> Result<String> {
        Ok(self.commit(command).await)
    }

    async fn rollback_command(&self, command: &Command) -> Result<String> {
        Ok(self.rollback(command))
    }
}
