use crate::common::rpc::{HealthReply, PhaseReply, PhaseRequest, REQUEST_ID_HEADER};
use crate::common::{node_url, Command, Error, Phase, Result};
use crate::coordinator::node::WorkerNode;
use crate::coordinator::transaction::TRANSACTION_ID;
use async_trait::async_trait;
use std::time::Duration;

/// HTTP handle to a worker's phase endpoints
#[derive(Debug, Clone)]
pub struct RemoteWorker {
    url: String,
    client: reqwest::Client,
}

impl RemoteWorker {
    /// Build a handle without contacting the worker
    pub fn new(addr: &str) -> Result<Self> {
        Ok(Self {
            url: node_url(addr)?,
            client: reqwest::Client::new(),
        })
    }

    /// Build a handle and make sure the worker answers its health check
    /// within `timeout`. This is the one-time resolution done at
    /// coordinator startup.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let worker = Self::new(addr)?;
        let health = tokio::time::timeout(timeout, worker.health())
            .await
            .map_err(|_| {
                Error::Timeout(format!("{} health check after {:?}", worker.url, timeout))
            })?
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", worker.url, e)))?;
        tracing::info!("Resolved worker {} ({})", health.node, worker.url);
        Ok(worker)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn health(&self) -> Result<HealthReply> {
        let response = self
            .client
            .get(format!("{}/health", self.url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::WorkerStatus {
                node: self.url.clone(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn call(&self, phase: Phase, command: &Command) -> Result<String> {
        let mut request = self
            .client
            .post(format!("{}{}", self.url, phase.route()))
            .json(&PhaseRequest::from(command));
        if let Ok(txn) = TRANSACTION_ID.try_with(|id| id.clone()) {
            request = request.header(REQUEST_ID_HEADER, txn);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::WorkerStatus {
                node: self.url.clone(),
                status: response.status().as_u16(),
            });
        }
        let reply: PhaseReply = response.json().await?;
        Ok(reply.result)
    }
}

#[async_trait]
impl WorkerNode for RemoteWorker {
    fn id(&self) -> &str {
        &self.url
    }

    async fn prepare_command(&self, command: &Command) -> Result<String> {
        self.call(Phase::Prepare, command).await
    }

    async fn commit_command(&self, command: &Command) -> Result<String> {
        self.call(Phase::Commit, command).await
    }

    async fn rollback_command(&self, command: &Command) -> Result<String> {
        self.call(Phase::Rollback, command).await
    }
}
