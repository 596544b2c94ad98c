//! Client for the coordinator's command endpoint

use crate::common::rpc::{HealthReply, PhaseReply, PhaseRequest};
use crate::common::{node_url, Error, Result};

#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    url: String,
    client: reqwest::Client,
}

impl CoordinatorClient {
    /// `base_url` is either `host:port` or a full `http://` URL
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            url: node_url(base_url)?,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one command. Only transport problems are errors; whatever
    /// happened inside the protocol is in the returned string.
    pub async fn handle_command(&self, command: &str, args: &[String]) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/command", self.url))
            .json(&PhaseRequest {
                command: command.to_string(),
                args: args.to_vec(),
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::WorkerStatus {
                node: self.url.clone(),
                status: response.status().as_u16(),
            });
        }
        let reply: PhaseReply = response.json().await?;
        Ok(reply.result)
    }

    pub async fn health(&self) -> Result<HealthReply> {
        let response = self
            .client
            .get(format!("{}/health", self.url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
