//! Error types for kv2pc

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Worker {node} answered with status {status}")]
    WorkerStatus { node: String, status: u16 },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    // === Execution Errors ===
    #[error("Task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("Execution pool closed")]
    PoolClosed,

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid node address: {0}")]
    InvalidAddress(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Did this error happen on the way to or from a remote node?
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::WorkerStatus { .. }
                | Error::ConnectionFailed(_)
                | Error::Timeout(_)
        )
    }
}
