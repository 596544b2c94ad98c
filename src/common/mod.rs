//! Common utilities and types shared across kv2pc

pub mod command;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rpc;
pub mod tracing_middleware;
pub mod utils;

pub use command::{Command, Phase, Verb};
pub use config::{Config, CoordinatorConfig, WorkerConfig};
pub use error::{Error, Result};
pub use metrics::{CoordinatorMetrics, WorkerMetrics};
pub use rpc::{HealthReply, PhaseReply, PhaseRequest, REQUEST_ID_HEADER};
pub use utils::{generate_transaction_id, parse_duration, node_url};
