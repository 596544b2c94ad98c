//! Transaction coordinator
//!
//! The coordinator is responsible for:
//! - Resolving the fixed set of workers at startup
//! - Driving every client command through PREPARE, then COMMIT or ROLLBACK
//! - Aggregating worker replies into one client-visible result

pub mod http;
pub mod node;
pub mod server;
pub mod transaction;
pub mod worker_client;

pub use node::WorkerNode;
pub use server::Coordinator;
pub use transaction::TransactionCoordinator;
pub use worker_client::RemoteWorker;
