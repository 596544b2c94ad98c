//! Worker replica
//!
//! Each worker owns one independent in-memory store and executes the
//! phase commands the coordinator sends it.

pub mod executor;
pub mod http;
pub mod server;
pub mod store;

pub use executor::WorkerExecutor;
pub use server::WorkerServer;
pub use store::Store;
