//! # kv2pc
//!
//! A replicated in-memory key-value store kept in step by two-phase
//! commit:
//! - One coordinator broadcasts every client command to all workers
//! - Workers acknowledge PREPARE, apply the command at COMMIT
//! - Worker replies are deduplicated into one client-visible result
//!
//! ## Architecture
//!
//! ```text
//!               client
//!                 │ POST /command
//! ┌───────────────▼─────────────────────────┐
//! │              Coordinator                │
//! │  PREPARE ──► COMMIT | ROLLBACK          │
//! │  (dispatch pool, fan-out / fan-in)      │
//! └───────┬──────────────┬──────────────┬───┘
//!         │ HTTP + JSON  │              │
//! ┌───────▼─────┐ ┌──────▼──────┐ ┌─────▼───────┐
//! │  Worker 1   │ │  Worker 2   │ │  Worker 3   │
//! │ (exec pool) │ │ (exec pool) │ │ (exec pool) │
//! │  + Store    │ │  + Store    │ │  + Store    │
//! └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start workers
//! ```bash
//! kv2pc-worker --id worker-1 --bind 0.0.0.0:6001
//! kv2pc-worker --id worker-2 --bind 0.0.0.0:6002
//! ```
//!
//! ### Start the coordinator
//! ```bash
//! kv2pc-coord serve --bind 0.0.0.0:5000 --workers localhost:6001,localhost:6002
//! ```
//!
//! ### Use the CLI
//! ```bash
//! kv2pc put my-key my-value
//! kv2pc get my-key
//! kv2pc delete my-key
//! ```

pub mod client;
pub mod common;
pub mod coordinator;
pub mod worker;

// Re-export commonly used types
pub use client::CoordinatorClient;
pub use common::{Command, Config, Error, Phase, Result};
pub use coordinator::{Coordinator, TransactionCoordinator, WorkerNode};
pub use worker::{Store, WorkerExecutor, WorkerServer};
