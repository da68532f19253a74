//! # reverb-api
//!
//! HTTP API for Reverb workflow logs, built on axum.
//!
//! Log queries are answered by [`reverb_logs::LogQueryService`]; inbound
//! events and webhooks are handed to a [`JobQueue`] for asynchronous
//! processing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reverb_api::{ApiConfig, ApiServer, MemoryJobQueue};
//! use reverb_logs::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ApiConfig::default();
//!     let store = Arc::new(MemoryStore::new(config.store_max_entries));
//!     let server = ApiServer::new(config, store, Arc::new(MemoryJobQueue::new()));
//!     // server.serve().await.unwrap();
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/health` | GET | Liveness and uptime |
//! | `/logs` | GET | All logs, cursor-paginated |
//! | `/logs/events` | GET | Fired events, offset-paginated |
//! | `/logs/events/{eventId}` | GET | Status of each function an event triggered |
//! | `/logs/functions` | GET | Per-function status, offset-paginated |
//! | `/logs/functions/{funcId}` | GET | Every log of one function |
//! | `/logs/errors` | GET | Error-level logs, newest first |
//! | `/logs/dead-letter` | GET | Dead-lettered jobs, newest first |
//! | `/events` | POST | Enqueue an event |
//! | `/webhooks` | POST | Enqueue a webhook as an event |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use ingest::{EnqueuedJob, JobQueue, MemoryJobQueue, QueueError};
pub use routes::create_router;
pub use server::ApiServer;
pub use state::ApiState;
