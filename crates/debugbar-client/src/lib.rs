//! Debug Bar Telemetry Client
//!
//! Connects to a debug bar instrumentation server over WebSocket, folds its
//! request/query/error event stream into a bounded in-memory snapshot, and
//! publishes every snapshot version to subscribers.
//!
//! # Quick Start
//!
//! ```ignore
//! use debugbar_client::{DebugBarConfig, DebugBarStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DebugBarStore::new(
//!         DebugBarConfig::new("ws://localhost:8080/_debugbar/ws"),
//!     );
//!
//!     let mut snapshots = store.subscribe();
//!     while snapshots.changed().await.is_ok() {
//!         let state = snapshots.borrow_and_update().clone();
//!         println!(
//!             "{:?}: {} requests, {} queries, {} errors",
//!             state.status,
//!             state.requests.len(),
//!             state.total_queries(),
//!             state.total_errors(),
//!         );
//!     }
//! }
//! ```

pub mod config;
pub mod state;
pub mod store;

pub use config::{DebugBarConfig, Position};
pub use state::{DebugBarState, Tab};
pub use store::DebugBarStore;

pub use debugbar_proto::{ErrorInfo, ErrorKind, QueryInfo, RequestInfo};
pub use debugbar_transport::ConnectionStatus;
