//! Liveness reporting for an external stream producer.
//!
//! The producer writes a Unix timestamp to a marker file while it runs. This
//! crate decides from that heartbeat whether the producer is alive and serves
//! the answer over a deliberately tiny HTTP/1.1 interface:
//!
//! | Request               | Response                                   |
//! |-----------------------|--------------------------------------------|
//! | `GET /stream_started` | `200 {"started":true}` / `{"started":false}` |
//! | `GET /health`         | `200 {"ok":true}`                          |
//! | anything else         | `404 Not Found`                            |
//!
//! Use [`StatusServer`] to embed the server in another process, or run the
//! `stream-status` binary.

pub mod api;
pub mod config;
pub mod error;
pub mod marker;
pub mod monitor;
pub mod probe;
pub mod server;

pub use config::Config;
pub use error::{MarkerError, ServerError};
pub use monitor::{DirectMonitor, Liveness, LivenessState, PolledMonitor, Poller, SharedFlag};
pub use server::{ServerHandle, StatusServer};
