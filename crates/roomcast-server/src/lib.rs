//! # roomcast-server
//!
//! Axum HTTP + `WebSocket` message relay.
//!
//! - `WebSocket` relay: clients join a room at `/ws/{room_id}`; every text
//!   frame is fanned out to all current members, the sender included
//! - Room registry: rooms are created on first join and evicted as soon as
//!   the last member is removed
//! - `"Done"` sentinel: any participant ends the whole room; members get a
//!   close notice and a normal-closure frame
//! - HTTP endpoints: health check, Prometheus metrics
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod ids;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::RelayServer;
