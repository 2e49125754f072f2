//! Server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Outbound frame queue depth per participant; a full queue counts as a
    /// failed send and evicts the participant on the next broadcast.
    pub send_queue_capacity: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Keepalive ping interval in seconds.
    pub ping_interval_secs: u64,
    /// Grace period for in-flight sessions on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            send_queue_capacity: 64,
            max_message_size: 64 * 1024, // 64 KiB
            ping_interval_secs: 30,
            shutdown_timeout_secs: 30,
        }
    }
}
