//! Health endpoint payload.

use std::time::Instant;

use serde::Serialize;

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Currently open WebSocket connections.
    pub connections: usize,
    /// Rooms currently present in the registry.
    pub active_rooms: usize,
}

/// Assemble the health payload from live counters.
pub fn health_snapshot(
    start_time: Instant,
    connections: usize,
    active_rooms: usize,
) -> HealthResponse {
    HealthResponse {
        status: "ok".to_owned(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        active_rooms,
    }
}
