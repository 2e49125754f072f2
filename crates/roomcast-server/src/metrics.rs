//! Prometheus metrics for the relay.
//!
//! The recorder is installed once at startup; the `/metrics` route renders
//! it. Metric names live here so emit sites and tests share one spelling.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Counter: WebSocket connections accepted since startup.
pub const CONNECTIONS_TOTAL: &str = "relay_connections_total";
/// Gauge: currently open WebSocket connections.
pub const CONNECTIONS_ACTIVE: &str = "relay_connections_active";
/// Counter: sessions ended since startup.
pub const DISCONNECTIONS_TOTAL: &str = "relay_disconnections_total";
/// Counter: client text messages relayed to a room.
pub const MESSAGES_RELAYED_TOTAL: &str = "relay_messages_total";
/// Counter: sends rejected by a participant's outbound queue.
pub const SEND_FAILURES_TOTAL: &str = "relay_send_failures_total";
/// Gauge: rooms currently present in the registry.
pub const ROOMS_ACTIVE: &str = "relay_rooms_active";
/// Counter: rooms torn down by an end-of-conversation close.
pub const ROOMS_CLOSED_TOTAL: &str = "relay_rooms_closed_total";
/// Histogram: session duration from accept to cleanup, in seconds.
pub const CONNECTION_DURATION_SECONDS: &str = "relay_connection_duration_seconds";

/// Install the process-global Prometheus recorder.
///
/// # Panics
///
/// Panics if a recorder is already installed; call once at startup.
pub fn install_recorder() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render current metrics in the Prometheus text exposition format.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}
