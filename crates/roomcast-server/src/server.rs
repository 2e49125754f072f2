//! HTTP surface: health, metrics, and the WebSocket relay route.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{HealthResponse, health_snapshot};
use crate::ids::{ParticipantId, RoomId};
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::RoomRegistry;
use crate::websocket::session::run_room_session;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    /// Room membership and broadcast operations.
    pub registry: Arc<RoomRegistry>,
    /// Shutdown signal shared with every session.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server start time, for uptime reporting.
    pub start_time: Instant,
    /// Rendered by the `/metrics` route.
    pub metrics_handle: PrometheusHandle,
    /// Relay tunables applied to each new session.
    pub config: ServerConfig,
}

/// The relay server: registry, config, and shutdown coordinator in one
/// place, with [`RelayServer::listen`] to serve them.
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<RoomRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics_handle: PrometheusHandle,
}

impl RelayServer {
    /// Create a server from config and an installed metrics recorder.
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Self {
        Self {
            config,
            registry: Arc::new(RoomRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics_handle,
        }
    }

    /// Handle to the room registry.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }

    /// Handle to the shutdown coordinator.
    pub fn shutdown(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.shutdown)
    }

    /// Build the router with all routes and shared state.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics_handle: self.metrics_handle.clone(),
            config: self.config.clone(),
        };
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws/{room_id}", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve in a background task.
    ///
    /// Returns the bound address (meaningful with port `0`) and the listener
    /// task handle. The task completes once the shutdown token fires and
    /// in-flight sessions drain.
    pub async fn listen(&self) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            TcpListener::bind(format!("{}:{}", self.config.host, self.config.port)).await?;
        let addr = listener.local_addr()?;

        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(token.cancelled_owned());
            if let Err(error) = serve.await {
                error!(%error, "server error");
            }
        });

        Ok((addr, handle))
    }
}

/// `GET /health`: liveness plus room and connection counts.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.registry.connection_count().await;
    let active_rooms = state.registry.room_count().await;
    Json(health_snapshot(state.start_time, connections, active_rooms))
}

/// `GET /metrics`: Prometheus text exposition.
async fn metrics_handler(State(state): State<AppState>) -> String {
    metrics::render(&state.metrics_handle)
}

/// `GET /ws/{room_id}`: upgrade and run the session to completion.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let room_id = RoomId::from_string(room_id);
    let participant_id = ParticipantId::new();
    info!(
        room_id = %room_id,
        participant_id = %participant_id,
        "websocket upgrade requested"
    );

    let registry = Arc::clone(&state.registry);
    let shutdown = state.shutdown.token();
    let config = state.config.clone();
    ws.max_message_size(config.max_message_size)
        .on_upgrade(move |socket| {
            run_room_session(socket, room_id, participant_id, registry, config, shutdown)
        })
}
