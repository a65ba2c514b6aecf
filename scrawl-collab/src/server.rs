//! HTTP surface and router.
//!
//! ```text
//! GET /api/socket/{id}   WebSocket upgrade; ?resume=<rev> replays from there
//! GET /api/text/{id}     current text, falling back to the archive
//! GET /api/stats         process counters as JSON
//! ```
//!
//! Everything stateful lives behind the [`Registry`]; the handlers only
//! route. `app` also spawns the background janitor.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveStore;
use crate::driver;
use crate::registry::{run_janitor, Registry};

/// Server tunables. The defaults mirror production: evict after a day of
/// quiescence, never time out live connections, no archive.
#[derive(Clone)]
pub struct ServerConfig {
    /// How long an empty session lingers before the janitor evicts it.
    pub quiescence: Duration,
    /// Drop connections with no traffic and no document activity for this
    /// long. `None` disables the limit.
    pub idle_timeout: Option<Duration>,
    /// Durable snapshot store, if persistence is wanted.
    pub archive: Option<Arc<ArchiveStore>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_secs(24 * 3600),
            idle_timeout: None,
            archive: None,
        }
    }
}

#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    idle_timeout: Option<Duration>,
    started_at: u64,
}

/// Process counters served at `/api/stats`.
#[derive(Debug, Serialize)]
struct Stats {
    /// Seconds since the Unix epoch when the server started.
    start_time: u64,
    /// Documents currently live in memory.
    num_documents: usize,
    /// Participants connected across all documents.
    num_participants: usize,
    /// Operations committed across all live logs.
    num_operations: u64,
    /// Text bytes inserted across all live logs.
    logged_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct SocketParams {
    /// Revision to replay history from; 0 means the full log.
    #[serde(default)]
    resume: u64,
}

/// Build the router and start the janitor. Call from within a runtime.
pub fn app(config: ServerConfig) -> Router {
    let registry = Arc::new(Registry::new(config.archive));
    tokio::spawn(run_janitor(registry.clone(), config.quiescence));

    let started_at = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("system clock before the Unix epoch")
        .as_secs();
    let state = AppState {
        registry,
        idle_timeout: config.idle_timeout,
        started_at,
    };
    Router::new()
        .route("/api/socket/{id}", get(socket_handler))
        .route("/api/text/{id}", get(text_handler))
        .route("/api/stats", get(stats_handler))
        .with_state(state)
}

async fn socket_handler(
    Path(id): Path<String>,
    Query(params): Query<SocketParams>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let session = state.registry.get_or_create(&id);
    let idle_timeout = state.idle_timeout;
    ws.on_upgrade(move |socket| driver::run(socket, session, params.resume, idle_timeout))
}

async fn text_handler(Path(id): Path<String>, State(state): State<AppState>) -> String {
    match state.registry.get(&id) {
        Some(session) => session.text(),
        None => state
            .registry
            .archive()
            .and_then(|archive| archive.load(&id).ok().flatten())
            .map(|document| document.text)
            .unwrap_or_default(),
    }
}

async fn stats_handler(State(state): State<AppState>) -> Json<Stats> {
    let totals = state.registry.stats();
    Json(Stats {
        start_time: state.started_at,
        num_documents: totals.sessions,
        num_participants: totals.participants,
        num_operations: totals.operations,
        logged_bytes: totals.logged_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.quiescence, Duration::from_secs(86_400));
        assert!(config.idle_timeout.is_none());
        assert!(config.archive.is_none());
    }

    #[test]
    fn test_socket_params_default_resume() {
        let params: SocketParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.resume, 0);
        let params: SocketParams = serde_json::from_str(r#"{"resume": 7}"#).unwrap();
        assert_eq!(params.resume, 7);
    }
}
