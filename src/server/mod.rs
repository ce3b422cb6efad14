//! HTTP server module for ipblocks
//!
//! Serves country block lookups over a read-only, atomically swappable index.
//!
//! # Architecture
//!
//! - `protocol` - Response and error payloads
//! - `handlers` - Individual route handlers
//!
//! # Routes
//!
//! - `GET /ip/{ip}` - every country block containing `ip`
//! - `GET /health` - version and size of the published index
//!
//! # Lifecycle
//!
//! The index is built before the listener binds. A failed or empty build
//! aborts startup. When a refresh interval is configured, a background task
//! rebuilds the index off to the side and publishes it with one pointer swap;
//! in-flight requests finish against the snapshot they started with.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ipblocks::server::{start_server, ServerConfig, ServerState};
//! use ipblocks::snapshot::SharedIndex;
//!
//! let index = Arc::new(SharedIndex::build(&config.index_builder())?);
//! let state = ServerState::new(index, ServerConfig::default());
//! start_server(state).await?;
//! ```

pub mod handlers;
pub mod protocol;

pub use protocol::{panic_response, ApiError, ErrorBody, ErrorCode, SystemInfo};

use crate::builder::IndexBuilder;
use crate::dataset::sync_dataset_logged;
use crate::snapshot::SharedIndex;
use axum::{routing::get, Router as AxumRouter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// =============================================================================
// Server Configuration
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub address: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: crate::config::DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Get the full bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Server State
// =============================================================================

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Current index snapshot handle
    pub index: Arc<SharedIndex>,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerState {
    pub fn new(index: Arc<SharedIndex>, config: ServerConfig) -> Self {
        Self {
            index,
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// Axum Router Creation
// =============================================================================

/// Create the Axum router for the HTTP server
pub fn create_axum_router(state: ServerState) -> AxumRouter {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    AxumRouter::new()
        .route("/ip/:ip", get(handlers::ip_lookup_handler))
        .route("/health", get(handlers::health_handler))
        .layer(CatchPanicLayer::custom(protocol::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Periodic refresh
// =============================================================================

/// What the background refresh task does on every tick
#[derive(Debug, Clone)]
pub struct RefreshPlan {
    pub interval: Duration,
    pub builder: IndexBuilder,
    /// Git remote and checkout directory to sync before rebuilding
    pub sync: Option<(String, PathBuf)>,
}

/// Ticker for the refresh loop, at least one second apart.
///
/// A sync and rebuild that overruns the interval pushes the next tick back
/// instead of firing the missed ones back to back.
fn refresh_ticker(interval: Duration) -> Interval {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Spawn a task that periodically syncs, rebuilds and publishes the index.
///
/// A failed rebuild keeps the current snapshot.
pub fn spawn_refresh_task(
    index: Arc<SharedIndex>,
    plan: RefreshPlan,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = refresh_ticker(plan.interval);
        // the first tick fires immediately; the initial build already happened
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let index = index.clone();
            let plan = plan.clone();
            let res = tokio::task::spawn_blocking(move || {
                if let Some((url, dir)) = &plan.sync {
                    sync_dataset_logged(url, dir);
                }
                index.refresh(&plan.builder)
            })
            .await;

            match res {
                Ok(Ok(version)) => tracing::info!("index refreshed to version {}", version),
                Ok(Err(_)) => {} // already logged by SharedIndex::refresh
                Err(e) => tracing::error!("index refresh task panicked: {}", e),
            }
        }
    })
}

// =============================================================================
// Server Startup
// =============================================================================

/// Start the HTTP server
pub async fn start_server(state: ServerState) -> anyhow::Result<()> {
    let bind_address = state.config.bind_address();
    let app = create_axum_router(state);

    tracing::info!("Starting HTTP server on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuiltIndex;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.port, 1234);
    }

    #[test]
    fn test_server_config_builder() {
        let config = ServerConfig::new().with_address("127.0.0.1").with_port(9000);

        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_create_axum_router() {
        let state = ServerState::new(
            Arc::new(SharedIndex::new(BuiltIndex::default(), "memory")),
            ServerConfig::default(),
        );
        let _router = create_axum_router(state);
    }

    #[tokio::test]
    async fn test_refresh_ticker_delays_missed_ticks() {
        let ticker = refresh_ticker(Duration::from_secs(6 * 3600));
        assert_eq!(ticker.missed_tick_behavior(), MissedTickBehavior::Delay);
        assert_eq!(ticker.period(), Duration::from_secs(6 * 3600));

        let ticker = refresh_ticker(Duration::from_millis(10));
        assert_eq!(ticker.period(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_refresh_task_publishes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("se.txt"), "2.248.0.0/13\n").unwrap();

        let builder = IndexBuilder::new(dir.path());
        let index = Arc::new(SharedIndex::build(&builder).unwrap());
        let handle = spawn_refresh_task(
            index.clone(),
            RefreshPlan {
                interval: Duration::from_secs(1),
                builder,
                sync: None,
            },
        );

        let mut published = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if index.version() > 1 {
                published = true;
                break;
            }
        }
        handle.abort();
        assert!(published);
    }
}
