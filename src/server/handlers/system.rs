//! Health handler
//!
//! `GET /health` reports the published index. The server only starts listening
//! after a successful, non-empty build, so a response here means it is ready.

use crate::server::protocol::SystemInfo;
use crate::server::ServerState;
use axum::extract::State;
use axum::Json;

/// Handler for `GET /health`
pub async fn health_handler(State(state): State<ServerState>) -> Json<SystemInfo> {
    Json(SystemInfo::new(state.index.load().info()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuiltIndex;
    use crate::server::ServerConfig;
    use crate::snapshot::SharedIndex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reports_snapshot() {
        let shared = Arc::new(SharedIndex::new(BuiltIndex::default(), "memory"));
        let state = ServerState::new(shared.clone(), ServerConfig::default());

        let Json(info) = health_handler(State(state.clone())).await;
        assert_eq!(info.index.version, 1);
        assert_eq!(info.index.entries, 0);
        assert_eq!(info.index.root, "memory");

        shared.publish(BuiltIndex::default(), "memory");
        let Json(info) = health_handler(State(state)).await;
        assert_eq!(info.index.version, 2);
    }
}
