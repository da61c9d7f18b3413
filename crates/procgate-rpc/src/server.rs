//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use procgate_core::ProcgateApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Core API, shared with blocking worker threads.
    pub api: Arc<ProcgateApi>,
}

/// Build the router over an API instance.
pub fn router(api: ProcgateApi) -> Router {
    let state = Arc::new(AppState { api: Arc::new(api) });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(api: ProcgateApi, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = router(api);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgate_core::{AccessPolicyConfig, FixedIdentity, ProcessRecord, StaticSource};

    fn static_api() -> ProcgateApi {
        let source = StaticSource::new()
            .with_process(ProcessRecord::new(1, "init", "root", vec!["/sbin/init".into()]));
        ProcgateApi::builder()
            .source(Arc::new(source))
            .policy(AccessPolicyConfig::new(false))
            .identity(Arc::new(FixedIdentity::new("alice", 1000, 1000)))
            .build()
    }

    #[tokio::test]
    async fn test_server_starts() {
        let addr = start_server(static_api(), "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_invalid_host_is_rejected() {
        assert!(start_server(static_api(), "not a host", 0).await.is_err());
    }
}
