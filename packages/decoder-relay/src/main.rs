//! Text Decoder Sync Relay
//!
//! A small HTTP service that provides:
//!
//! 1. **Sync blob relay**: Stores the encrypted export a client uploads under
//!    its user hash, and hands it back to the user's other devices.
//!
//! 2. **Behavior library**: Serves the reference library clients cache for
//!    offline use.
//!
//! 3. **Data deletion**: Removes everything held for a user hash on request.
//!
//! **Privacy**: The relay never sees plaintext. Blobs are sealed client-side
//! and user hashes are one-way digests. Logs carry only a hash prefix.

mod api;
mod behaviors;
mod rate_limit;
mod state;
mod sync;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use clap::Parser;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::{RelayConfig, RelayState, DEFAULT_MAX_BLOB_BYTES, DEFAULT_PORT};

/// Room for the JSON wrapper around `encrypted_data`.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "decoder-relay", version, about = "Text Decoder sync relay")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RELAY_PORT")]
    port: u16,

    /// Directory for persisted sync blobs and the behavior library.
    /// Runs in-memory when unset.
    #[arg(long, env = "RELAY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Largest accepted encrypted blob, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BLOB_BYTES, env = "MAX_BLOB_BYTES")]
    max_blob_bytes: usize,

    /// Behavior library JSON file (defaults to {data_dir}/behavior_library.json)
    #[arg(long, env = "BEHAVIOR_LIBRARY_PATH")]
    behavior_library_path: Option<PathBuf>,
}

impl From<Args> for RelayConfig {
    fn from(args: Args) -> Self {
        Self {
            port: args.port,
            data_dir: args.data_dir,
            max_blob_bytes: args.max_blob_bytes,
            behavior_library_path: args.behavior_library_path,
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router.
pub fn router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let body_limit = state.config.max_blob_bytes.saturating_add(BODY_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/behaviors", get(behaviors::get_behaviors))
        .route("/api/v1/behaviors/categories", get(behaviors::get_categories))
        .route("/api/v1/sync/upload", post(sync::api::upload))
        .route("/api/v1/sync/download", post(sync::api::download))
        .route("/api/v1/user/delete", delete(sync::api::delete_user))
        .fallback(api::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "decoder_relay=info,tower_http=info".into()),
        )
        .init();

    let config = RelayConfig::from(Args::parse());
    tracing::info!(
        data_dir = ?config.data_dir,
        max_blob_bytes = config.max_blob_bytes,
        "Relay configuration loaded"
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let state = RelayState::new(config);
    tracing::info!(blobs = state.blobs.count(), "Sync store ready");

    let app = router(state);

    tracing::info!("Decoder relay server starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

// ── Route Handlers ────────────────────────────────────────────────────────────

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "decoder-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": api::now_iso(),
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = router(RelayState::new(RelayConfig::default()))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let (status, json) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "decoder-relay");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_gets_envelope() {
        let (status, json) = get_json("/api/v1/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Not Found");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let app = router(RelayState::new(RelayConfig::default()));
        for _ in 0..100 {
            let response = app
                .clone()
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["decoder-relay"]);
        let config = RelayConfig::from(args);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_blob_bytes, DEFAULT_MAX_BLOB_BYTES);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_args_override() {
        let args = Args::parse_from([
            "decoder-relay",
            "--port",
            "9000",
            "--data-dir",
            "/var/lib/decoder",
            "--max-blob-bytes",
            "1024",
        ]);
        let config = RelayConfig::from(args);
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/decoder")));
        assert_eq!(config.max_blob_bytes, 1024);
    }
}
