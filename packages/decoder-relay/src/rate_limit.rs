//! Per-client request limits.
//!
//! Fixed one-minute windows keyed by route group and client IP. Requests
//! over budget get a `429` envelope before any handler runs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::api::RelayError;
use crate::state::RelayState;

/// Window length in seconds.
const WINDOW_SECS: i64 = 60;

/// Route groups that share a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteLimit {
    Behaviors,
    SyncUpload,
    SyncDownload,
    UserDelete,
}

impl RouteLimit {
    /// The group a request path belongs to, if it is limited at all.
    pub fn for_path(path: &str) -> Option<Self> {
        match path {
            "/api/v1/behaviors" | "/api/v1/behaviors/categories" => Some(Self::Behaviors),
            "/api/v1/sync/upload" => Some(Self::SyncUpload),
            "/api/v1/sync/download" => Some(Self::SyncDownload),
            "/api/v1/user/delete" => Some(Self::UserDelete),
            _ => None,
        }
    }

    /// Requests allowed per window.
    pub fn per_minute(self) -> u32 {
        match self {
            Self::Behaviors => 60,
            Self::SyncUpload | Self::SyncDownload => 10,
            Self::UserDelete => 5,
        }
    }
}

struct Window {
    count: u32,
    started: i64,
}

/// Request counters: (route group, client) -> current window
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<DashMap<(RouteLimit, String), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request. Returns false when the client is over budget.
    pub fn check(&self, route: RouteLimit, client: &str) -> bool {
        self.check_at(route, client, chrono::Utc::now().timestamp())
    }

    fn check_at(&self, route: RouteLimit, client: &str, now: i64) -> bool {
        let mut window = self
            .windows
            .entry((route, client.to_string()))
            .or_insert(Window {
                count: 0,
                started: now,
            });

        if now - window.started >= WINDOW_SECS {
            window.count = 0;
            window.started = now;
        }

        if window.count >= route.per_minute() {
            return false;
        }
        window.count += 1;
        true
    }
}

/// Middleware applying [`RateLimiter`] to every limited route.
///
/// Clients are told apart by peer IP. Without connection info (in-process
/// tests) every request shares one budget.
pub async fn enforce(State(state): State<RelayState>, request: Request, next: Next) -> Response {
    if let Some(route) = RouteLimit::for_path(request.uri().path()) {
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if !state.limiter.check(route, &client) {
            tracing::warn!(client = %client, route = ?route, "Rate limit exceeded");
            return RelayError::RateLimited.into_response();
        }
    }
    next.run(request).await
}
