//! Maintenance mode.
//!
//! While enabled, every request except health checks is answered with 503.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// Paths that stay reachable during maintenance.
fn is_exempt(path: &str) -> bool {
    path == "/health" || path.starts_with("/health/")
}

/// Reject requests with 503 when maintenance mode is on.
pub async fn maintenance_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config().maintenance_mode && !is_exempt(request.uri().path()) {
        return AppError::Maintenance.into_response();
    }
    next.run(request).await
}
