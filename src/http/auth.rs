use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

use super::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Gate admin routes behind `Authorization: Bearer <admin_token>`.
///
/// Requests pass straight through when no token is configured.
pub async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return next.run(request).await;
    };

    match bearer_token(request.headers()) {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin token");
            AppError::unauthorized("Invalid admin token").into_response()
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "Admin request missing Bearer token");
            AppError::unauthorized("Bearer token required").into_response()
        }
    }
}
