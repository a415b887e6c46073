//! Operator Authentication Middleware
//!
//! Guards operator-only endpoints (XP awards, pool distribution) with a
//! static bearer token. When no token is configured, auth is disabled and
//! all requests pass through (development mode).

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorResponse;
use crate::state::AppState;

/// Require a valid operator bearer token
pub async fn require_operator(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.operator_token.as_deref() else {
        // No token configured: auth disabled
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => unauthorized("Invalid operator token"),
        None => unauthorized("Missing bearer token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
            code: "UNAUTHORIZED".to_string(),
        }),
    )
        .into_response()
}
