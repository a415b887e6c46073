//! API route handlers

pub mod gate;
pub mod health;
pub mod pool;
pub mod redeem;
pub mod xp;

use axum::{middleware, routing::get, routing::post, Router};

use crate::middleware::require_operator;
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let operator_routes = Router::new()
        .route("/xp/awards", post(xp::award_xp))
        .route("/redemptions", post(redeem::create_redemption))
        .route("/pool/distribute", post(pool::distribute_pool))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_operator,
        ));

    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics_export))
        .route("/metrics/snapshot", get(health::metrics_snapshot))
        // Access endpoints
        .route("/access", post(gate::request_access))
        .route("/accounts/:user_id", get(gate::get_account))
        // Payment endpoints
        .route("/payments/settle", post(gate::settle_payment))
        .route("/payments/:request_id", get(gate::get_request))
        // XP endpoints
        .route("/xp/:user_id", get(xp::get_status))
        .route("/xp/:user_id/history", get(xp::get_history))
        // Redemption endpoints
        .route("/redemptions/:user_id", get(redeem::get_history))
        .route("/redemptions/:user_id/status", get(redeem::get_status))
        // Pool endpoints
        .route("/pool/status", get(pool::get_status))
        .route("/pool/:week_index", get(pool::get_payouts))
        // Operator endpoints
        .merge(operator_routes)
        // State
        .with_state(state)
}
