//! Redemption endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::dto::{
    RedeemHistoryResponse, RedeemRequest, RedeemResponse, RedeemStatusResponse, RedemptionDto,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Redeem spendable XP for tokens (operator only); streak bonuses are
/// derived from history
pub async fn create_redemption(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> ApiResult<Json<RedeemResponse>> {
    match state.redeem.redeem(&req.user_id, req.xp).await {
        Ok((redemption, summary)) => {
            state.metrics.redemption_completed(redemption.tokens);
            Ok(Json(RedeemResponse::from_parts(&redemption, &summary)))
        }
        Err(e) => {
            state.metrics.redemption_rejected();
            Err(e.into())
        }
    }
}

/// Get redemption history for a user
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<RedeemHistoryResponse>> {
    let redemptions = state.redeem.history(&user_id).await?;

    Ok(Json(RedeemHistoryResponse {
        user_id,
        redemptions: redemptions.iter().map(RedemptionDto::from).collect(),
    }))
}

/// Get rolling cap usage and current bonus tiers for a user
pub async fn get_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<RedeemStatusResponse>> {
    let status = state.redeem.status(&user_id).await?;

    Ok(Json(RedeemStatusResponse::from_status(&user_id, &status)))
}
