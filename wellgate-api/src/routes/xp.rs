//! XP ledger endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::dto::{AwardDto, AwardRequest, AwardResponse, XpHistoryResponse, XpStatusResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Record an XP award for an activity (operator only)
pub async fn award_xp(
    State(state): State<AppState>,
    Json(req): Json<AwardRequest>,
) -> ApiResult<Json<AwardResponse>> {
    let outcome = state.xp.award(&req.user_id, req.activity, req.metadata).await?;
    state.metrics.xp_awarded(outcome.xp_awarded);

    Ok(Json(AwardResponse::from(&outcome)))
}

/// Get XP status for a user: summary plus derived streak and progress
pub async fn get_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<XpStatusResponse>> {
    let status = state.xp.status(&user_id).await?;

    Ok(Json(XpStatusResponse::from(&status)))
}

/// Get XP award history for a user
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<XpHistoryResponse>> {
    let awards = state.xp.history(&user_id).await?;

    Ok(Json(XpHistoryResponse {
        user_id,
        awards: awards.iter().map(AwardDto::from).collect(),
    }))
}
