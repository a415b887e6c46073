//! Weekly pool endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use wellgate_core::types::{PoolStatus, Timestamp};
use wellgate_core::WeeklyPoolDistributor;

use crate::dto::{DistributeRequest, DistributeResponse, PoolStatusResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Distribute the weekly pool for an elapsed week (operator only)
pub async fn distribute_pool(
    State(state): State<AppState>,
    Json(req): Json<DistributeRequest>,
) -> ApiResult<Json<DistributeResponse>> {
    let payouts = state.pool.distribute(req.week_index).await?;

    let week_index = req
        .week_index
        .unwrap_or_else(|| WeeklyPoolDistributor::default_week(Timestamp::now()));

    let response = DistributeResponse::from_payouts(week_index, &payouts);
    state.metrics.pool_distributed(response.total_distributed);

    Ok(Json(response))
}

/// Pool status query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PoolStatusQuery {
    /// Include this user's XP and estimated share
    pub user_id: Option<String>,
    /// Week to inspect; defaults to the current week
    pub week_index: Option<u64>,
}

/// Get the current week's pool standing and leaderboard
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<PoolStatusQuery>,
) -> ApiResult<Json<PoolStatusResponse>> {
    let overview = state
        .pool
        .overview(query.week_index, query.user_id.as_ref())
        .await?;

    Ok(Json(PoolStatusResponse::from(&overview)))
}

/// Get payouts for a distributed week
pub async fn get_payouts(
    State(state): State<AppState>,
    Path(week_index): Path<u64>,
) -> ApiResult<Json<DistributeResponse>> {
    let pool = state
        .storage
        .get_pool(week_index)
        .await?
        .filter(|p| p.status == PoolStatus::Distributed)
        .ok_or_else(|| {
            ApiError::NotFound(format!("Week {} has not been distributed", week_index))
        })?;

    let payouts = state.pool.payouts(week_index).await?;

    let mut response = DistributeResponse::from_payouts(week_index, &payouts);
    response.total_distributed = pool.distributed_total;

    Ok(Json(response))
}
