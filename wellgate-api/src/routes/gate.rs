//! Access and settlement endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use wellgate_core::types::{digest_from_hex, AccessDecision, PaymentProof, Timestamp};
use wellgate_core::CoreError;

use crate::dto::{
    AccessRequest, AccessResponse, AccountResponse, ChallengeDto, ChallengeResponse,
    RequestStatusResponse, SettleRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Consume one paid use, returning a payment challenge with HTTP 402 when
/// neither free uses nor prepaid credits remain
pub async fn request_access(
    State(state): State<AppState>,
    Json(req): Json<AccessRequest>,
) -> ApiResult<Response> {
    let decision = state
        .gate
        .request_access(&req.resource, &req.user_id)
        .await?;

    let response = match decision {
        AccessDecision::Free { remaining } => {
            state.metrics.access_free();
            Json(AccessResponse::Free { remaining }).into_response()
        }
        AccessDecision::Covered { credits_remaining } => {
            state.metrics.access_covered();
            Json(AccessResponse::Covered { credits_remaining }).into_response()
        }
        AccessDecision::PaymentRequired { request } => {
            state.metrics.challenge_issued();
            let body = ChallengeResponse {
                error: "Payment required".to_string(),
                code: "PAYMENT_REQUIRED".to_string(),
                challenge: ChallengeDto::from(&request),
            };
            (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
        }
    };

    Ok(response)
}

/// Account lookup parameters
#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    #[serde(default = "crate::dto::default_resource")]
    pub resource: String,
}

/// Get account state for a user and resource
pub async fn get_account(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Json<AccountResponse>> {
    let account = state.gate.account(&user_id, &query.resource).await?;

    Ok(Json(AccountResponse::from_account(
        &account,
        state.gate.free_daily_uses(),
    )))
}

/// Settle a payment challenge with an on-chain transaction hash
pub async fn settle_payment(
    State(state): State<AppState>,
    Json(req): Json<SettleRequest>,
) -> ApiResult<Json<AccountResponse>> {
    let request_id = digest_from_hex(&req.request_id)
        .map_err(|_| ApiError::BadRequest("Invalid request_id hex".to_string()))?;

    let proof = PaymentProof {
        request_id,
        tx_hash: req.tx_hash,
        chain_id: req.chain_id,
        signed_at: Timestamp::from_millis(req.signed_at),
    };

    match state.gate.settle(&proof).await {
        Ok(account) => {
            state.metrics.payment_settled();
            Ok(Json(AccountResponse::from_account(
                &account,
                state.gate.free_daily_uses(),
            )))
        }
        Err(e) => {
            state
                .metrics
                .settlement_rejected(matches!(e, CoreError::AlreadyConsumed(_)));
            Err(e.into())
        }
    }
}

/// Get a payment request by ID
pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<RequestStatusResponse>> {
    let request_id = digest_from_hex(&request_id)
        .map_err(|_| ApiError::BadRequest("Invalid request_id hex".to_string()))?;

    let request = state
        .storage
        .get_request(&request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment request not found".to_string()))?;

    Ok(Json(RequestStatusResponse::from(&request)))
}
