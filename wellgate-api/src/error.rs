//! API Error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use wellgate_core::CoreError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn core_status(e: &CoreError) -> StatusCode {
    match e {
        CoreError::InvalidInput(_)
        | CoreError::MalformedTxHash(_)
        | CoreError::InvalidAddress(_)
        | CoreError::Configuration(_) => StatusCode::BAD_REQUEST,

        CoreError::RequestNotFound(_) => StatusCode::NOT_FOUND,

        CoreError::AlreadyConsumed(_)
        | CoreError::RequestAlreadySettled(_)
        | CoreError::AlreadyDistributed(_)
        | CoreError::DistributionBusy { .. } => StatusCode::CONFLICT,

        CoreError::TxFailed(_)
        | CoreError::WrongRecipient { .. }
        | CoreError::AmountBelowMinimum { .. }
        | CoreError::NoTransferToRecipient(_)
        | CoreError::RequestExpired(_)
        | CoreError::StaleProof { .. }
        | CoreError::ProofOutOfWindow { .. }
        | CoreError::WrongChain { .. }
        | CoreError::InsufficientXp { .. }
        | CoreError::BelowMinimumRedeem { .. }
        | CoreError::WindowNotElapsed(_) => StatusCode::UNPROCESSABLE_ENTITY,

        CoreError::DailyCapExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,

        CoreError::RpcResponse { .. } => StatusCode::BAD_GATEWAY,
        CoreError::RpcConnection(_)
        | CoreError::RpcRequest(_)
        | CoreError::RpcTimeout(_)
        | CoreError::TxNotIndexed(_) => StatusCode::SERVICE_UNAVAILABLE,

        CoreError::Storage(_) | CoreError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::Core(e) => (core_status(e), e.reason_code(), e.to_string()),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_status_mapping() {
        assert_eq!(
            core_status(&CoreError::AlreadyConsumed("0xabc".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            core_status(&CoreError::DailyCapExceeded {
                requested: 100,
                available: 50
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            core_status(&CoreError::TxNotIndexed("0xabc".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            core_status(&CoreError::AmountBelowMinimum {
                required: 10,
                actual: 1
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
