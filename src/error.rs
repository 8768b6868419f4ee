//! Error taxonomy shared across the Relayer.
//!
//! Lower layers (Store, Chain Gateway) raise narrow errors of their own;
//! the Signature and Sync services translate them into this taxonomy before
//! returning. The HTTP layer only ever maps [`RelayerError`] variants to
//! status codes and `error.code` strings — it never inspects lower errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),
    #[error("signer is not a participant of this market")]
    NotParticipant,
    #[error("attested outcome does not match the signer's staked outcome")]
    OutcomeMismatch,
    #[error("market has no active proposal")]
    NoActiveProposal,
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),
    #[error("contract call failed: {0}")]
    ContractCall(String),
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    #[error("internal error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RelayerError {
    pub fn internal<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        RelayerError::Internal(Box::new(err))
    }

    pub fn code(&self) -> &'static str {
        match self {
            RelayerError::Validation(_) => "VALIDATION",
            RelayerError::NotFound(_) => "NOT_FOUND",
            RelayerError::Conflict(_) => "CONFLICT",
            RelayerError::SignatureInvalid(_) => "SIGNATURE_INVALID",
            RelayerError::NotParticipant => "VALIDATION",
            RelayerError::OutcomeMismatch => "VALIDATION",
            RelayerError::NoActiveProposal => "VALIDATION",
            RelayerError::ChainUnavailable(_) => "CHAIN_UNAVAILABLE",
            RelayerError::ContractCall(_) => "CHAIN_UNAVAILABLE",
            RelayerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            RelayerError::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            RelayerError::Validation(_)
            | RelayerError::NotParticipant
            | RelayerError::OutcomeMismatch
            | RelayerError::NoActiveProposal
            | RelayerError::SignatureInvalid(_) => StatusCode::BAD_REQUEST,
            RelayerError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayerError::Conflict(_) => StatusCode::CONFLICT,
            RelayerError::ChainUnavailable(_) | RelayerError::ContractCall(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RelayerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            RelayerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for RelayerError {
    fn from(err: sqlx::Error) -> Self {
        RelayerError::internal(err)
    }
}

impl IntoResponse for RelayerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internal messages are never leaked to callers.
            RelayerError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        if let RelayerError::Internal(ref e) = self {
            tracing::error!(error = ?e, "internal error");
        }
        let body = json!({
            "success": false,
            "error": {
                "message": message,
                "code": self.code(),
            }
        });
        (status, Json(body)).into_response()
    }
}

pub type RelayerResult<T> = Result<T, RelayerError>;
