use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_id_token::{KeyResolutionError, RejectionReason, TokenPayload, VerificationOutcome};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Failure surfaced by the strategy as a system error rather than a rejection.
#[derive(Debug, Error)]
pub enum StrategyError<E> {
    #[error("signing keys unavailable: {0}")]
    Resolution(#[from] KeyResolutionError),
    #[error("application verify callback failed: {0}")]
    Application(#[source] E),
}

/// Rejection returned by the axum extractor.
#[derive(Debug, Error)]
pub enum IdTokenRejection {
    #[error("No ID token")]
    Missing,
    #[error("{0}")]
    Rejected(RejectionReason),
    #[error("signing keys unavailable: {0}")]
    Unavailable(KeyResolutionError),
}

impl IdTokenRejection {
    pub(crate) fn from_outcome(outcome: VerificationOutcome) -> Result<TokenPayload, Self> {
        match outcome {
            VerificationOutcome::Verified { payload } => Ok(payload),
            VerificationOutcome::Rejected { reason } => Err(Self::Rejected(reason)),
            VerificationOutcome::ResolutionError { cause } => Err(Self::Unavailable(cause)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for IdTokenRejection {
    fn into_response(self) -> Response {
        // Callers get a generic message; the specific reason stays in the logs.
        let (status, code, message) = match &self {
            IdTokenRejection::Missing => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_MISSING",
                RejectionReason::NoTokenProvided.to_string(),
            ),
            IdTokenRejection::Rejected(reason) => {
                info!(code = reason.code(), reason = %reason, "rejecting request credential");
                (
                    StatusCode::UNAUTHORIZED,
                    "AUTH_TOKEN",
                    "invalid credential".to_string(),
                )
            }
            IdTokenRejection::Unavailable(cause) => {
                warn!(error = %cause, "identity provider keys unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AUTH_KEYS",
                    "identity provider keys unavailable".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}
