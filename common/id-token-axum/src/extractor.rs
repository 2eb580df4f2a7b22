use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use common_id_token::{Decide, TokenPayload};

use crate::error::IdTokenRejection;
use crate::extract::{extract_token, ExtractOptions, TokenRequest};

/// Shared engine handle an axum state must expose via `FromRef`.
pub type SharedDecider = Arc<dyn Decide>;

/// Verified ID token claims taken from the query string, the `id_token`
/// header or an `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct VerifiedIdToken {
    pub payload: TokenPayload,
    pub token: String,
}

impl VerifiedIdToken {
    pub fn subject(&self) -> &str {
        &self.payload.subject
    }

    pub fn into_payload(self) -> TokenPayload {
        self.payload
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for VerifiedIdToken
where
    SharedDecider: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = IdTokenRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let decider = SharedDecider::from_ref(state);

        let request = TokenRequest::from_parts(parts);
        let token = extract_token(&request, &ExtractOptions::default())
            .ok_or(IdTokenRejection::Missing)?;
        let payload = IdTokenRejection::from_outcome(decider.decide(&token).await)?;

        Ok(Self { payload, token })
    }
}
