use std::sync::Arc;

use async_trait::async_trait;
use common_id_token::{Decide, RejectionReason, TokenPayload, VerificationOutcome};
use serde_json::Value;
use tracing::debug;

use crate::error::StrategyError;
use crate::extract::{extract_token, ExtractOptions, TokenRequest};

pub const STRATEGY_NAME: &str = "google-id-token";

/// Application verdict on an authentic token.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<U> {
    Accept { user: U, info: Option<Value> },
    Deny { message: String },
}

/// Application-supplied decision callback, run only for verified tokens.
#[async_trait]
pub trait Authorize: Send + Sync {
    type User: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn authorize(
        &self,
        request: &TokenRequest,
        payload: &TokenPayload,
        subject: &str,
    ) -> Result<Decision<Self::User>, Self::Error>;
}

/// Framework-neutral success / fail / error signal.
#[derive(Debug)]
pub enum AuthOutcome<U, E> {
    Success { user: U, info: Option<Value> },
    Fail { code: &'static str, message: String },
    Error(StrategyError<E>),
}

impl<U, E> AuthOutcome<U, E> {
    fn fail(reason: &RejectionReason) -> Self {
        AuthOutcome::Fail {
            code: reason.code(),
            message: reason.to_string(),
        }
    }
}

/// Extracts the token, runs the engine and hands authentic payloads to the
/// application's [`Authorize`] callback.
pub struct IdTokenStrategy<A> {
    decider: Arc<dyn Decide>,
    authorize: A,
    options: ExtractOptions,
}

impl<A: Authorize> IdTokenStrategy<A> {
    pub fn new(decider: Arc<dyn Decide>, authorize: A) -> Self {
        Self {
            decider,
            authorize,
            options: ExtractOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &'static str {
        STRATEGY_NAME
    }

    pub async fn authenticate(&self, request: &TokenRequest) -> AuthOutcome<A::User, A::Error> {
        let Some(token) = extract_token(request, &self.options) else {
            debug!("no ID token on request");
            return AuthOutcome::fail(&RejectionReason::NoTokenProvided);
        };

        let payload = match self.decider.decide(&token).await {
            VerificationOutcome::Verified { payload } => payload,
            VerificationOutcome::Rejected { reason } => return AuthOutcome::fail(&reason),
            VerificationOutcome::ResolutionError { cause } => {
                return AuthOutcome::Error(StrategyError::Resolution(cause))
            }
        };

        match self
            .authorize
            .authorize(request, &payload, &payload.subject)
            .await
        {
            Ok(Decision::Accept { user, info }) => AuthOutcome::Success { user, info },
            Ok(Decision::Deny { message }) => AuthOutcome::Fail {
                code: "denied",
                message,
            },
            Err(err) => AuthOutcome::Error(StrategyError::Application(err)),
        }
    }
}
