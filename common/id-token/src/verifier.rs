use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::CachingKeyResolver;
use crate::certs::HttpKeyResolver;
use crate::claims::{validate_claims, TokenPayload};
use crate::config::VerifierConfig;
use crate::decoder::decode;
use crate::error::{KeyResolutionError, RejectionReason};
use crate::resolver::KeyResolver;

/// Result of one verification call. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Verified { payload: TokenPayload },
    Rejected { reason: RejectionReason },
    /// Key material could not be obtained; nothing is known about the token.
    ResolutionError { cause: KeyResolutionError },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }

    pub fn payload(&self) -> Option<&TokenPayload> {
        match self {
            VerificationOutcome::Verified { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            VerificationOutcome::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<RejectionReason> for VerificationOutcome {
    fn from(reason: RejectionReason) -> Self {
        VerificationOutcome::Rejected { reason }
    }
}

/// Framework-agnostic seam adapters call instead of the concrete engine.
#[async_trait]
pub trait Decide: Send + Sync {
    async fn decide(&self, raw_token: &str) -> VerificationOutcome;
}

/// Verifies provider ID tokens: decode, resolve key, check signature, check claims.
#[derive(Clone)]
pub struct IdTokenVerifier {
    config: Arc<VerifierConfig>,
    resolver: Arc<dyn KeyResolver>,
}

impl IdTokenVerifier {
    pub fn new(config: VerifierConfig, resolver: Arc<dyn KeyResolver>) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
        }
    }

    pub fn builder(config: VerifierConfig) -> IdTokenVerifierBuilder {
        IdTokenVerifierBuilder::new(config)
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub async fn verify(&self, raw: &str) -> VerificationOutcome {
        self.verify_at(raw, Utc::now()).await
    }

    /// Verify against an explicit clock reading.
    pub async fn verify_at(&self, raw: &str, now: DateTime<Utc>) -> VerificationOutcome {
        let decoded = match decode(raw) {
            Ok(decoded) => decoded,
            Err(reason) => return self.rejected(None, reason),
        };
        let kid = decoded.key_id().to_string();

        let key = match self.resolver.resolve(&kid).await {
            Ok(key) => key,
            Err(cause) => {
                warn!(kid = %kid, error = %cause, "signing key resolution failed");
                return VerificationOutcome::ResolutionError { cause };
            }
        };

        let payload = match decoded.verify_signature(&key, &self.config.algorithms) {
            Ok(payload) => payload,
            Err(reason) => return self.rejected(Some(&kid), reason),
        };

        if let Err(reason) = validate_claims(
            &payload,
            &self.config.client_ids,
            now.timestamp(),
            self.config.clock_tolerance_seconds,
        ) {
            return self.rejected(Some(&kid), reason);
        }

        debug!(kid = %kid, sub = %payload.subject, "verified ID token successfully");
        VerificationOutcome::Verified { payload }
    }

    fn rejected(&self, kid: Option<&str>, reason: RejectionReason) -> VerificationOutcome {
        if let RejectionReason::MalformedToken(_) = reason {
            debug!(code = reason.code(), reason = %reason, "ID token rejected");
        } else {
            info!(kid, code = reason.code(), reason = %reason, "ID token rejected");
        }
        reason.into()
    }
}

#[async_trait]
impl Decide for IdTokenVerifier {
    async fn decide(&self, raw_token: &str) -> VerificationOutcome {
        self.verify(raw_token).await
    }
}

pub struct IdTokenVerifierBuilder {
    config: VerifierConfig,
    resolver: Option<Arc<dyn KeyResolver>>,
    cache_ttl: Option<Duration>,
}

impl IdTokenVerifierBuilder {
    fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            resolver: None,
            cache_ttl: None,
        }
    }

    /// Replace the default HTTP resolver.
    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: KeyResolver + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Wrap the resolver in a per-kid cache with the given TTL.
    pub fn with_caching(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> IdTokenVerifier {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(HttpKeyResolver::from_config(&self.config)));
        let resolver: Arc<dyn KeyResolver> = match self.cache_ttl {
            Some(ttl) => Arc::new(CachingKeyResolver::with_ttl(resolver, ttl)),
            None => resolver,
        };
        IdTokenVerifier::new(self.config, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticKeyResolver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    #[derive(Clone, Default)]
    struct Levels(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for Levels {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().expect("levels").push(*event.metadata().level());
        }
    }

    struct FailingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeyResolver for FailingResolver {
        async fn resolve(&self, key_id: &str) -> crate::error::ResolveResult<crate::SigningKey> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(KeyResolutionError::UnknownKeyId(key_id.to_string()))
        }
    }

    fn config() -> VerifierConfig {
        VerifierConfig::new(["DUMMY_CLIENT_ID"]).expect("config")
    }

    #[tokio::test]
    async fn malformed_token_never_reaches_the_resolver() {
        let resolver = Arc::new(FailingResolver {
            calls: AtomicUsize::new(0),
        });
        let verifier = IdTokenVerifier::new(config(), resolver.clone());

        let outcome = verifier.verify("bad_token").await;
        assert!(matches!(
            outcome,
            VerificationOutcome::Rejected {
                reason: RejectionReason::MalformedToken(_)
            }
        ));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn builder_uses_injected_resolver() {
        let verifier = IdTokenVerifier::builder(config())
            .with_resolver(StaticKeyResolver::new())
            .with_caching(Duration::from_secs(60))
            .build();
        assert_eq!(verifier.config().client_ids, vec!["DUMMY_CLIENT_ID"]);

        let outcome = verifier.decide("a.b.c").await;
        assert!(!outcome.is_verified());
        assert!(outcome.payload().is_none());
        assert!(outcome.rejection().is_some());
    }

    #[tokio::test]
    async fn garbage_tokens_only_log_at_debug() {
        let levels = Levels::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(levels.clone()));

        let verifier = IdTokenVerifier::new(config(), Arc::new(StaticKeyResolver::new()));
        for garbage in ["bad_token", "a.b", "x.y.z", "Zm9v.YmFy.YmF6"] {
            assert!(!verifier.verify(garbage).await.is_verified());
        }

        let recorded = levels.0.lock().expect("levels").clone();
        assert!(!recorded.is_empty());
        assert!(recorded.iter().all(|level| *level == Level::DEBUG));
    }
}
