//! Verification engine for provider-issued ID tokens (Google by default).
//!
//! [`IdTokenVerifier`] decodes a compact JWS, resolves the signing key by
//! `kid` through an injected [`KeyResolver`], checks the signature and then
//! enforces issuer, expiry and audience. Application code only sees a
//! [`TokenPayload`] inside [`VerificationOutcome::Verified`].

pub mod cache;
pub mod certs;
pub mod claims;
pub mod config;
pub mod decoder;
pub mod error;
pub mod keys;
pub mod resolver;
pub mod verifier;

pub use cache::CachingKeyResolver;
pub use certs::HttpKeyResolver;
pub use claims::{validate_claims, Audience, TokenPayload};
pub use config::{CertsFormat, VerifierConfig, GOOGLE_CERTS_URL, GOOGLE_ISSUERS};
pub use decoder::{decode, DecodedToken, TokenHeader};
pub use error::{ConfigError, KeyResolutionError, RejectionReason, ResolveResult};
pub use keys::{KeyFamily, SigningKey};
pub use resolver::{KeyResolver, StaticKeyResolver};
pub use verifier::{Decide, IdTokenVerifier, IdTokenVerifierBuilder, VerificationOutcome};

pub use jsonwebtoken::Algorithm;
