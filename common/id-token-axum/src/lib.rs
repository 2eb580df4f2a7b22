//! Adapter between an HTTP request and the framework-free ID token engine.

pub mod error;
pub mod extract;
pub mod extractor;
pub mod strategy;

pub use error::{IdTokenRejection, StrategyError};
pub use extract::{extract_token, ExtractOptions, TokenRequest};
pub use extractor::{SharedDecider, VerifiedIdToken};
pub use strategy::{AuthOutcome, Authorize, Decision, IdTokenStrategy, STRATEGY_NAME};
