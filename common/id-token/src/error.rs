use thiserror::Error;

pub type ResolveResult<T> = Result<T, KeyResolutionError>;

/// Why a token was refused. Every variant is a statement about the token
/// itself, never about the verifier's infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("No ID token")]
    NoTokenProvided,
    #[error("{0}")]
    MalformedToken(String),
    #[error("id_token signed with disallowed algorithm '{0}'")]
    AlgorithmNotAllowed(String),
    #[error("id_token not signed with a Google public key")]
    SignatureInvalid,
    #[error("id_token expired")]
    TokenExpired { expired_at: i64 },
    #[error("id_token clientID mismatch")]
    AudienceMismatch,
    #[error("id_token issued by untrusted issuer '{0}'")]
    IssuerInvalid(String),
}

impl RejectionReason {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken(reason.into())
    }

    /// Stable machine-readable code, safe to put in logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::NoTokenProvided => "no_token",
            RejectionReason::MalformedToken(_) => "malformed_token",
            RejectionReason::AlgorithmNotAllowed(_) => "algorithm_not_allowed",
            RejectionReason::SignatureInvalid => "signature_invalid",
            RejectionReason::TokenExpired { .. } => "token_expired",
            RejectionReason::AudienceMismatch => "audience_mismatch",
            RejectionReason::IssuerInvalid(_) => "issuer_invalid",
        }
    }
}

/// Failure to obtain signing key material. Says nothing about whether the
/// token is legitimate; callers should treat it as retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyResolutionError {
    #[error("failed to fetch signing keys: {0}")]
    Transport(String),
    #[error("timed out fetching signing keys from {0}")]
    Timeout(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("failed to parse signing key response: {0}")]
    Decode(String),
    #[error("no signing key published for kid '{0}'")]
    UnknownKeyId(String),
    #[error("signing key for kid '{0}' is empty")]
    EmptyKey(String),
    #[error("failed to parse signing key for kid '{kid}': {reason}")]
    KeyParse { kid: String, reason: String },
    #[error("signing key '{kid}' uses unsupported key type '{kty}'")]
    UnsupportedKey { kid: String, kty: String },
}

impl KeyResolutionError {
    pub(crate) fn key_parse(kid: &str, reason: impl ToString) -> Self {
        Self::KeyParse {
            kid: kid.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one client id is required")]
    MissingClientIds,
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages_match_strategy_wording() {
        assert_eq!(RejectionReason::NoTokenProvided.to_string(), "No ID token");
        assert_eq!(
            RejectionReason::TokenExpired { expired_at: 0 }.to_string(),
            "id_token expired"
        );
        assert_eq!(
            RejectionReason::AudienceMismatch.to_string(),
            "id_token clientID mismatch"
        );
        assert_eq!(
            RejectionReason::SignatureInvalid.to_string(),
            "id_token not signed with a Google public key"
        );
    }

    #[test]
    fn codes_are_distinct() {
        let reasons = [
            RejectionReason::NoTokenProvided,
            RejectionReason::malformed("x"),
            RejectionReason::AlgorithmNotAllowed("HS256".into()),
            RejectionReason::SignatureInvalid,
            RejectionReason::TokenExpired { expired_at: 1 },
            RejectionReason::AudienceMismatch,
            RejectionReason::IssuerInvalid("evil".into()),
        ];
        let mut codes: Vec<_> = reasons.iter().map(RejectionReason::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), reasons.len());
    }
}
