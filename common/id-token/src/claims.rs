use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::GOOGLE_ISSUERS;
use crate::error::RejectionReason;

/// Audience claim; providers emit either a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Audience::One(item) => std::slice::from_ref(item),
            Audience::Many(items) => items,
        };
        items.iter().map(String::as_str)
    }

    /// True when any audience value exactly equals one of `accepted`.
    pub fn intersects(&self, accepted: &[String]) -> bool {
        self.iter()
            .any(|aud| accepted.iter().any(|candidate| candidate == aud))
    }
}

/// Claims carried by a provider ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(rename = "aud")]
    pub audience: Audience,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Provider-specific fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenPayload {
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expires_at, 0).single()
    }

    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        self.issued_at
            .and_then(|iat| Utc.timestamp_opt(iat, 0).single())
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Older Google tokens encode `email_verified` as the string "true".
    pub fn email_verified(&self) -> Option<bool> {
        match self.extra.get("email_verified")? {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }
}

/// Enforce issuer, expiry and audience on a payload whose signature has
/// already been verified. `now` is whole seconds since the epoch; the token is
/// dead at `exp + tolerance`, inclusive.
pub fn validate_claims(
    payload: &TokenPayload,
    accepted: &[String],
    now: i64,
    tolerance_seconds: u32,
) -> Result<(), RejectionReason> {
    if !GOOGLE_ISSUERS.contains(&payload.issuer.as_str()) {
        return Err(RejectionReason::IssuerInvalid(payload.issuer.clone()));
    }

    let deadline = payload
        .expires_at
        .saturating_add(i64::from(tolerance_seconds));
    if now >= deadline {
        return Err(RejectionReason::TokenExpired {
            expired_at: payload.expires_at,
        });
    }

    if !payload.audience.intersects(accepted) {
        return Err(RejectionReason::AudienceMismatch);
    }

    Ok(())
}
