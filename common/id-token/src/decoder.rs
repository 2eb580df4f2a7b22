use std::str::FromStr;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use tracing::debug;

use crate::claims::TokenPayload;
use crate::error::RejectionReason;
use crate::keys::SigningKey;

const SEGMENT_MESSAGE: &str =
    "jwt payload is supposed to be composed of 3 base64url encoded parts separated by a '.'";

// Providers differ on whether they pad; accept both.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// JOSE header fields used to pick a key. Never used for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    #[serde(rename = "kid")]
    pub key_id: String,
    #[serde(rename = "alg")]
    pub algorithm: String,
    #[serde(rename = "typ", default)]
    pub token_type: Option<String>,
}

/// A syntactically valid token whose contents are not yet trusted.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    header: TokenHeader,
    payload: TokenPayload,
    signature: Vec<u8>,
    signing_input: String,
}

impl DecodedToken {
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    pub fn key_id(&self) -> &str {
        &self.header.key_id
    }

    /// The claimed payload. Untrusted until `verify_signature` succeeds.
    pub fn unverified_payload(&self) -> &TokenPayload {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// `<header>.<payload>` exactly as received; the bytes the signature covers.
    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }

    /// Check the signature with `key` and release the payload only on success.
    pub fn verify_signature(
        self,
        key: &SigningKey,
        allowed: &[Algorithm],
    ) -> Result<TokenPayload, RejectionReason> {
        let algorithm = Algorithm::from_str(&self.header.algorithm)
            .map_err(|_| RejectionReason::AlgorithmNotAllowed(self.header.algorithm.clone()))?;
        if !allowed.contains(&algorithm) || !key.family().supports(algorithm) {
            return Err(RejectionReason::AlgorithmNotAllowed(
                self.header.algorithm.clone(),
            ));
        }

        let encoded_signature = URL_SAFE_NO_PAD.encode(&self.signature);
        match jsonwebtoken::crypto::verify(
            &encoded_signature,
            self.signing_input(),
            key.decoding_key(),
            algorithm,
        ) {
            Ok(true) => Ok(self.payload),
            Ok(false) => Err(RejectionReason::SignatureInvalid),
            Err(err) => {
                debug!(kid = key.key_id(), error = %err, "signature check errored");
                Err(RejectionReason::SignatureInvalid)
            }
        }
    }
}

/// Split and parse a compact JWS without trusting any of it.
pub fn decode(raw: &str) -> Result<DecodedToken, RejectionReason> {
    let raw = raw.trim();
    let mut segments = raw.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(RejectionReason::malformed(SEGMENT_MESSAGE));
    };
    if header_b64.is_empty() || payload_b64.is_empty() || signature_b64.is_empty() {
        return Err(RejectionReason::malformed(SEGMENT_MESSAGE));
    }

    let header_bytes = decode_segment("header", header_b64)?;
    let payload_bytes = decode_segment("payload", payload_b64)?;
    let signature = decode_segment("signature", signature_b64)?;

    let header: TokenHeader = serde_json::from_slice(&header_bytes)
        .map_err(|err| RejectionReason::malformed(format!("invalid token header: {err}")))?;
    let payload: TokenPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|err| RejectionReason::malformed(format!("invalid token payload: {err}")))?;

    Ok(DecodedToken {
        header,
        payload,
        signature,
        signing_input: format!("{header_b64}.{payload_b64}"),
    })
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, RejectionReason> {
    URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|err| RejectionReason::malformed(format!("token {name} is not base64url: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segment(value: serde_json::Value) -> String {
        URL_SAFE_NO_PAD.encode(value.to_string())
    }

    fn token(header: serde_json::Value, payload: serde_json::Value) -> String {
        format!(
            "{}.{}.{}",
            segment(header),
            segment(payload),
            URL_SAFE_NO_PAD.encode(b"sig")
        )
    }

    fn claims() -> serde_json::Value {
        json!({
            "sub": "1234",
            "aud": "DUMMY_CLIENT_ID",
            "iss": "accounts.google.com",
            "exp": 2_000_000_000i64,
            "iat": 1_999_996_400i64
        })
    }

    #[test]
    fn decodes_well_formed_token() {
        let raw = token(json!({"alg": "RS256", "kid": "k1", "typ": "JWT"}), claims());
        let decoded = decode(&raw).expect("decodes");

        assert_eq!(decoded.key_id(), "k1");
        assert_eq!(decoded.header().algorithm, "RS256");
        assert_eq!(decoded.header().token_type.as_deref(), Some("JWT"));
        assert_eq!(decoded.unverified_payload().subject, "1234");
        assert_eq!(decoded.signature(), b"sig");

        let (signed, _) = raw.rsplit_once('.').expect("three parts");
        assert_eq!(decoded.signing_input(), signed.as_bytes());
    }

    #[test]
    fn rejects_wrong_segment_counts() {
        for raw in ["bad_token", "a.b", "a.b.c.d", "", "..", "a..c"] {
            let err = decode(raw).expect_err("malformed");
            assert_eq!(err, RejectionReason::MalformedToken(SEGMENT_MESSAGE.into()), "{raw}");
        }
    }

    #[test]
    fn rejects_non_base64_segments() {
        let raw = format!("{}.!!!.{}", segment(json!({"alg": "RS256", "kid": "k"})), "c2ln");
        assert!(matches!(decode(&raw), Err(RejectionReason::MalformedToken(_))));
    }

    #[test]
    fn accepts_padded_segments() {
        let header = URL_SAFE_LENIENT.encode(json!({"alg": "RS256", "kid": "k"}).to_string());
        let padded = base64::engine::general_purpose::URL_SAFE.encode(claims().to_string());
        let raw = format!("{header}.{padded}.c2ln");
        assert!(decode(&raw).is_ok());
    }

    #[test]
    fn rejects_header_without_kid() {
        let raw = token(json!({"alg": "RS256"}), claims());
        assert!(matches!(decode(&raw), Err(RejectionReason::MalformedToken(_))));
    }

    #[test]
    fn rejects_payload_that_is_not_claims() {
        let raw = token(json!({"alg": "RS256", "kid": "k"}), json!(["not", "an", "object"]));
        assert!(matches!(decode(&raw), Err(RejectionReason::MalformedToken(_))));

        let raw = token(json!({"alg": "RS256", "kid": "k"}), json!({"sub": "x"}));
        assert!(matches!(decode(&raw), Err(RejectionReason::MalformedToken(_))));
    }
}
