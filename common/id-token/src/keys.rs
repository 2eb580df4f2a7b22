use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey;

use crate::error::{KeyResolutionError, ResolveResult};

/// Which signature family a key belongs to. A header `alg` outside the
/// family is refused before any signature math runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Ec,
}

impl KeyFamily {
    pub fn supports(&self, algorithm: Algorithm) -> bool {
        match self {
            KeyFamily::Rsa => matches!(
                algorithm,
                Algorithm::RS256
                    | Algorithm::RS384
                    | Algorithm::RS512
                    | Algorithm::PS256
                    | Algorithm::PS384
                    | Algorithm::PS512
            ),
            KeyFamily::Ec => matches!(algorithm, Algorithm::ES256 | Algorithm::ES384),
        }
    }
}

/// Public key material resolved for a single kid.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    family: KeyFamily,
    key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    pub fn new(key_id: impl Into<String>, family: KeyFamily, key: DecodingKey) -> Self {
        Self {
            key_id: key_id.into(),
            family,
            key,
        }
    }

    /// Parse PEM material: an X.509 certificate, a PKCS#1 `RSA PUBLIC KEY`
    /// or an SPKI `PUBLIC KEY` (RSA or EC).
    pub fn from_pem(key_id: impl Into<String>, pem: &str) -> ResolveResult<Self> {
        let key_id = key_id.into();
        let pem = pem.trim();
        if pem.is_empty() {
            return Err(KeyResolutionError::EmptyKey(key_id));
        }

        if pem.contains("BEGIN CERTIFICATE") {
            return Self::from_certificate_pem(key_id, pem);
        }

        if let Ok(key) = DecodingKey::from_rsa_pem(pem.as_bytes()) {
            return Ok(Self::new(key_id, KeyFamily::Rsa, key));
        }

        DecodingKey::from_ec_pem(pem.as_bytes())
            .map(|key| Self::new(key_id.clone(), KeyFamily::Ec, key))
            .map_err(|err| KeyResolutionError::key_parse(&key_id, err))
    }

    fn from_certificate_pem(key_id: String, pem: &str) -> ResolveResult<Self> {
        let (_, block) = parse_x509_pem(pem.as_bytes())
            .map_err(|err| KeyResolutionError::key_parse(&key_id, err))?;
        let certificate = block
            .parse_x509()
            .map_err(|err| KeyResolutionError::key_parse(&key_id, err))?;

        let public_key = certificate
            .public_key()
            .parsed()
            .map_err(|err| KeyResolutionError::key_parse(&key_id, err))?;

        match public_key {
            PublicKey::RSA(rsa) => {
                let key = DecodingKey::from_rsa_raw_components(
                    strip_leading_zeros(rsa.modulus),
                    strip_leading_zeros(rsa.exponent),
                );
                Ok(Self::new(key_id, KeyFamily::Rsa, key))
            }
            PublicKey::EC(point) => {
                let key = DecodingKey::from_ec_der(point.data());
                Ok(Self::new(key_id, KeyFamily::Ec, key))
            }
            _ => Err(KeyResolutionError::UnsupportedKey {
                kid: key_id,
                kty: "certificate".to_string(),
            }),
        }
    }

    /// Build a key from one entry of a JSON Web Key Set.
    pub fn from_jwk(entry: &JwkEntry) -> ResolveResult<Self> {
        let kid = entry.kid.clone().unwrap_or_default();
        let kty = entry.kty.as_deref().unwrap_or("RSA");

        match kty {
            "RSA" => {
                let (Some(n), Some(e)) = (entry.n.as_deref(), entry.e.as_deref()) else {
                    return Err(KeyResolutionError::EmptyKey(kid));
                };
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|err| KeyResolutionError::key_parse(&kid, err))?;
                Ok(Self::new(kid, KeyFamily::Rsa, key))
            }
            "EC" => {
                let (Some(x), Some(y)) = (entry.x.as_deref(), entry.y.as_deref()) else {
                    return Err(KeyResolutionError::EmptyKey(kid));
                };
                let key = DecodingKey::from_ec_components(x, y)
                    .map_err(|err| KeyResolutionError::key_parse(&kid, err))?;
                Ok(Self::new(kid, KeyFamily::Ec, key))
            }
            other => Err(KeyResolutionError::UnsupportedKey {
                kid,
                kty: other.to_string(),
            }),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

// DER integers carry a sign byte; the verifier wants minimal big-endian.
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// One key of a JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkEntry {
    pub kid: Option<String>,
    pub kty: Option<String>,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
}
