#![allow(dead_code)]

use std::sync::OnceLock;

use chrono::Utc;
use common_id_token::{KeyFamily, SigningKey};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

pub const KID: &str = "test-key";
pub const CLIENT_ID: &str = "DUMMY_CLIENT_ID";
pub const GOOGLE_ISSUER: &str = "accounts.google.com";

pub struct KeyMaterial {
    pub encoding: EncodingKey,
    pub public_pem: String,
}

impl KeyMaterial {
    pub fn signing_key(&self, kid: &str) -> SigningKey {
        let decoding = DecodingKey::from_rsa_pem(self.public_pem.as_bytes()).expect("decoding key");
        SigningKey::new(kid, KeyFamily::Rsa, decoding)
    }
}

fn generate() -> KeyMaterial {
    let private_key = RsaPrivateKey::new(&mut OsRng, 2048).expect("key generation");
    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("private pem");
    let public_pem = private_key
        .to_public_key()
        .to_pkcs1_pem(LineEnding::LF)
        .expect("public pem");

    KeyMaterial {
        encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
        public_pem,
    }
}

/// The provider's signing key. Generated once per test binary.
pub fn provider_key() -> &'static KeyMaterial {
    static KEY: OnceLock<KeyMaterial> = OnceLock::new();
    KEY.get_or_init(generate)
}

/// A second key the verifier does not trust for `KID`.
pub fn attacker_key() -> &'static KeyMaterial {
    static KEY: OnceLock<KeyMaterial> = OnceLock::new();
    KEY.get_or_init(generate)
}

pub fn now() -> i64 {
    Utc::now().timestamp()
}

pub fn claims(aud: Value, iss: &str, exp: i64) -> Value {
    json!({
        "sub": "110169484474386276334",
        "aud": aud,
        "azp": CLIENT_ID,
        "iss": iss,
        "exp": exp,
        "iat": exp - 3600,
        "email": "user@example.com",
        "email_verified": "true"
    })
}

pub fn valid_claims(exp: i64) -> Value {
    claims(json!(CLIENT_ID), GOOGLE_ISSUER, exp)
}

pub fn sign(key: &EncodingKey, algorithm: Algorithm, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(algorithm);
    header.kid = Some(kid.to_string());
    encode(&header, claims, key).expect("sign token")
}

pub fn sign_rs256(claims: &Value) -> String {
    sign(&provider_key().encoding, Algorithm::RS256, KID, claims)
}
