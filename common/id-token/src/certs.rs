use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{CertsFormat, VerifierConfig, GOOGLE_CERTS_URL};
use crate::error::{KeyResolutionError, ResolveResult};
use crate::keys::{JwkEntry, SigningKey};
use crate::resolver::KeyResolver;

/// Fetches the provider's published keys over HTTP on every resolve.
#[derive(Clone)]
pub struct HttpKeyResolver {
    client: Client,
    url: String,
    format: CertsFormat,
    timeout: Duration,
}

impl HttpKeyResolver {
    pub fn new(url: impl Into<String>, format: CertsFormat) -> Self {
        Self::with_client(Client::new(), url, format)
    }

    pub fn with_client(client: Client, url: impl Into<String>, format: CertsFormat) -> Self {
        Self {
            client,
            url: url.into(),
            format,
            timeout: Duration::from_secs(10),
        }
    }

    /// Google's v1 certificate endpoint.
    pub fn google() -> Self {
        Self::new(GOOGLE_CERTS_URL, CertsFormat::PemMap)
    }

    pub fn from_config(config: &VerifierConfig) -> Self {
        Self::new(config.certs_url.clone(), config.certs_format).with_timeout(config.fetch_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_body(&self) -> ResolveResult<String> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        if response.status() != StatusCode::OK {
            return Err(KeyResolutionError::Status {
                status: response.status().as_u16(),
                url: self.url.clone(),
            });
        }

        response
            .text()
            .await
            .map_err(|err| self.transport_error(err))
    }

    fn transport_error(&self, err: reqwest::Error) -> KeyResolutionError {
        if err.is_timeout() {
            KeyResolutionError::Timeout(self.url.clone())
        } else {
            KeyResolutionError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl KeyResolver for HttpKeyResolver {
    async fn resolve(&self, key_id: &str) -> ResolveResult<SigningKey> {
        let body = self.fetch_body().await.inspect_err(|err| {
            warn!(url = %self.url, kid = key_id, error = %err, "signing key fetch failed");
        })?;

        let key = match self.format {
            CertsFormat::PemMap => key_from_pem_map(&body, key_id)?,
            CertsFormat::Jwks => key_from_jwks(&body, key_id)?,
        };
        debug!(url = %self.url, kid = key_id, "resolved signing key");
        Ok(key)
    }
}

fn key_from_pem_map(body: &str, key_id: &str) -> ResolveResult<SigningKey> {
    let keys: HashMap<String, String> =
        serde_json::from_str(body).map_err(|err| KeyResolutionError::Decode(err.to_string()))?;
    let pem = keys
        .get(key_id)
        .ok_or_else(|| KeyResolutionError::UnknownKeyId(key_id.to_string()))?;
    SigningKey::from_pem(key_id, pem)
}

fn key_from_jwks(body: &str, key_id: &str) -> ResolveResult<SigningKey> {
    let document: JwksResponse =
        serde_json::from_str(body).map_err(|err| KeyResolutionError::Decode(err.to_string()))?;
    let entry = document
        .keys
        .iter()
        .find(|entry| entry.kid.as_deref() == Some(key_id))
        .ok_or_else(|| KeyResolutionError::UnknownKeyId(key_id.to_string()))?;
    SigningKey::from_jwk(entry)
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkEntry>,
}
