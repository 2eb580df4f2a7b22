use std::env;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::error::ConfigError;

/// Google's certificate endpoint: a JSON object mapping kid to PEM certificate.
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v1/certs";

/// Issuers Google stamps into ID tokens. A property of the provider, not of
/// the application, so it is not configurable.
pub const GOOGLE_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Shape of the certificate endpoint response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertsFormat {
    /// `{"<kid>": "-----BEGIN CERTIFICATE-----..."}` (oauth2/v1/certs).
    #[default]
    PemMap,
    /// `{"keys": [{"kid": ..., "kty": ...}]}` (oauth2/v3/certs).
    Jwks,
}

impl FromStr for CertsFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pem" | "pem_map" | "x509" => Ok(CertsFormat::PemMap),
            "jwks" | "jwk" => Ok(CertsFormat::Jwks),
            other => Err(format!("unsupported certs format '{other}', use pem or jwks")),
        }
    }
}

/// Runtime configuration for ID token verification.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Accepted audience values (aud). Never empty.
    pub client_ids: Vec<String>,
    /// Signature algorithms a token header may name.
    pub algorithms: Vec<Algorithm>,
    /// Seconds of clock skew tolerated past `exp`.
    pub clock_tolerance_seconds: u32,
    pub certs_url: String,
    pub certs_format: CertsFormat,
    /// Upper bound on a single certificate fetch.
    pub fetch_timeout: Duration,
}

impl VerifierConfig {
    /// Construct config with defaults: RS256 only, no clock tolerance, Google v1 certs.
    pub fn new<I, S>(client_ids: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client_ids: Vec<String> = client_ids
            .into_iter()
            .map(Into::into)
            .filter(|id| !id.trim().is_empty())
            .collect();
        if client_ids.is_empty() {
            return Err(ConfigError::MissingClientIds);
        }

        Ok(Self {
            client_ids,
            algorithms: vec![Algorithm::RS256],
            clock_tolerance_seconds: 0,
            certs_url: GOOGLE_CERTS_URL.to_string(),
            certs_format: CertsFormat::PemMap,
            fetch_timeout: Duration::from_secs(10),
        })
    }

    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms.into_iter().collect();
        self
    }

    /// Adjust the allowed clock tolerance.
    pub fn with_clock_tolerance(mut self, seconds: u32) -> Self {
        self.clock_tolerance_seconds = seconds;
        self
    }

    pub fn with_certs_url(mut self, url: impl Into<String>, format: CertsFormat) -> Self {
        self.certs_url = url.into();
        self.certs_format = format;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Load configuration from `ID_TOKEN_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_ids = env::var("ID_TOKEN_CLIENT_IDS")
            .map(|value| parse_list(&value))
            .unwrap_or_default();
        let mut config = Self::new(client_ids)?;

        if let Some(value) = non_empty_var("ID_TOKEN_ALGORITHMS") {
            let algorithms = parse_list(&value)
                .into_iter()
                .map(|item| {
                    Algorithm::from_str(&item).map_err(|err| ConfigError::InvalidValue {
                        key: "ID_TOKEN_ALGORITHMS",
                        value: item.clone(),
                        reason: err.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            config = config.with_algorithms(algorithms);
        }

        if let Some(value) = non_empty_var("ID_TOKEN_CLOCK_TOLERANCE_SECS") {
            let seconds = value
                .parse::<u32>()
                .map_err(|err| ConfigError::InvalidValue {
                    key: "ID_TOKEN_CLOCK_TOLERANCE_SECS",
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
            config = config.with_clock_tolerance(seconds);
        }

        let format = match non_empty_var("ID_TOKEN_CERTS_FORMAT") {
            Some(value) => {
                CertsFormat::from_str(&value).map_err(|reason| ConfigError::InvalidValue {
                    key: "ID_TOKEN_CERTS_FORMAT",
                    value: value.clone(),
                    reason,
                })?
            }
            None => CertsFormat::PemMap,
        };
        let url = non_empty_var("ID_TOKEN_CERTS_URL").unwrap_or_else(|| GOOGLE_CERTS_URL.to_string());
        config = config.with_certs_url(url, format);

        if let Some(value) = non_empty_var("ID_TOKEN_FETCH_TIMEOUT_MS") {
            let millis = value
                .parse::<u64>()
                .map_err(|err| ConfigError::InvalidValue {
                    key: "ID_TOKEN_FETCH_TIMEOUT_MS",
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
            config = config.with_fetch_timeout(Duration::from_millis(millis));
        }

        Ok(config)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split([',', ';', ' '])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}
