use std::collections::HashMap;

use axum::extract::Query;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use serde_json::Value;

const ID_TOKEN: &str = "id_token";
const ACCESS_TOKEN: &str = "access_token";

/// Where to look for the raw token besides the fixed body/query fields.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Plain request header carrying the token verbatim.
    pub header_name: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            header_name: ID_TOKEN.to_string(),
        }
    }
}

/// The parts of a request a token may arrive in.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    pub body: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
}

impl TokenRequest {
    pub fn from_parts(parts: &Parts) -> Self {
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();
        Self {
            body: HashMap::new(),
            query,
            headers: parts.headers.clone(),
        }
    }

    pub fn with_body(mut self, body: HashMap<String, String>) -> Self {
        self.body = body;
        self
    }

    /// Take string fields from a JSON object body; other shapes are ignored.
    pub fn with_json_body(mut self, body: &Value) -> Self {
        if let Value::Object(fields) = body {
            self.body = fields
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|text| (key.clone(), text.to_string())))
                .collect();
        }
        self
    }
}

/// First non-empty token in precedence order: body `id_token`, body
/// `access_token`, query `id_token`, query `access_token`, the configured
/// header, then `Authorization: Bearer`.
pub fn extract_token(request: &TokenRequest, options: &ExtractOptions) -> Option<String> {
    let from_map = |map: &HashMap<String, String>, key: &str| {
        map.get(key).and_then(|value| non_empty(value))
    };

    from_map(&request.body, ID_TOKEN)
        .or_else(|| from_map(&request.body, ACCESS_TOKEN))
        .or_else(|| from_map(&request.query, ID_TOKEN))
        .or_else(|| from_map(&request.query, ACCESS_TOKEN))
        .or_else(|| {
            request
                .headers
                .get(options.header_name.as_str())
                .and_then(|value| value.to_str().ok())
                .and_then(non_empty)
        })
        .or_else(|| request.headers.get(AUTHORIZATION).and_then(parse_bearer))
}

fn parse_bearer(value: &HeaderValue) -> Option<String> {
    let raw = value.to_str().ok()?.trim();
    let token = raw.strip_prefix("Bearer ")?;
    non_empty(token)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    fn extract(request: &TokenRequest) -> Option<String> {
        extract_token(request, &ExtractOptions::default())
    }

    #[test]
    fn body_id_token_wins_over_everything() {
        let request = TokenRequest {
            body: map(&[("id_token", "body-id"), ("access_token", "body-access")]),
            query: map(&[("id_token", "query-id")]),
            headers: headers(&[("id_token", "header"), ("authorization", "Bearer bearer")]),
        };
        assert_eq!(extract(&request).as_deref(), Some("body-id"));
    }

    #[test]
    fn precedence_falls_through_in_order() {
        let mut request = TokenRequest {
            body: map(&[("access_token", "body-access")]),
            query: map(&[("id_token", "query-id"), ("access_token", "query-access")]),
            headers: headers(&[("id_token", "header"), ("authorization", "Bearer bearer")]),
        };
        assert_eq!(extract(&request).as_deref(), Some("body-access"));

        request.body.clear();
        assert_eq!(extract(&request).as_deref(), Some("query-id"));

        request.query.remove("id_token");
        assert_eq!(extract(&request).as_deref(), Some("query-access"));

        request.query.clear();
        assert_eq!(extract(&request).as_deref(), Some("header"));

        request.headers.remove("id_token");
        assert_eq!(extract(&request).as_deref(), Some("bearer"));

        request.headers.clear();
        assert_eq!(extract(&request), None);
    }

    #[test]
    fn empty_values_do_not_count() {
        let request = TokenRequest {
            body: map(&[("id_token", "  ")]),
            query: map(&[("id_token", "")]),
            headers: headers(&[("authorization", "Bearer    ")]),
        };
        assert_eq!(extract(&request), None);
    }

    #[test]
    fn bearer_requires_the_scheme() {
        let request = TokenRequest {
            headers: headers(&[("authorization", "Basic credentials")]),
            ..TokenRequest::default()
        };
        assert_eq!(extract(&request), None);
    }

    #[test]
    fn custom_header_name_is_used() {
        let request = TokenRequest {
            headers: headers(&[("x-google-id-token", "custom")]),
            ..TokenRequest::default()
        };
        let options = ExtractOptions {
            header_name: "x-google-id-token".into(),
        };
        assert_eq!(extract_token(&request, &options).as_deref(), Some("custom"));
    }

    #[test]
    fn from_parts_reads_query_and_headers() {
        let (parts, _) = Request::builder()
            .uri("/login?id_token=abc.def.ghi&other=1")
            .header("authorization", "Bearer xyz")
            .body(())
            .expect("request")
            .into_parts();

        let request = TokenRequest::from_parts(&parts);
        assert_eq!(request.query.get("other").map(String::as_str), Some("1"));
        assert_eq!(extract(&request).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn json_body_keeps_string_fields() {
        let request = TokenRequest::default()
            .with_json_body(&json!({"access_token": "from-json", "remember": true}));
        assert_eq!(request.body.len(), 1);
        assert_eq!(extract(&request).as_deref(), Some("from-json"));
    }
}
