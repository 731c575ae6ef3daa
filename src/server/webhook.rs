//! Webhook plumbing
//!
//! Parameter extraction for form and JSON bodies, the TwiML response
//! wrapper, public URL resolution and the `X-Twilio-Signature` middleware.

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::ApiError;
use super::metrics::METRICS;
use super::AppState;
use crate::config::Config;
use crate::twilio::{verify_signature, SIGNATURE_HEADER};
use crate::twiml;

/// Largest webhook body accepted by the signature check.
pub const MAX_WEBHOOK_BODY: usize = 64 * 1024;

/// Parameters posted by Twilio.
///
/// Bodies are form-encoded unless declared `application/json`, in which case
/// the top-level object's fields become parameters. An empty body yields no
/// parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookParams(Vec<(String, String)>);

impl WebhookParams {
    /// Parse an `application/x-www-form-urlencoded` body.
    pub fn parse(body: &[u8]) -> Self {
        Self(url::form_urlencoded::parse(body).into_owned().collect())
    }

    /// Parse a body according to its declared content type.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        if !content_type.is_some_and(|ct| ct.starts_with("application/json")) {
            return Ok(Self::parse(body));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
        let Value::Object(fields) = value else {
            return Ok(Self::default());
        };
        let pairs = fields
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect();
        Ok(Self(pairs))
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

impl<S> FromRequest<S> for WebhookParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = content_type(req.headers()).map(str::to_string);
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Self::from_body(content_type.as_deref(), &body)
    }
}

/// A rendered TwiML document, served as `text/xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Twiml(pub String);

impl IntoResponse for Twiml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, twiml::CONTENT_TYPE)], self.0).into_response()
    }
}

/// Base URL Twilio uses to reach this server, without a trailing slash.
///
/// `PUBLIC_BASE_URL` wins; otherwise it is rebuilt from `Host` and
/// `X-Forwarded-Proto` (default `http`).
pub fn public_base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_base_url {
        return base.clone();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    format!("{}://{}", proto, host)
}

/// Reject webhooks whose `X-Twilio-Signature` does not match.
///
/// A no-op unless `TWILIO_VERIFY_SIGNATURES` is enabled. Without an auth
/// token nothing can be verified, so every webhook is rejected. The body is
/// buffered to compute the signature and handed on unchanged.
pub async fn verify_twilio_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.verify_signatures {
        return next.run(request).await;
    }
    if state.config.auth_token.is_empty() {
        METRICS.signature_rejections_total.inc();
        warn!("signature verification enabled without TWILIO_AUTH_TOKEN; rejecting webhook");
        return ApiError::InvalidSignature.into_response();
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_WEBHOOK_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::BadRequest("Request body too large".to_string()).into_response();
        }
    };

    let url = format!(
        "{}{}",
        public_base_url(&state.config, &parts.headers),
        parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    );
    let params = WebhookParams::from_body(content_type(&parts.headers), &bytes)
        .unwrap_or_default();
    let valid = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|sig| verify_signature(&state.config.auth_token, &url, params.pairs(), sig));

    if !valid {
        METRICS.signature_rejections_total.inc();
        debug!(url = %url, "signature mismatch");
        return ApiError::InvalidSignature.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_params() {
        let params = WebhookParams::parse(b"Body=Hello+there&From=%2B15550001111&Body=second");
        assert_eq!(params.get("Body"), Some("Hello there"));
        assert_eq!(params.get("From"), Some("+15550001111"));
        assert_eq!(params.get("To"), None);
        assert_eq!(params.pairs().len(), 3);
    }

    #[test]
    fn test_parse_empty_body() {
        assert_eq!(WebhookParams::parse(b""), WebhookParams::default());
    }

    #[test]
    fn test_public_base_url_prefers_config() {
        let config = Config {
            public_base_url: Some("https://voip.example.com".to_string()),
            ..Config::default()
        };
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:3000"));
        assert_eq!(public_base_url(&config, &headers), "https://voip.example.com");
    }

    #[test]
    fn test_public_base_url_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("abc.ngrok.io"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(
            public_base_url(&Config::default(), &headers),
            "https://abc.ngrok.io"
        );
    }

    #[test]
    fn test_public_base_url_defaults() {
        assert_eq!(
            public_base_url(&Config::default(), &HeaderMap::new()),
            "http://localhost"
        );
    }

    #[test]
    fn test_from_body_json_object() {
        let params = WebhookParams::from_body(
            Some("application/json; charset=utf-8"),
            br#"{"Body":"hello","Digits":1,"Skip":null}"#,
        )
        .unwrap();
        assert_eq!(params.get("Body"), Some("hello"));
        assert_eq!(params.get("Digits"), Some("1"));
        assert_eq!(params.get("Skip"), None);
    }

    #[test]
    fn test_from_body_json_edge_cases() {
        let json = Some("application/json");
        assert_eq!(
            WebhookParams::from_body(json, b"").unwrap(),
            WebhookParams::default()
        );
        assert_eq!(
            WebhookParams::from_body(json, b"[1, 2]").unwrap(),
            WebhookParams::default()
        );
        assert!(matches!(
            WebhookParams::from_body(json, b"{not json"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_from_body_defaults_to_form() {
        let params = WebhookParams::from_body(None, b"Body=hi").unwrap();
        assert_eq!(params.get("Body"), Some("hi"));
        let params = WebhookParams::from_body(Some("text/plain"), b"Digits=2").unwrap();
        assert_eq!(params.get("Digits"), Some("2"));
    }
}
