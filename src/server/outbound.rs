//! Outbound call and SMS endpoints proxying to the Twilio REST API.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::info;

use super::error::ApiError;
use super::metrics::METRICS;
use super::voice::VOICE_PATH;
use super::webhook::{public_base_url, WebhookParams};
use super::AppState;
use crate::twilio::TwilioError;

/// `{to, message}` body accepted as JSON or as a form.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct OutboundRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl OutboundRequest {
    fn to(&self) -> Option<&str> {
        non_blank(self.to.as_deref())
    }

    fn message(&self) -> Option<&str> {
        non_blank(self.message.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl<S> FromRequest<S> for OutboundRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        if is_json {
            return serde_json::from_slice(&body)
                .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)));
        }

        let params = WebhookParams::parse(&body);
        Ok(Self {
            to: params.get("to").map(str::to_string),
            message: params.get("message").map(str::to_string),
        })
    }
}

/// `POST /make-call`: ring `to` and play the voice menu once answered.
pub async fn make_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: OutboundRequest,
) -> Result<Json<Value>, ApiError> {
    const FAILURE: &str = "Failed to make call";

    let to = request
        .to()
        .ok_or_else(|| ApiError::BadRequest("Phone number is required".to_string()))?;
    if state.config.phone_number.is_empty() {
        return Err(ApiError::provider(FAILURE, TwilioError::NotConfigured));
    }

    let url = format!("{}{}", public_base_url(&state.config, &headers), VOICE_PATH);
    let started = Instant::now();
    let result = state
        .twilio
        .create_call(to, &state.config.phone_number, &url)
        .await;
    METRICS.observe_provider("create_call", result.is_ok(), started);
    let call = result.map_err(|e| ApiError::provider(FAILURE, e))?;

    info!(call_sid = %call.sid, to, "call initiated");
    Ok(Json(json!({
        "success": true,
        "callSid": call.sid,
        "sid": call.sid,
        "message": "Call initiated successfully",
    })))
}

/// `POST /send-sms`
pub async fn send_sms(
    State(state): State<AppState>,
    request: OutboundRequest,
) -> Result<Json<Value>, ApiError> {
    const FAILURE: &str = "Failed to send SMS";

    let (Some(to), Some(message)) = (request.to(), request.message()) else {
        return Err(ApiError::BadRequest(
            "Phone number and message are required".to_string(),
        ));
    };
    if state.config.phone_number.is_empty() {
        return Err(ApiError::provider(FAILURE, TwilioError::NotConfigured));
    }

    let started = Instant::now();
    let result = state
        .twilio
        .send_message(to, &state.config.phone_number, message)
        .await;
    METRICS.observe_provider("send_message", result.is_ok(), started);
    let sms = result.map_err(|e| ApiError::provider(FAILURE, e))?;

    info!(message_sid = %sms.sid, to, "SMS sent");
    Ok(Json(json!({
        "success": true,
        "messageSid": sms.sid,
        "sid": sms.sid,
        "message": "SMS sent successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_are_missing() {
        let request = OutboundRequest {
            to: Some("  ".to_string()),
            message: Some("hi".to_string()),
        };
        assert_eq!(request.to(), None);
        assert_eq!(request.message(), Some("hi"));
    }

    #[test]
    fn test_deserialize_ignores_unknown_fields() {
        let request: OutboundRequest =
            serde_json::from_str(r#"{"to":"+15550001111","extra":true}"#).unwrap();
        assert_eq!(request.to(), Some("+15550001111"));
        assert_eq!(request.message(), None);
    }
}
