//! Health, debug and token endpoints.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::info;

use super::error::ApiError;
use super::metrics::METRICS;
use super::sms::SMS_PATH;
use super::voice::{CONFERENCE_PATH, VOICE_PATH};
use super::webhook::public_base_url;
use super::AppState;
use crate::twilio::AccessTokenBuilder;

/// `GET /`
pub async fn root() -> &'static str {
    concat!("switchboard ", env!("CARGO_PKG_VERSION"), " is running")
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /debug`: configuration (secrets redacted) and the webhook URLs to
/// paste into the Twilio console.
pub async fn debug(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let config = &state.config;
    let base = public_base_url(config, &headers);
    Json(json!({
        "status": "OK",
        "version": env!("CARGO_PKG_VERSION"),
        "gitCommit": env!("SWITCHBOARD_GIT_HASH"),
        "uptimeSeconds": METRICS.uptime_secs(),
        "twilioConfigured": config.is_configured(),
        "tokensEnabled": config.can_mint_tokens(),
        "problems": config.validate(),
        "config": config.redacted(),
        "webhooks": {
            "voice": format!("{}{}", base, VOICE_PATH),
            "sms": format!("{}{}", base, SMS_PATH),
            "conference": format!("{}{}", base, CONFERENCE_PATH),
        },
    }))
}

/// `GET /test-twilio`: check the credentials by fetching the account.
pub async fn test_twilio(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let result = state.twilio.fetch_account().await;
    METRICS.observe_provider("fetch_account", result.is_ok(), started);
    let account = result.map_err(|e| ApiError::provider("Twilio connection test failed", e))?;

    Ok(Json(json!({
        "success": true,
        "account": {
            "sid": account.sid,
            "friendlyName": account.friendly_name,
            "status": account.status,
            "type": account.account_type,
        },
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub identity: Option<String>,
}

/// `GET /get-token?identity=...`: voice access token for a client SDK.
pub async fn get_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>, ApiError> {
    let config = &state.config;
    let identity = match query.identity {
        Some(identity) => identity,
        None => format!("user-{}", uuid::Uuid::new_v4().simple()),
    };

    let token = AccessTokenBuilder {
        account_sid: config.account_sid.clone(),
        api_key: config.api_key.clone(),
        api_secret: config.api_secret.clone(),
        identity: identity.clone(),
        ttl_secs: config.token_ttl_secs,
        outgoing_application_sid: config.twiml_app_sid.clone(),
        allow_incoming: true,
    }
    .to_jwt(chrono::Utc::now().timestamp())?;

    METRICS.tokens_issued_total.inc();
    info!(identity = %identity, "access token issued");
    Ok(Json(json!({ "token": token, "identity": identity })))
}

/// Browser noise (`/favicon.ico`, Chrome DevTools lookups).
pub async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "The requested resource was not found")
}
