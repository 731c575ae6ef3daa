//! Inbound SMS webhook with keyword auto-replies.

use axum::extract::State;
use tracing::info;

use super::metrics::METRICS;
use super::webhook::{Twiml, WebhookParams};
use super::AppState;
use crate::twiml::MessagingResponse;

pub const SMS_PATH: &str = "/sms";

const GREETING_REPLY: &str = "Hello! Thanks for reaching out. How can I help you today?";
const HELP_REPLY: &str =
    "I can help you with basic information. Try asking about our services or contact support.";
const SUPPORT_REPLY: &str = "For support, please call our main number or visit our website.";
const DEFAULT_REPLY: &str =
    "Thank you for your message. We have received it and will respond shortly.";

/// Keyword rules, checked in order; the first match wins.
const RULES: &[(&[&str], &str)] = &[
    (&["hello", "hi"], GREETING_REPLY),
    (&["help"], HELP_REPLY),
    (&["support"], SUPPORT_REPLY),
];

/// Pick the auto-reply for an inbound message body.
///
/// Matching is a case-insensitive substring test, so "this" counts as "hi".
pub fn auto_reply(body: &str) -> &'static str {
    let body = body.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| body.contains(k)))
        .map(|(_, reply)| *reply)
        .unwrap_or(DEFAULT_REPLY)
}

/// `POST /sms`
pub async fn incoming_message(State(_state): State<AppState>, params: WebhookParams) -> Twiml {
    METRICS.webhooks_total.inc(&[SMS_PATH]);
    let body = params.get("Body").unwrap_or_default();
    info!(
        from = params.get("From").unwrap_or("-"),
        message_sid = params.get("MessageSid").unwrap_or("-"),
        body,
        "SMS received"
    );

    let mut twiml = MessagingResponse::new();
    twiml.message(auto_reply(body));
    Twiml(twiml.render())
}
