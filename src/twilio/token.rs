//! Access tokens for Twilio Voice clients
//!
//! An access token is an HS256 JWT signed with an API key secret. Browser and
//! mobile SDKs present it to Twilio to register for incoming calls and to
//! place outgoing calls through a TwiML application.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Content type Twilio requires in the token header.
const TOKEN_CONTENT_TYPE: &str = "twilio-fpa;v=1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token generation is not configured")]
    NotConfigured,

    #[error("identity must not be empty")]
    EmptyIdentity,

    #[error("token lifetime of {0} seconds is out of range")]
    InvalidTtl(u64),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Inputs for minting a voice access token.
#[derive(Debug, Clone)]
pub struct AccessTokenBuilder {
    pub account_sid: String,
    pub api_key: String,
    pub api_secret: String,
    pub identity: String,
    pub ttl_secs: u64,
    /// TwiML application handling outgoing client calls.
    pub outgoing_application_sid: Option<String>,
    pub allow_incoming: bool,
}

#[derive(Serialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
    cty: &'a str,
}

#[derive(Serialize)]
struct Claims<'a> {
    jti: String,
    iss: &'a str,
    sub: &'a str,
    iat: i64,
    nbf: i64,
    exp: i64,
    grants: Grants<'a>,
}

#[derive(Serialize)]
struct Grants<'a> {
    identity: &'a str,
    voice: VoiceGrant<'a>,
}

#[derive(Serialize)]
struct VoiceGrant<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    incoming: Option<IncomingGrant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outgoing: Option<OutgoingGrant<'a>>,
}

#[derive(Serialize)]
struct IncomingGrant {
    allow: bool,
}

#[derive(Serialize)]
struct OutgoingGrant<'a> {
    application_sid: &'a str,
}

impl AccessTokenBuilder {
    /// Sign the token as of `issued_at` (unix seconds).
    pub fn to_jwt(&self, issued_at: i64) -> Result<String, TokenError> {
        if self.account_sid.is_empty() || self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(TokenError::NotConfigured);
        }
        if self.identity.trim().is_empty() {
            return Err(TokenError::EmptyIdentity);
        }

        let expires_at = i64::try_from(self.ttl_secs)
            .ok()
            .and_then(|ttl| issued_at.checked_add(ttl))
            .ok_or(TokenError::InvalidTtl(self.ttl_secs))?;

        let header = Header {
            alg: "HS256",
            typ: "JWT",
            cty: TOKEN_CONTENT_TYPE,
        };
        let claims = Claims {
            jti: format!("{}-{}", self.api_key, issued_at),
            iss: &self.api_key,
            sub: &self.account_sid,
            iat: issued_at,
            nbf: issued_at,
            exp: expires_at,
            grants: Grants {
                identity: &self.identity,
                voice: VoiceGrant {
                    incoming: self.allow_incoming.then_some(IncomingGrant { allow: true }),
                    outgoing: self
                        .outgoing_application_sid
                        .as_deref()
                        .map(|application_sid| OutgoingGrant { application_sid }),
                },
            },
        };

        let header = serde_json::to_vec(&header)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        let claims = serde_json::to_vec(&claims)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }
}
