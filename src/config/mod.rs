//! Runtime configuration
//!
//! Settings come from the process environment, with an optional `.env` file
//! merged in first. Provider credentials may be absent; the server still
//! starts and the endpoints that need them report the problem per request.

use serde_json::{json, Value};
use std::net::IpAddr;
use thiserror::Error;

/// Default Twilio REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default hold music for the conference wait room.
pub const DEFAULT_HOLD_MUSIC_URL: &str =
    "http://com.twilio.music.classical.s3.amazonaws.com/BusyStrings.mp3";

/// Longest access token lifetime Twilio accepts (24 hours).
pub const MAX_TOKEN_TTL_SECS: u64 = 86_400;

const REDACTED: &str = "[REDACTED]";

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("failed to load .env: {0}")]
    DotEnv(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Bind address
    pub host: IpAddr,
    /// Listen port
    pub port: u16,
    /// Twilio account SID
    pub account_sid: String,
    /// Twilio auth token
    pub auth_token: String,
    /// Twilio phone number used as caller ID and SMS sender
    pub phone_number: String,
    /// API key SID used to sign access tokens
    pub api_key: String,
    /// API key secret used to sign access tokens
    pub api_secret: String,
    /// TwiML application SID for client outgoing calls
    pub twiml_app_sid: Option<String>,
    /// Twilio REST base URL
    pub api_base_url: String,
    /// Public URL of this server, used for callback URLs and signature checks
    pub public_base_url: Option<String>,
    /// Reject webhooks without a valid `X-Twilio-Signature`
    pub verify_signatures: bool,
    /// `<Say voice="...">`
    pub tts_voice: Option<String>,
    /// `<Say language="...">`
    pub tts_language: Option<String>,
    /// Conference room joined by `/voice-conference`
    pub conference_room: String,
    /// Audio played in the conference wait room
    pub hold_music_url: String,
    /// Access token lifetime in seconds
    pub token_ttl_secs: u64,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            account_sid: String::new(),
            auth_token: String::new(),
            phone_number: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            twiml_app_sid: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            public_base_url: None,
            verify_signatures: false,
            tts_voice: None,
            tts_language: None,
            conference_room: "switchboard-room".to_string(),
            hold_music_url: DEFAULT_HOLD_MUSIC_URL.to_string(),
            token_ttl_secs: 3600,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        check_dotenv(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let host = match get("HOST") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HOST",
                value: raw,
                reason: "expected an IP address",
            })?,
            None => defaults.host,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
                reason: "expected a port number",
            })?,
            None => defaults.port,
        };

        let verify_signatures = match get("TWILIO_VERIFY_SIGNATURES") {
            Some(raw) => parse_bool("TWILIO_VERIFY_SIGNATURES", raw)?,
            None => defaults.verify_signatures,
        };

        let token_ttl_secs = match get("TOKEN_TTL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if (1..=MAX_TOKEN_TTL_SECS).contains(&n) => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "TOKEN_TTL_SECS",
                        value: raw,
                        reason: "expected 1 to 86400 seconds",
                    })
                }
            },
            None => defaults.token_ttl_secs,
        };

        let log_format = match get("LOG_FORMAT").map(|s| s.to_ascii_lowercase()) {
            None => defaults.log_format,
            Some(s) if s == "text" => LogFormat::Text,
            Some(s) if s == "json" => LogFormat::Json,
            Some(s) => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT",
                    value: s,
                    reason: "expected \"text\" or \"json\"",
                })
            }
        };

        Ok(Self {
            host,
            port,
            account_sid: get("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            auth_token: get("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            phone_number: get("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            api_key: get("TWILIO_API_KEY").unwrap_or_default(),
            api_secret: get("TWILIO_API_SECRET").unwrap_or_default(),
            twiml_app_sid: get("TWILIO_TWIML_APP_SID"),
            api_base_url: get("TWILIO_API_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            public_base_url: get("PUBLIC_BASE_URL").map(|s| s.trim_end_matches('/').to_string()),
            verify_signatures,
            tts_voice: get("TWILIO_TTS_VOICE"),
            tts_language: get("TWILIO_TTS_LANGUAGE"),
            conference_room: get("CONFERENCE_ROOM").unwrap_or(defaults.conference_room),
            hold_music_url: get("HOLD_MUSIC_URL").unwrap_or(defaults.hold_music_url),
            token_ttl_secs,
            log_format,
        })
    }

    /// List everything that prevents the provider integration from working.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.account_sid.is_empty() {
            problems.push("Twilio account SID is required (TWILIO_ACCOUNT_SID)".to_string());
        }
        if self.auth_token.is_empty() {
            problems.push("Twilio auth token is required (TWILIO_AUTH_TOKEN)".to_string());
        }
        if self.phone_number.is_empty() {
            problems.push("Twilio phone number is required (TWILIO_PHONE_NUMBER)".to_string());
        }
        if self.verify_signatures && self.auth_token.is_empty() {
            problems.push("signature verification needs TWILIO_AUTH_TOKEN".to_string());
        }
        problems
    }

    /// Whether outbound calls and SMS can be placed.
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.phone_number.is_empty()
    }

    /// Whether access tokens can be minted.
    pub fn can_mint_tokens(&self) -> bool {
        !self.account_sid.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// JSON view of the configuration with secrets replaced.
    pub fn redacted(&self) -> Value {
        let secret = |s: &str| {
            if s.is_empty() {
                Value::Null
            } else {
                Value::String(REDACTED.to_string())
            }
        };
        json!({
            "host": self.host.to_string(),
            "port": self.port,
            "accountSid": mask_sid(&self.account_sid),
            "authToken": secret(&self.auth_token),
            "phoneNumber": self.phone_number,
            "apiKey": mask_sid(&self.api_key),
            "apiSecret": secret(&self.api_secret),
            "twimlAppSid": self.twiml_app_sid,
            "apiBaseUrl": self.api_base_url,
            "publicBaseUrl": self.public_base_url,
            "verifySignatures": self.verify_signatures,
            "ttsVoice": self.tts_voice,
            "ttsLanguage": self.tts_language,
            "conferenceRoom": self.conference_room,
            "holdMusicUrl": self.hold_music_url,
            "tokenTtlSecs": self.token_ttl_secs,
            "logFormat": match self.log_format {
                LogFormat::Text => "text",
                LogFormat::Json => "json",
            },
        })
    }
}

/// A missing `.env` is the normal production case; anything else is fatal.
fn check_dotenv<T>(result: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::DotEnv(e.to_string())),
    }
}

fn parse_bool(key: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "expected a boolean",
        }),
    }
}

/// Keep the SID prefix and last four characters, e.g. `AC…1234`.
fn mask_sid(sid: &str) -> Value {
    if sid.is_empty() {
        return Value::Null;
    }
    let chars: Vec<char> = sid.chars().collect();
    if chars.len() <= 6 {
        return Value::String(REDACTED.to_string());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    Value::String(format!("{}…{}", head, tail))
}
