//! Twilio Integration
//!
//! REST client, access-token minting and webhook signature validation.

pub mod client;
pub mod signature;
pub mod token;

pub use client::*;
pub use signature::*;
pub use token::*;

use serde::Deserialize;
use thiserror::Error;

/// Error object returned by the Twilio REST API on non-2xx responses.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TwilioApiError {
    #[serde(default)]
    pub code: Option<u32>,
    pub message: String,
    #[serde(default)]
    pub more_info: Option<String>,
    #[serde(default)]
    pub status: u16,
}

/// Twilio module errors
#[derive(Error, Debug)]
pub enum TwilioError {
    #[error("Twilio credentials are not configured")]
    NotConfigured,

    #[error("{}", .0.message)]
    Api(TwilioApiError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from Twilio: {0}")]
    Parse(String),
}

impl TwilioError {
    /// Twilio's numeric error code, when the API supplied one.
    pub fn code(&self) -> Option<u32> {
        match self {
            TwilioError::Api(err) => err.code,
            _ => None,
        }
    }
}

/// Result type for Twilio operations
pub type Result<T> = std::result::Result<T, TwilioError>;
