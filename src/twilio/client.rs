//! Twilio REST client
//!
//! Thin wrapper over the 2010-04-01 API: form-encoded requests, basic auth
//! with the account SID and auth token, JSON responses.

use super::{Result, TwilioApiError, TwilioError};
use crate::config::Config;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "2010-04-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Call resource as returned by `Calls.json`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CallResource {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

/// Message resource as returned by `Messages.json`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MessageResource {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Account resource as returned by `Accounts/{sid}.json`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AccountResource {
    pub sid: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
}

/// Twilio client for API calls
#[derive(Debug, Clone)]
pub struct TwilioClient {
    account_sid: String,
    auth_token: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl TwilioClient {
    /// Create a new Twilio client against `base_url` (normally `https://api.twilio.com`).
    pub fn new(account_sid: &str, auth_token: &str, base_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.account_sid, &config.auth_token, &config.api_base_url)
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty()
    }

    /// URL of a resource under the account, e.g. `Calls.json`.
    fn account_url(&self, resource: &str) -> String {
        format!(
            "{}/{}/Accounts/{}/{}",
            self.base_url, API_VERSION, self.account_sid, resource
        )
    }

    /// Place an outbound call; Twilio fetches TwiML from `url` once answered.
    pub async fn create_call(&self, to: &str, from: &str, url: &str) -> Result<CallResource> {
        let params = [("To", to), ("From", from), ("Url", url)];
        debug!(to = %to, from = %from, "creating call");
        self.send(self.post("Calls.json")?.form(&params)).await
    }

    /// Send an SMS.
    pub async fn send_message(&self, to: &str, from: &str, body: &str) -> Result<MessageResource> {
        let params = [("To", to), ("From", from), ("Body", body)];
        debug!(to = %to, from = %from, "sending message");
        self.send(self.post("Messages.json")?.form(&params)).await
    }

    /// Fetch the account, which doubles as a credential check.
    pub async fn fetch_account(&self) -> Result<AccountResource> {
        if !self.is_configured() {
            return Err(TwilioError::NotConfigured);
        }
        let url = format!(
            "{}/{}/Accounts/{}.json",
            self.base_url, API_VERSION, self.account_sid
        );
        let request = self
            .http_client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token));
        self.send(request).await
    }

    fn post(&self, resource: &str) -> Result<RequestBuilder> {
        if !self.is_configured() {
            return Err(TwilioError::NotConfigured);
        }
        Ok(self
            .http_client
            .post(self.account_url(resource))
            .basic_auth(&self.account_sid, Some(&self.auth_token)))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TwilioError::Api(decode_api_error(status, &body)));
        }

        serde_json::from_str(&body).map_err(|e| TwilioError::Parse(e.to_string()))
    }
}

/// Decode Twilio's error object, falling back to the bare HTTP status.
fn decode_api_error(status: StatusCode, body: &str) -> TwilioApiError {
    serde_json::from_str::<TwilioApiError>(body).unwrap_or_else(|_| TwilioApiError {
        code: None,
        message: format!("Twilio API returned HTTP {}", status.as_u16()),
        more_info: None,
        status: status.as_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_url() {
        let client = TwilioClient::new("AC123", "token", "https://api.twilio.com/").unwrap();
        assert_eq!(
            client.account_url("Calls.json"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Calls.json"
        );
    }

    #[test]
    fn test_decode_api_error() {
        let err = decode_api_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":21211,"message":"Invalid 'To' Phone Number","more_info":"https://www.twilio.com/docs/errors/21211","status":400}"#,
        );
        assert_eq!(err.code, Some(21211));
        assert_eq!(err.message, "Invalid 'To' Phone Number");
    }

    #[test]
    fn test_decode_api_error_fallback() {
        let err = decode_api_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.status, 502);
        assert_eq!(err.message, "Twilio API returned HTTP 502");
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses_requests() {
        let client = TwilioClient::new("", "", "https://api.twilio.com").unwrap();
        let err = client
            .send_message("+15550001111", "+15550002222", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, TwilioError::NotConfigured));
        assert!(matches!(
            client.fetch_account().await,
            Err(TwilioError::NotConfigured)
        ));
    }

    #[test]
    fn test_account_resource_type_field() {
        let account: AccountResource = serde_json::from_str(
            r#"{"sid":"AC1","friendly_name":"Main","status":"active","type":"Trial"}"#,
        )
        .unwrap();
        assert_eq!(account.account_type.as_deref(), Some("Trial"));
    }
}
