//! Webhook signature validation
//!
//! Twilio signs each webhook with `X-Twilio-Signature`: the base64 HMAC-SHA1,
//! keyed by the auth token, of the full request URL followed by every POST
//! parameter as `key` + `value`, sorted by key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

type HmacSha1 = Hmac<Sha1>;

fn signing_payload(url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    let mut data = url.to_string();
    for (key, value) in sorted {
        data.push_str(key);
        data.push_str(value);
    }
    data
}

fn signing_mac(auth_token: &str, url: &str, params: &[(String, String)]) -> Option<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).ok()?;
    mac.update(signing_payload(url, params).as_bytes());
    Some(mac)
}

/// Compute the expected signature for a request.
///
/// Returns `None` for an empty auth token, which cannot authenticate anything.
pub fn compute_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
) -> Option<String> {
    if auth_token.is_empty() {
        return None;
    }
    let mac = signing_mac(auth_token, url, params)?;
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check `signature` against the request. Comparison is constant-time.
///
/// Always false when `auth_token` is empty.
pub fn verify_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
    signature: &str,
) -> bool {
    if auth_token.is_empty() {
        return false;
    }
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Some(mac) = signing_mac(auth_token, url, params) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<(String, String)> {
        vec![
            ("CallSid".to_string(), "CA1234567890ABCDE".to_string()),
            ("Caller".to_string(), "+12349013030".to_string()),
            ("Digits".to_string(), "1234".to_string()),
            ("From".to_string(), "+12349013030".to_string()),
            ("To".to_string(), "+18005551212".to_string()),
        ]
    }

    const URL: &str = "https://mycompany.com/myapp.php?foo=1&bar=2";

    // Example from Twilio's security documentation.
    #[test]
    fn test_known_signature() {
        assert_eq!(
            compute_signature("12345", URL, &params()).unwrap(),
            "0/KCTR6DLpKmkAf8muzZqo1nDgQ="
        );
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let mut reversed = params();
        reversed.reverse();
        assert_eq!(
            compute_signature("12345", URL, &params()).unwrap(),
            compute_signature("12345", URL, &reversed).unwrap()
        );
    }

    #[test]
    fn test_verify_accepts_valid() {
        let sig = compute_signature("12345", URL, &params()).unwrap();
        assert!(verify_signature("12345", URL, &params(), &sig));
    }

    #[test]
    fn test_verify_rejects_tampered_params() {
        let sig = compute_signature("12345", URL, &params()).unwrap();
        let mut tampered = params();
        tampered[2].1 = "9999".to_string();
        assert!(!verify_signature("12345", URL, &tampered, &sig));
    }

    #[test]
    fn test_verify_rejects_wrong_token_and_garbage() {
        let sig = compute_signature("12345", URL, &params()).unwrap();
        assert!(!verify_signature("54321", URL, &params(), &sig));
        assert!(!verify_signature("12345", URL, &params(), "not base64!"));
        assert!(!verify_signature("12345", URL, &params(), ""));
    }

    #[test]
    fn test_empty_token_never_signs_or_verifies() {
        assert_eq!(compute_signature("", URL, &params()), None);

        // HMAC-SHA1 keyed with "" over the same payload.
        let mut mac = HmacSha1::new_from_slice(b"").unwrap();
        mac.update(signing_payload(URL, &params()).as_bytes());
        let forged = STANDARD.encode(mac.finalize().into_bytes());
        assert!(!verify_signature("", URL, &params(), &forged));
    }
}
