#![no_main]

use libfuzzer_sys::fuzz_target;

use switchboard::server::webhook::WebhookParams;
use switchboard::twilio::{compute_signature, verify_signature};

fuzz_target!(|data: &[u8]| {
    let params = WebhookParams::parse(data);
    let _ = params.get("Body");
    let _ = WebhookParams::from_body(Some("application/json"), data);

    let url = "https://voip.example.com/sms";
    if let Some(signature) = compute_signature("token", url, params.pairs()) {
        assert!(verify_signature("token", url, params.pairs(), &signature));
    }
});
