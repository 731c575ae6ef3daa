#![no_main]

use libfuzzer_sys::fuzz_target;

use switchboard::twiml::{escape, MessagingResponse};

fuzz_target!(|data: &str| {
    let escaped = escape(data);
    assert!(!escaped.contains('<'));
    assert!(!escaped.contains('>'));
    assert!(!escaped.contains('"'));

    let mut twiml = MessagingResponse::new();
    twiml.message(data);
    assert!(twiml.render().ends_with("</Response>"));
});
