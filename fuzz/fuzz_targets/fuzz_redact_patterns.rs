#![no_main]

use libfuzzer_sys::fuzz_target;

use switchboard::logging::sanitize_log_message;

fuzz_target!(|data: &str| {
    // Catastrophic backtracking shows up as a libFuzzer timeout.
    let _ = sanitize_log_message(data);
});
