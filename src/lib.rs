//! switchboard
//!
//! Webhook server for Twilio voice calls and SMS. Answers inbound calls
//! with a keypad menu, auto-replies to texts, and proxies outbound calls and
//! messages to the Twilio REST API.

pub mod cli;
pub mod config;
pub mod logging;
pub mod server;
pub mod twilio;
pub mod twiml;
