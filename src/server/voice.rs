//! Voice webhooks
//!
//! Inbound call greeting, the single-level keypad menu, voicemail completion
//! and the conference room with its wait music.

use axum::extract::State;
use tracing::info;

use super::metrics::METRICS;
use super::webhook::{Twiml, WebhookParams};
use super::AppState;
use crate::twiml::{ConferenceOptions, GatherOptions, Method, RecordOptions, VoiceResponse};

pub const VOICE_PATH: &str = "/voice";
pub const HANDLE_INPUT_PATH: &str = "/voice/handle-input";
pub const RECORD_COMPLETE_PATH: &str = "/voice/record-complete";
pub const CONFERENCE_PATH: &str = "/voice-conference";
pub const WAIT_PATH: &str = "/voice-wait";

const GREETING: &str =
    "Hello! You have reached the Twilio VoIP application. How can I help you today?";
const MENU_PROMPT: &str =
    "Press 1 to leave a message, press 2 to speak with support, or press 0 to hang up.";
const GOODBYE: &str = "Thank you for calling. Goodbye!";
const LEAVE_MESSAGE: &str = "Please leave your message after the beep.";
const SUPPORT_CONNECTING: &str = "Connecting you to support. Please hold.";
const SUPPORT_UNAVAILABLE: &str = "Support is currently unavailable. Please try again later.";
const INVALID_OPTION: &str = "Invalid option. Please try again.";
const RECORDING_THANKS: &str =
    "Thank you for your message. We will get back to you soon. Goodbye!";
const CONFERENCE_JOINING: &str = "Joining the conference room.";
const WAIT_PROMPT: &str = "Please wait while we connect you.";

/// Longest voicemail, in seconds.
const MAX_RECORDING_SECS: u32 = 30;

/// Keypad menu choices offered by the greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    LeaveMessage,
    Support,
    HangUp,
    Invalid,
}

impl MenuOption {
    pub fn from_digits(digits: Option<&str>) -> Self {
        match digits {
            Some("1") => MenuOption::LeaveMessage,
            Some("2") => MenuOption::Support,
            Some("0") => MenuOption::HangUp,
            _ => MenuOption::Invalid,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            MenuOption::LeaveMessage => "leave_message",
            MenuOption::Support => "support",
            MenuOption::HangUp => "hang_up",
            MenuOption::Invalid => "invalid",
        }
    }
}

fn log_call(route: &'static str, params: &WebhookParams) {
    METRICS.webhooks_total.inc(&[route]);
    info!(
        route,
        call_sid = params.get("CallSid").unwrap_or("-"),
        from = params.get("From").unwrap_or("-"),
        "voice webhook"
    );
}

/// `POST /voice`: greet the caller and offer the menu.
pub async fn incoming_call(State(state): State<AppState>, params: WebhookParams) -> Twiml {
    log_call(VOICE_PATH, &params);
    Twiml(greeting(state.voice_response()).render())
}

fn greeting(mut twiml: VoiceResponse) -> VoiceResponse {
    twiml
        .say(GREETING)
        .gather(
            GatherOptions {
                num_digits: Some(1),
                action: Some(HANDLE_INPUT_PATH.to_string()),
                method: Some(Method::Post),
                ..GatherOptions::default()
            },
            |gather| {
                gather.say(MENU_PROMPT);
            },
        )
        // Reached only when the caller presses nothing.
        .say(GOODBYE)
        .hangup();
    twiml
}

/// `POST /voice/handle-input`: act on the digit pressed.
pub async fn handle_input(State(state): State<AppState>, params: WebhookParams) -> Twiml {
    log_call(HANDLE_INPUT_PATH, &params);
    let option = MenuOption::from_digits(params.get("Digits"));
    info!(option = option.as_str(), "menu selection");
    Twiml(menu_response(state.voice_response(), option).render())
}

fn menu_response(mut twiml: VoiceResponse, option: MenuOption) -> VoiceResponse {
    match option {
        MenuOption::LeaveMessage => {
            twiml.say(LEAVE_MESSAGE).record(RecordOptions {
                max_length: Some(MAX_RECORDING_SECS),
                action: Some(RECORD_COMPLETE_PATH.to_string()),
                method: Some(Method::Post),
                ..RecordOptions::default()
            });
        }
        MenuOption::Support => {
            // No agent queue exists; callers hear the unavailable notice.
            twiml.say(SUPPORT_CONNECTING).say(SUPPORT_UNAVAILABLE);
        }
        MenuOption::HangUp => {
            twiml.say(GOODBYE).hangup();
        }
        MenuOption::Invalid => {
            twiml
                .say(INVALID_OPTION)
                .redirect(VOICE_PATH, Some(Method::Post));
        }
    }
    twiml
}

/// `POST /voice/record-complete`: thank the caller once the voicemail is saved.
pub async fn record_complete(State(state): State<AppState>, params: WebhookParams) -> Twiml {
    log_call(RECORD_COMPLETE_PATH, &params);
    if let Some(recording_url) = params.get("RecordingUrl") {
        info!(
            recording_url,
            duration_secs = params.get("RecordingDuration").unwrap_or("-"),
            "voicemail recorded"
        );
    }
    let mut twiml = state.voice_response();
    twiml.say(RECORDING_THANKS).hangup();
    Twiml(twiml.render())
}

/// `POST /voice-conference`: drop the caller into the shared room.
pub async fn conference(State(state): State<AppState>, params: WebhookParams) -> Twiml {
    log_call(CONFERENCE_PATH, &params);
    let mut twiml = state.voice_response();
    twiml.say(CONFERENCE_JOINING).dial_conference(
        state.config.conference_room.clone(),
        ConferenceOptions {
            start_conference_on_enter: Some(true),
            end_conference_on_exit: Some(false),
            wait_url: Some(WAIT_PATH.to_string()),
            wait_method: Some(Method::Post),
        },
    );
    Twiml(twiml.render())
}

/// `POST /voice-wait`: hold music while the conference has not started.
pub async fn wait_room(State(state): State<AppState>, params: WebhookParams) -> Twiml {
    log_call(WAIT_PATH, &params);
    let mut twiml = state.voice_response();
    twiml
        .say(WAIT_PROMPT)
        .play(state.config.hold_music_url.clone(), Some(0));
    Twiml(twiml.render())
}
