//! TwiML documents
//!
//! Builders for the voice and messaging response documents Twilio expects
//! from a webhook. Rendering writes straight into a `String`; every text
//! node and attribute value is XML-escaped.

use std::fmt::Write as FmtWrite;

/// Content type for TwiML responses.
pub const CONTENT_TYPE: &str = "text/xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// HTTP method Twilio uses for `action`/`url` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Attributes for `<Say>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SayOptions {
    pub voice: Option<String>,
    pub language: Option<String>,
}

/// Attributes for `<Gather>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherOptions {
    pub num_digits: Option<u32>,
    pub action: Option<String>,
    pub method: Option<Method>,
    pub timeout: Option<u32>,
}

/// Attributes for `<Record>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOptions {
    pub max_length: Option<u32>,
    pub action: Option<String>,
    pub method: Option<Method>,
    pub play_beep: Option<bool>,
}

/// Attributes for `<Conference>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConferenceOptions {
    pub start_conference_on_enter: Option<bool>,
    pub end_conference_on_exit: Option<bool>,
    pub wait_url: Option<String>,
    pub wait_method: Option<Method>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verb {
    Say { text: String, options: SayOptions },
    Gather { options: GatherOptions, children: Vec<Verb> },
    Record(RecordOptions),
    Hangup,
    Redirect { url: String, method: Option<Method> },
    Conference { room: String, options: ConferenceOptions },
    Play { url: String, loop_count: Option<u32> },
    Pause { length: Option<u32> },
    Message { body: String },
}

/// Nested builder handed to [`VoiceResponse::gather`].
#[derive(Debug, Default)]
pub struct Gather {
    children: Vec<Verb>,
    say_options: SayOptions,
}

impl Gather {
    pub fn say(&mut self, text: impl Into<String>) -> &mut Self {
        self.children.push(Verb::Say {
            text: text.into(),
            options: self.say_options.clone(),
        });
        self
    }

    pub fn pause(&mut self, length: u32) -> &mut Self {
        self.children.push(Verb::Pause {
            length: Some(length),
        });
        self
    }
}

/// `<Response>` document for voice webhooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
    say_options: SayOptions,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the given voice/language to every `<Say>` added afterwards.
    pub fn with_say_options(mut self, options: SayOptions) -> Self {
        self.say_options = options;
        self
    }

    pub fn say(&mut self, text: impl Into<String>) -> &mut Self {
        self.verbs.push(Verb::Say {
            text: text.into(),
            options: self.say_options.clone(),
        });
        self
    }

    /// Add a `<Gather>`; nested verbs are added through the closure.
    pub fn gather(
        &mut self,
        options: GatherOptions,
        build: impl FnOnce(&mut Gather),
    ) -> &mut Self {
        let mut gather = Gather {
            children: Vec::new(),
            say_options: self.say_options.clone(),
        };
        build(&mut gather);
        self.verbs.push(Verb::Gather {
            options,
            children: gather.children,
        });
        self
    }

    pub fn record(&mut self, options: RecordOptions) -> &mut Self {
        self.verbs.push(Verb::Record(options));
        self
    }

    pub fn hangup(&mut self) -> &mut Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn redirect(&mut self, url: impl Into<String>, method: Option<Method>) -> &mut Self {
        self.verbs.push(Verb::Redirect {
            url: url.into(),
            method,
        });
        self
    }

    /// `<Dial><Conference>room</Conference></Dial>`
    pub fn dial_conference(
        &mut self,
        room: impl Into<String>,
        options: ConferenceOptions,
    ) -> &mut Self {
        self.verbs.push(Verb::Conference {
            room: room.into(),
            options,
        });
        self
    }

    /// `loop_count` of 0 repeats until the call moves on.
    pub fn play(&mut self, url: impl Into<String>, loop_count: Option<u32>) -> &mut Self {
        self.verbs.push(Verb::Play {
            url: url.into(),
            loop_count,
        });
        self
    }

    pub fn pause(&mut self, length: Option<u32>) -> &mut Self {
        self.verbs.push(Verb::Pause { length });
        self
    }

    pub fn render(&self) -> String {
        render_document(&self.verbs)
    }
}

/// `<Response>` document for messaging webhooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagingResponse {
    verbs: Vec<Verb>,
}

impl MessagingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&mut self, body: impl Into<String>) -> &mut Self {
        self.verbs.push(Verb::Message { body: body.into() });
        self
    }

    pub fn render(&self) -> String {
        render_document(&self.verbs)
    }
}

impl std::fmt::Display for VoiceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::fmt::Display for MessagingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_document(verbs: &[Verb]) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_DECLARATION);
    if verbs.is_empty() {
        out.push_str("<Response/>");
        return out;
    }
    out.push_str("<Response>");
    for verb in verbs {
        render_verb(&mut out, verb);
    }
    out.push_str("</Response>");
    out
}

fn render_verb(out: &mut String, verb: &Verb) {
    match verb {
        Verb::Say { text, options } => {
            let attrs = [
                ("voice", options.voice.clone()),
                ("language", options.language.clone()),
            ];
            element(out, "Say", &attrs, Some(text));
        }
        Verb::Gather { options, children } => {
            let attrs = [
                ("numDigits", options.num_digits.map(|n| n.to_string())),
                ("action", options.action.clone()),
                ("method", options.method.map(|m| m.as_str().to_string())),
                ("timeout", options.timeout.map(|n| n.to_string())),
            ];
            open_tag(out, "Gather", &attrs, children.is_empty());
            if !children.is_empty() {
                for child in children {
                    render_verb(out, child);
                }
                out.push_str("</Gather>");
            }
        }
        Verb::Record(options) => {
            let attrs = [
                ("maxLength", options.max_length.map(|n| n.to_string())),
                ("action", options.action.clone()),
                ("method", options.method.map(|m| m.as_str().to_string())),
                ("playBeep", options.play_beep.map(|b| b.to_string())),
            ];
            element(out, "Record", &attrs, None);
        }
        Verb::Hangup => element(out, "Hangup", &[], None),
        Verb::Redirect { url, method } => {
            let attrs = [("method", method.map(|m| m.as_str().to_string()))];
            element(out, "Redirect", &attrs, Some(url));
        }
        Verb::Conference { room, options } => {
            let attrs = [
                (
                    "startConferenceOnEnter",
                    options.start_conference_on_enter.map(|b| b.to_string()),
                ),
                (
                    "endConferenceOnExit",
                    options.end_conference_on_exit.map(|b| b.to_string()),
                ),
                ("waitUrl", options.wait_url.clone()),
                (
                    "waitMethod",
                    options.wait_method.map(|m| m.as_str().to_string()),
                ),
            ];
            out.push_str("<Dial>");
            element(out, "Conference", &attrs, Some(room));
            out.push_str("</Dial>");
        }
        Verb::Play { url, loop_count } => {
            let attrs = [("loop", loop_count.map(|n| n.to_string()))];
            element(out, "Play", &attrs, Some(url));
        }
        Verb::Pause { length } => {
            let attrs = [("length", length.map(|n| n.to_string()))];
            element(out, "Pause", &attrs, None);
        }
        Verb::Message { body } => element(out, "Message", &[], Some(body)),
    }
}

fn element(out: &mut String, name: &str, attrs: &[(&str, Option<String>)], text: Option<&str>) {
    match text {
        Some(text) => {
            open_tag(out, name, attrs, false);
            out.push_str(&escape(text));
            let _ = write!(out, "</{}>", name);
        }
        None => open_tag(out, name, attrs, true),
    }
}

fn open_tag(out: &mut String, name: &str, attrs: &[(&str, Option<String>)], self_closing: bool) {
    let _ = write!(out, "<{}", name);
    for (key, value) in attrs {
        if let Some(value) = value {
            let _ = write!(out, " {}=\"{}\"", key, escape(value));
        }
    }
    out.push_str(if self_closing { "/>" } else { ">" });
}

/// Escape the five XML special characters.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
