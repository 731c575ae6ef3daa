//! HTTP server
//!
//! Router, shared state and the serve loop.

pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod outbound;
pub mod sms;
pub mod voice;
pub mod webhook;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::twilio::{TwilioClient, TwilioError};
use crate::twiml::{SayOptions, VoiceResponse};

pub use error::ApiError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("failed to build Twilio client: {0}")]
    Client(#[from] TwilioError),
}

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub twilio: TwilioClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, TwilioError> {
        let twilio = TwilioClient::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            twilio,
        })
    }

    /// Empty voice response carrying the configured TTS voice and language.
    pub fn voice_response(&self) -> VoiceResponse {
        VoiceResponse::new().with_say_options(SayOptions {
            voice: self.config.tts_voice.clone(),
            language: self.config.tts_language.clone(),
        })
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    // Routes Twilio calls back into; signature-checked when enabled.
    let webhooks = Router::new()
        .route(voice::VOICE_PATH, post(voice::incoming_call))
        .route(voice::HANDLE_INPUT_PATH, post(voice::handle_input))
        .route(voice::RECORD_COMPLETE_PATH, post(voice::record_complete))
        .route(voice::CONFERENCE_PATH, post(voice::conference))
        .route(voice::WAIT_PATH, post(voice::wait_room))
        .route(sms::SMS_PATH, post(sms::incoming_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            webhook::verify_twilio_signature,
        ));

    Router::new()
        .route("/", get(diagnostics::root))
        .route("/health", get(diagnostics::health))
        .route("/debug", get(diagnostics::debug))
        .route("/test-twilio", get(diagnostics::test_twilio))
        .route("/get-token", get(diagnostics::get_token))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/make-call", post(outbound::make_call))
        .route("/send-sms", post(outbound::send_sms))
        .route("/favicon.ico", get(diagnostics::no_content))
        .route(
            "/.well-known/appspecific/com.chrome.devtools.json",
            get(diagnostics::no_content),
        )
        .merge(webhooks)
        .fallback(diagnostics::handler_404)
        .with_state(state)
}

/// Bind and serve until Ctrl-C / SIGTERM.
pub async fn run(config: Config) -> Result<(), ServerError> {
    for problem in config.validate() {
        warn!("{}", problem);
    }

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;

    let phone_number = if config.phone_number.is_empty() {
        "<unset>".to_string()
    } else {
        config.phone_number.clone()
    };
    let state = AppState::new(config)?;

    info!("switchboard listening on {}", local_addr);
    info!("Twilio phone number: {}", phone_number);
    info!("Voice webhook: http://{}{}", local_addr, voice::VOICE_PATH);
    info!("SMS webhook: http://{}{}", local_addr, sms::SMS_PATH);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("switchboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
