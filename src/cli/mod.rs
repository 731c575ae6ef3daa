//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `serve` (default) -- start the webhook server
//! - `config show|check` -- inspect the loaded configuration
//! - `status` -- query a running instance's health endpoint
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::{Config, DEFAULT_PORT};

/// Twilio voice and SMS webhook server.
#[derive(Parser, Debug)]
#[command(
    name = "switchboard",
    version = env!("CARGO_PKG_VERSION"),
    about = "Webhook server for Twilio voice calls and SMS"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the webhook server (default when no subcommand is given).
    Serve {
        /// Listen port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (overrides HOST).
        #[arg(long)]
        host: Option<IpAddr>,
    },

    /// Inspect the configuration loaded from the environment and `.env`.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Query a running instance's health endpoint.
    Status {
        /// Port of the running instance (default: PORT or 3000).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host of the running instance.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the configuration (secrets redacted) as JSON.
    Show,

    /// Report missing Twilio settings; exits non-zero if any.
    Check,
}

impl Cli {
    /// The subcommand to run, defaulting to `serve`.
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Serve {
            port: None,
            host: None,
        })
    }
}

/// Apply `serve` flag overrides on top of the loaded configuration.
pub fn apply_overrides(mut config: Config, port: Option<u16>, host: Option<IpAddr>) -> Config {
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(host) = host {
        config.host = host;
    }
    config
}

/// Run the `config show` subcommand.
pub fn handle_config_show(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}

/// Run the `config check` subcommand. Returns whether the configuration is complete.
pub fn handle_config_check(config: &Config) -> bool {
    let problems = config.validate();
    if problems.is_empty() {
        println!("Configuration OK");
        if !config.can_mint_tokens() {
            println!("  note: TWILIO_API_KEY / TWILIO_API_SECRET unset, /get-token disabled");
        }
        return true;
    }
    for problem in &problems {
        eprintln!("  - {}", problem);
    }
    false
}

/// Run the `status` subcommand -- connect to a running instance's health endpoint.
pub async fn handle_status(
    host: &str,
    port: Option<u16>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let port = port
        .or_else(|| Config::load().ok().map(|c| c.port))
        .unwrap_or(DEFAULT_PORT);
    let url = format!("http://{}:{}/health", host, port);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Could not connect to switchboard at {}:{}", host, port);
            eprintln!("  Error: {}", e);
            eprintln!();
            eprintln!("Is the server running? Start it with: switchboard serve");
            return Ok(false);
        }
    };

    if !response.status().is_success() {
        eprintln!("Health endpoint returned HTTP {}", response.status());
        return Ok(false);
    }

    let body: Value = response.json().await?;
    println!("switchboard status");
    println!("==================");
    println!("  Address:   {}:{}", host, port);
    if let Some(status) = body.get("status").and_then(|v| v.as_str()) {
        println!("  Status:    {}", status);
    }
    if let Some(ts) = body.get("timestamp").and_then(|v| v.as_str()) {
        println!("  Timestamp: {}", ts);
    }
    Ok(true)
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("switchboard {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("SWITCHBOARD_BUILD_DATE"));
    println!("  Git commit: {}", env!("SWITCHBOARD_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
