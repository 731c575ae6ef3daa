use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use switchboard::cli::{self, Cli, Command, ConfigCommand};
use switchboard::config::Config;
use switchboard::{logging, server};

#[tokio::main]
async fn main() -> ExitCode {
    let command = Cli::parse().command();

    match command {
        Command::Version => {
            cli::handle_version();
            ExitCode::SUCCESS
        }
        Command::Status { host, port } => match cli::handle_status(&host, port).await {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("status failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Config(sub) => {
            let config = match Config::load() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("configuration error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let ok = match sub {
                ConfigCommand::Show => match cli::handle_config_show(&config) {
                    Ok(()) => true,
                    Err(e) => {
                        eprintln!("{}", e);
                        false
                    }
                },
                ConfigCommand::Check => cli::handle_config_check(&config),
            };
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Serve { port, host } => {
            let config = match Config::load() {
                Ok(config) => cli::apply_overrides(config, port, host),
                Err(e) => {
                    eprintln!("configuration error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            if let Err(e) = logging::init_logging(config.log_format) {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
            match server::run(config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
