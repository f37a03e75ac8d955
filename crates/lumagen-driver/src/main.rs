//! lumagen-driver entry point.
//!
//! Loads the device list, starts one session per processor, and reads entity
//! commands from stdin until EOF or Ctrl+C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()               -- TOML file, defaults if absent
//!  └─ SessionRegistry             -- one Session per configured device
//!       └─ MockTransport::simulated  (stands in for the wire codec)
//!  └─ connect_all()
//!       └─ publish_initial_attributes()  per session
//!  └─ stdin loop                  -- "<entity_id> <cmd_id> [json]" → StatusCode
//!  └─ disconnect_all()
//! ```
//!
//! # Command lines (for beginners)
//!
//! Each stdin line is one request, for example:
//!
//! ```text
//! media_player.1018009022 on
//! media_player.1018009022 select_source {"source": "Blu-ray"}
//! remote.1018009022 send_cmd {"command": "2.35"}
//! ```
//!
//! The reply is the status code, e.g. `200 OK` or `404 NOT_FOUND`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lumagen_core::{CommandRegistry, StatusCode};
use lumagen_driver::application::intake::CommandIntake;
use lumagen_driver::application::registry::SessionRegistry;
use lumagen_driver::application::session::{Session, SessionSettings};
use lumagen_driver::infrastructure::publish::PublishedAttributes;
use lumagen_driver::infrastructure::storage::config::load_config;
use lumagen_driver::infrastructure::transport::mock::MockTransport;

/// Input labels reported by the simulated processors.
const SIMULATED_LABELS: [&str; 4] = ["Apple TV", "Blu-ray", "Kaleidescape", "Xbox"];

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Control-plane driver for Lumagen Radiance video processors.
#[derive(Debug, Parser)]
#[command(name = "lumagen-driver", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "lumagen.toml", env = "LUMAGEN_CONFIG")]
    config: PathBuf,

    /// Log level used when `RUST_LOG` is unset; overrides the config file.
    #[arg(long, env = "LUMAGEN_LOG_LEVEL")]
    log_level: Option<String>,
}

/// One parsed stdin request.
#[derive(Debug, PartialEq)]
struct CommandLine {
    entity_id: String,
    cmd_id: String,
    params: Option<Value>,
}

/// Parses `<entity_id> <cmd_id> [json]`.  Blank lines and `#` comments
/// yield `Ok(None)`.
fn parse_command_line(line: &str) -> anyhow::Result<Option<CommandLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (entity_id, rest) = line
        .split_once(char::is_whitespace)
        .with_context(|| format!("missing command id in {line:?}"))?;
    let rest = rest.trim_start();
    let (cmd_id, json) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let params = match json.trim() {
        "" => None,
        json => Some(serde_json::from_str(json).with_context(|| format!("invalid JSON params: {json}"))?),
    };

    Ok(Some(CommandLine {
        entity_id: entity_id.to_string(),
        cmd_id: cmd_id.to_string(),
        params,
    }))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = load_config(&cli.config);

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins, then `--log-level`, then the config file.
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|cfg| cfg.driver.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .init();

    let config = loaded.with_context(|| format!("loading {}", cli.config.display()))?;
    info!("lumagen-driver starting with {} device(s)", config.devices.len());
    if config.devices.is_empty() {
        warn!("no devices configured in {}", cli.config.display());
    }

    // ── Sessions ──────────────────────────────────────────────────────────────
    let commands = Arc::new(CommandRegistry::standard());
    let attributes = Arc::new(PublishedAttributes::new());
    let settings = SessionSettings::from(&config.driver);
    let labels: Vec<String> = SIMULATED_LABELS.map(String::from).to_vec();

    let mut registry = SessionRegistry::new();
    for device in config.device_infos() {
        let transport = Arc::new(MockTransport::simulated(labels.clone()));
        info!("registering {device}");
        registry.register(Session::new(
            &device,
            transport,
            Arc::clone(&commands),
            attributes.clone(),
            settings,
        ));
    }

    for (device_id, result) in registry.connect_all().await {
        if let Err(e) = result {
            error!(device = %device_id, "initial connect failed: {e}");
        }
        if let Some(session) = registry.get(&device_id) {
            session.publish_initial_attributes().await;
            info!(device = %device_id, "{} remote commands available", session.simple_commands().len());
        }
    }

    let registry = Arc::new(RwLock::new(registry));
    let intake = CommandIntake::new(Arc::clone(&registry));

    // ── Command loop ──────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("received Ctrl+C, shutting down"),
                    Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
                }
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    info!("stdin closed, shutting down");
                    break;
                };
                let status = match parse_command_line(&line) {
                    Ok(Some(request)) => {
                        intake
                            .handle(&request.entity_id, &request.cmd_id, request.params.as_ref())
                            .await
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("{e:#}");
                        StatusCode::BadRequest
                    }
                };
                println!("{status}");
            }
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    registry.read().await.disconnect_all().await;
    info!("lumagen-driver stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["lumagen-driver"]);
        assert_eq!(cli.config, PathBuf::from("lumagen.toml"));
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["lumagen-driver", "--config", "/etc/lumagen.toml", "--log-level", "debug"]);
        assert_eq!(cli.config, PathBuf::from("/etc/lumagen.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_command_line_with_params() {
        let parsed = parse_command_line(r#"remote.1018009022 send_cmd {"command": "MENU"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            CommandLine {
                entity_id: "remote.1018009022".to_string(),
                cmd_id: "send_cmd".to_string(),
                params: Some(json!({"command": "MENU"})),
            }
        );
    }

    #[test]
    fn test_parse_command_line_without_params() {
        let parsed = parse_command_line("  media_player.x on  ").unwrap().unwrap();
        assert_eq!(parsed.cmd_id, "on");
        assert!(parsed.params.is_none());
    }

    #[test]
    fn test_parse_command_line_skips_blank_and_comments() {
        assert!(parse_command_line("").unwrap().is_none());
        assert!(parse_command_line("# power on").unwrap().is_none());
    }

    #[test]
    fn test_parse_command_line_rejects_bad_input() {
        assert!(parse_command_line("media_player.x").is_err());
        assert!(parse_command_line("media_player.x on {not json").is_err());
    }
}
