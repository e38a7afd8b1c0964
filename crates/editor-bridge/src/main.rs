//! editor-bridge: entry point.
//!
//! Runs a [`Bridge`] between a host application and a companion editor.
//! The host connects to the inbound port; the bridge dials the editor on the
//! outbound port and keeps that link alive.
//!
//! # Usage
//!
//! ```text
//! editor-bridge --inbound-port <PORT> --outbound-port <PORT> [OPTIONS]
//!
//! Options:
//!   --app-name          <NAME>  Name attached to log events [default: editor-bridge]
//!   --retry-interval-ms <MS>    Delay between reconnect attempts [default: 3000]
//!   --max-attempts      <N>     Reconnect attempts before giving up [default: 5]
//!   --fetch-timeout-ms  <MS>    Deadline for one fetch exchange [default: 5000]
//! ```
//!
//! | Variable                          | Default         |
//! |-----------------------------------|-----------------|
//! | `EDITOR_BRIDGE_APP_NAME`          | `editor-bridge` |
//! | `EDITOR_BRIDGE_INBOUND_PORT`      | (required)      |
//! | `EDITOR_BRIDGE_OUTBOUND_PORT`     | (required)      |
//! | `EDITOR_BRIDGE_RETRY_INTERVAL_MS` | `3000`          |
//! | `EDITOR_BRIDGE_MAX_ATTEMPTS`      | `5`             |
//! | `EDITOR_BRIDGE_FETCH_TIMEOUT_MS`  | `5000`          |
//!
//! # Console
//!
//! While running, lines typed on stdin are relayed to the editor:
//!
//! ```text
//! notify Build finished
//! eval (message "hello")
//! fetch user-full-name
//! status
//! ```
//!
//! `fetch` prints the reply on stdout; `status` prints the editor link state
//! and whether the host listener is still serving.  Ctrl+C stops the bridge.

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use editor_bridge::{Bridge, BridgeConfig, MessageHandler};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// WebSocket relay between a host application and a companion editor.
#[derive(Debug, Parser)]
#[command(
    name = "editor-bridge",
    about = "WebSocket relay between a host application and a companion editor",
    version
)]
struct Cli {
    /// Name attached to every log event.
    #[arg(long, default_value = "editor-bridge", env = "EDITOR_BRIDGE_APP_NAME")]
    app_name: String,

    /// Loopback port the host application connects to.
    #[arg(long, env = "EDITOR_BRIDGE_INBOUND_PORT")]
    inbound_port: u16,

    /// Loopback port of the editor's WebSocket server.
    #[arg(long, env = "EDITOR_BRIDGE_OUTBOUND_PORT")]
    outbound_port: u16,

    /// Fixed delay between reconnect attempts, in milliseconds.
    #[arg(long, default_value_t = 3000, env = "EDITOR_BRIDGE_RETRY_INTERVAL_MS")]
    retry_interval_ms: u64,

    /// Reconnect attempts before the editor link gives up.
    #[arg(long, default_value_t = 5, env = "EDITOR_BRIDGE_MAX_ATTEMPTS")]
    max_attempts: u32,

    /// Deadline for one fetch exchange, in milliseconds.
    #[arg(long, default_value_t = 5000, env = "EDITOR_BRIDGE_FETCH_TIMEOUT_MS")]
    fetch_timeout_ms: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--app-name` is empty or only whitespace.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        if self.app_name.trim().is_empty() {
            anyhow::bail!("--app-name must not be empty");
        }

        let mut config = BridgeConfig::new(self.app_name, self.inbound_port, self.outbound_port);
        config.retry_interval = Duration::from_millis(self.retry_interval_ms);
        config.max_attempts = self.max_attempts;
        config.fetch_timeout = Duration::from_millis(self.fetch_timeout_ms);
        Ok(config)
    }
}

// ── Console relay ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Notify(String),
    Eval(String),
    Fetch(String),
    Status,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum ConsoleError {
    #[error("unknown command '{0}' (expected notify, eval, fetch or status)")]
    UnknownCommand(String),
    #[error("fetch needs a variable name")]
    MissingName,
}

/// Parses one console line.  Blank lines yield `Ok(None)`.
fn parse_console_line(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line, ""),
    };

    match verb {
        "notify" => Ok(Some(ConsoleCommand::Notify(rest.to_string()))),
        "eval" => Ok(Some(ConsoleCommand::Eval(rest.to_string()))),
        "fetch" if rest.is_empty() => Err(ConsoleError::MissingName),
        "fetch" => Ok(Some(ConsoleCommand::Fetch(rest.to_string()))),
        "status" => Ok(Some(ConsoleCommand::Status)),
        other => Err(ConsoleError::UnknownCommand(other.to_string())),
    }
}

/// Reads stdin on a dedicated OS thread.
///
/// A blocking stdin read cannot be cancelled, so it stays off the runtime;
/// the thread simply dies with the process.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn run_console(bridge: Arc<Bridge>, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        match parse_console_line(&line) {
            Ok(Some(command)) => relay(&bridge, command).await,
            Ok(None) => {}
            Err(e) => warn!("{e}"),
        }
    }
    debug!("stdin closed; console relay stopped");
}

async fn relay(bridge: &Bridge, command: ConsoleCommand) {
    let result = match command {
        ConsoleCommand::Notify(text) => bridge.notify(&text).await.map(|()| None),
        ConsoleCommand::Eval(code) => bridge.eval_remote(&code).await.map(|()| None),
        ConsoleCommand::Fetch(name) => bridge.fetch_var(&name).await.map(Some),
        ConsoleCommand::Status => {
            let link = bridge.link_status();
            Ok(Some(format!(
                "editor link {} (attempts {}), host listener {}",
                link.state,
                link.attempts,
                if bridge.is_listening() { "up" } else { "stopped" }
            )))
        }
    };

    match result {
        Ok(Some(value)) => println!("{value}"),
        Ok(None) => {}
        Err(e) => warn!("console command failed: {e}"),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity; default to `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_bridge_config()?;

    info!(
        "editor bridge starting — app={}, inbound=127.0.0.1:{}, editor={}",
        config.app_name,
        config.inbound_port,
        config.outbound_url()
    );

    let handler: MessageHandler = Arc::new(|payload: String| info!("received from host: {payload}"));
    let bridge = Bridge::start_with_tracing(config, handler)
        .await
        .context("failed to start bridge")?;
    let bridge = Arc::new(bridge);

    let console = tokio::spawn(run_console(Arc::clone(&bridge), spawn_stdin_reader()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C — shutting down");

    console.abort();
    bridge.close().await;

    info!("editor bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 5] = [
        "editor-bridge",
        "--inbound-port",
        "9100",
        "--outbound-port",
        "9200",
    ];

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(REQUIRED);

        // Assert
        assert_eq!(cli.app_name, "editor-bridge");
        assert_eq!(cli.retry_interval_ms, 3000);
        assert_eq!(cli.max_attempts, 5);
        assert_eq!(cli.fetch_timeout_ms, 5000);
    }

    #[test]
    fn test_cli_requires_ports() {
        let result = Cli::try_parse_from(["editor-bridge", "--inbound-port", "9100"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "editor-bridge",
            "--app-name",
            "notes",
            "--inbound-port",
            "1",
            "--outbound-port",
            "2",
            "--retry-interval-ms",
            "10",
            "--max-attempts",
            "2",
            "--fetch-timeout-ms",
            "250",
        ]);
        assert_eq!(cli.app_name, "notes");
        assert_eq!(cli.retry_interval_ms, 10);
        assert_eq!(cli.max_attempts, 2);
        assert_eq!(cli.fetch_timeout_ms, 250);
    }

    #[test]
    fn test_into_bridge_config_maps_every_field() {
        let cli = Cli::parse_from(REQUIRED);

        let config = cli.into_bridge_config().unwrap();

        assert_eq!(config.inbound_port, 9100);
        assert_eq!(config.outbound_port, 9200);
        assert_eq!(config.retry_interval, Duration::from_millis(3000));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.fetch_timeout, Duration::from_millis(5000));
        assert_eq!(config.outbound_url(), "ws://127.0.0.1:9200");
    }

    #[test]
    fn test_into_bridge_config_rejects_blank_app_name() {
        let cli = Cli {
            app_name: "  ".to_string(),
            inbound_port: 1,
            outbound_port: 2,
            retry_interval_ms: 3000,
            max_attempts: 5,
            fetch_timeout_ms: 5000,
        };

        assert!(cli.into_bridge_config().is_err());
    }

    #[test]
    fn test_parse_notify_keeps_rest_of_line() {
        assert_eq!(
            parse_console_line("notify  Build finished in 3s"),
            Ok(Some(ConsoleCommand::Notify("Build finished in 3s".to_string())))
        );
    }

    #[test]
    fn test_parse_eval_keeps_inner_spacing() {
        assert_eq!(
            parse_console_line("eval (message  \"hi\")"),
            Ok(Some(ConsoleCommand::Eval("(message  \"hi\")".to_string())))
        );
    }

    #[test]
    fn test_parse_notify_without_text_is_empty_content() {
        assert_eq!(
            parse_console_line("notify"),
            Ok(Some(ConsoleCommand::Notify(String::new())))
        );
    }

    #[test]
    fn test_parse_fetch() {
        assert_eq!(
            parse_console_line("fetch user-full-name"),
            Ok(Some(ConsoleCommand::Fetch("user-full-name".to_string())))
        );
    }

    #[test]
    fn test_parse_fetch_without_name_is_error() {
        assert_eq!(parse_console_line("fetch   "), Err(ConsoleError::MissingName));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_console_line(" status "), Ok(Some(ConsoleCommand::Status)));
    }

    #[test]
    fn test_parse_blank_line_is_ignored() {
        assert_eq!(parse_console_line("   "), Ok(None));
    }

    #[test]
    fn test_parse_unknown_verb_is_error() {
        assert_eq!(
            parse_console_line("open file.txt"),
            Err(ConsoleError::UnknownCommand("open".to_string()))
        );
    }
}
