//! Application orchestrator: runs the connection manager, reports status
//! changes, and turns stdin lines into app commands.

use std::path::{Path, PathBuf};

use proclaim_connection::{ConnectionManager, OverallStatus, StatusReport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::config::Config;

/// A line typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Send an app command, optionally with a numeric index.
    Command { name: String, index: Option<u32> },
    /// Go on air when off air and vice versa.
    Toggle,
    /// Print the current state.
    Status,
    /// Re-read the configuration file.
    Reload,
    Quit,
}

impl Input {
    /// Parses one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(None);
        };

        let input = match first {
            "toggle" => Self::Toggle,
            "status" => Self::Status,
            "reload" => Self::Reload,
            "quit" | "exit" => Self::Quit,
            name => {
                let index = match words.next() {
                    Some(raw) => Some(
                        raw.parse::<u32>()
                            .map_err(|_| format!("index must be a number, got '{raw}'"))?,
                    ),
                    None => None,
                };
                Self::Command {
                    name: name.to_string(),
                    index,
                }
            }
        };

        if words.next().is_some() {
            return Err(format!("too many arguments: {line}"));
        }
        Ok(Some(input))
    }
}

/// Runs the bridge until Ctrl-C, `quit`, or end of input.
pub async fn run(config: Config, config_path: PathBuf) -> anyhow::Result<()> {
    let manager = ConnectionManager::new(config.to_control())?;
    let reporter = tokio::spawn(report_status(manager.subscribe()));
    manager.start().await;
    tracing::info!("bridge ready; type an app command, 'toggle', 'status', 'reload' or 'quit'");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received, shutting down");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("stdin closed, shutting down");
            break;
        };

        match Input::parse(&line) {
            Ok(None) => {}
            Ok(Some(Input::Quit)) => break,
            Ok(Some(input)) => handle(&manager, input, &config_path).await,
            Err(e) => tracing::warn!("{e}"),
        }
    }

    manager.on_shutdown();
    reporter.abort();
    Ok(())
}

async fn handle(manager: &ConnectionManager, input: Input, config_path: &Path) {
    match input {
        Input::Command { name, index } => manager.send_command(&name, index).await,
        Input::Toggle => manager.toggle_on_air().await,
        Input::Status => {
            let (state, status) = manager.snapshot();
            tracing::info!(
                status = ?status,
                on_air = state.on_air,
                session = %state.on_air_session_id,
                reachable = state.last_probe_succeeded,
                authenticated = state.auth_succeeded,
                "current state"
            );
        }
        Input::Reload => match Config::load_from(config_path) {
            Ok(config) => {
                tracing::info!(host = %config.host, "configuration reloaded");
                manager.on_config_updated(config.to_control()).await;
            }
            Err(e) => tracing::warn!("configuration not reloaded: {e}"),
        },
        Input::Quit => {}
    }
}

/// Logs status and on-air transitions.
///
/// The manager reports after every recomputation; only changes are logged.
async fn report_status(mut reports: watch::Receiver<StatusReport>) {
    let mut last: Option<StatusReport> = None;

    while reports.changed().await.is_ok() {
        let report = reports.borrow_and_update().clone();
        let (status_changed, on_air_changed) = match &last {
            Some(prev) => (prev.status != report.status, prev.on_air != report.on_air),
            None => (true, true),
        };

        if status_changed {
            log_status(report.status);
        }
        if on_air_changed {
            if report.on_air {
                tracing::info!(session = %report.session_id, "Proclaim is on air");
            } else {
                tracing::info!("Proclaim is off air");
            }
        }
        last = Some(report);
    }
}

fn log_status(status: OverallStatus) {
    match status.message() {
        Some(msg) => tracing::warn!(status = ?status, "{msg}"),
        None => tracing::info!(status = ?status, "connected to Proclaim"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keywords() {
        assert_eq!(Input::parse("toggle"), Ok(Some(Input::Toggle)));
        assert_eq!(Input::parse("  status "), Ok(Some(Input::Status)));
        assert_eq!(Input::parse("reload"), Ok(Some(Input::Reload)));
        assert_eq!(Input::parse("quit"), Ok(Some(Input::Quit)));
        assert_eq!(Input::parse("exit"), Ok(Some(Input::Quit)));
    }

    #[test]
    fn parse_blank_line() {
        assert_eq!(Input::parse(""), Ok(None));
        assert_eq!(Input::parse("   "), Ok(None));
    }

    #[test]
    fn parse_command_without_index() {
        assert_eq!(
            Input::parse("NextSlide"),
            Ok(Some(Input::Command {
                name: "NextSlide".into(),
                index: None
            }))
        );
    }

    #[test]
    fn parse_command_with_index() {
        assert_eq!(
            Input::parse("GoToSlide 7"),
            Ok(Some(Input::Command {
                name: "GoToSlide".into(),
                index: Some(7)
            }))
        );
    }

    #[test]
    fn parse_rejects_bad_index_and_extra_words() {
        assert!(Input::parse("GoToSlide seven").is_err());
        assert!(Input::parse("GoToSlide -1").is_err());
        assert!(Input::parse("GoToSlide 1 2").is_err());
    }
}
