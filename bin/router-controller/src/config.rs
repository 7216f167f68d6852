//! Controller configuration loaded from the environment

use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("Invalid log format: {}. Must be text or json", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// JSON file holding an array of lifecycle events
    pub events_file: PathBuf,
    pub log_format: LogFormat,
    /// Print Prometheus metrics after the replay
    pub print_metrics: bool,
}

impl ControllerConfig {
    /// Build the configuration from `ROUTER_*` environment variables.
    /// A first command line argument overrides `ROUTER_EVENTS_FILE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(std::env::args().nth(1), |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(arg: Option<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let events_file = arg
            .or_else(|| lookup("ROUTER_EVENTS_FILE"))
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("Set ROUTER_EVENTS_FILE or pass the events file as first argument"))?;

        let log_format = match lookup("ROUTER_LOG_FORMAT") {
            Some(value) => LogFormat::parse(&value)?,
            None => LogFormat::Text,
        };

        let print_metrics = match lookup("ROUTER_PRINT_METRICS").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => return Err(anyhow!("Invalid ROUTER_PRINT_METRICS value: {}", other)),
        };

        Ok(Self {
            events_file,
            log_format,
            print_metrics,
        })
    }
}
