//! Configuration management for hostwatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer built-in defaults, a `hostwatch.toml` file, environment
//! variables and command-line flags, each layer overriding the one before.

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cli::Cli;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Settings for the Telegram transport.
    pub telegram: TelegramConfig,
    /// Source paths for the host metric probes.
    pub probes: ProbesConfig,
    /// Settings for the privileged reboot action.
    pub reboot: RebootConfig,
}

/// Settings for the Telegram transport.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    /// Bot API token issued by BotFather. Required.
    pub token: String,
    /// Numeric user id of the only account allowed to issue commands.
    /// Required.
    pub authorized_user: Option<i64>,
    /// Base URL of the Bot API server.
    pub api_url: String,
    /// How long a `getUpdates` long poll is held open, in seconds.
    pub poll_timeout_seconds: u64,
}

/// Source paths for the host metric probes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProbesConfig {
    /// File holding the elapsed-seconds uptime counter.
    pub uptime_path: PathBuf,
    /// File holding the CPU temperature in millidegrees Celsius.
    pub thermal_path: PathBuf,
    /// File holding the `Key: value kB` memory table.
    pub meminfo_path: PathBuf,
    /// Mount point whose filesystem statistics the disk probe reports.
    pub disk_mount: PathBuf,
}

/// Settings for the privileged reboot action.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RebootConfig {
    /// Command and arguments launched once a reboot is confirmed.
    pub command: Vec<String>,
}

impl Config {
    /// Loads the application configuration by layering sources: defaults,
    /// file, environment, and CLI arguments.
    ///
    /// Environment variables use the `HOSTWATCH_` prefix with `__` as the
    /// nesting separator, e.g. `HOSTWATCH_TELEGRAM__TOKEN`.
    pub fn load(cli: &Cli) -> Result<Self> {
        // A file the operator named must exist; the default path is
        // optional and silently skipped when absent.
        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found at {}", path.display());
            }
        }
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("hostwatch.toml"));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("HOSTWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot run. The defaults layer fills
    /// every field, so required values are checked here rather than left
    /// to deserialization failures.
    fn validate(&self) -> Result<()> {
        if self.telegram.token.is_empty() {
            bail!("telegram.token is required (hostwatch.toml or HOSTWATCH_TELEGRAM__TOKEN)");
        }
        if self.telegram.authorized_user.is_none() {
            bail!(
                "telegram.authorized_user is required (hostwatch.toml or HOSTWATCH_TELEGRAM__AUTHORIZED_USER)"
            );
        }
        if self.telegram.poll_timeout_seconds == 0 {
            bail!("telegram.poll_timeout_seconds must be at least 1");
        }
        if self.reboot.command.is_empty() {
            bail!("reboot.command must not be empty");
        }
        Ok(())
    }
}

// Provide a default implementation for tests and easy setup. The token and
// authorized user have no usable defaults and must come from a real layer.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            telegram: TelegramConfig {
                token: String::new(),
                authorized_user: None,
                api_url: "https://api.telegram.org".to_string(),
                poll_timeout_seconds: 60,
            },
            probes: ProbesConfig {
                uptime_path: PathBuf::from("/proc/uptime"),
                thermal_path: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
                meminfo_path: PathBuf::from("/proc/meminfo"),
                disk_mount: PathBuf::from("/"),
            },
            reboot: RebootConfig {
                command: vec!["sudo".to_string(), "reboot".to_string()],
            },
        }
    }
}
