//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using
//! the `clap` crate. These arguments are parsed at startup and merged as the
//! top configuration layer, over the `hostwatch.toml` file and environment
//! variables.

use clap::Parser;
use figment::{
    providers::Serialized,
    value::{Dict, Map},
    Error, Figment, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Remote-control Telegram bot for a single Linux host.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Long-poll timeout for getUpdates, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        // Delegate to Serialized so dotted key paths nest properly.
        let mut overlay = Figment::new();

        if let Some(level) = &self.log_level {
            overlay = overlay.merge(Serialized::default("log_level", level));
        }
        if let Some(seconds) = self.timeout {
            overlay = overlay.merge(Serialized::default(
                "telegram.poll_timeout_seconds",
                seconds,
            ));
        }

        overlay.data()
    }
}
