//! Host metric probes
//!
//! Each probe turns one OS-exposed data source into a formatted reply
//! string: the uptime counter, the thermal zone sensor, the statistics of
//! a mounted filesystem, and the meminfo table. Parsing and formatting are
//! pure functions kept separate from the file reads so they can be tested
//! without a real `/proc`.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ProbesConfig;
use crate::core::SystemProbes;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {}", .0.display())]
    Unreadable(PathBuf, #[source] std::io::Error),

    #[error("could not parse {}: {}", .0.display(), .1)]
    Malformed(PathBuf, String),

    #[error("filesystem statistics failed for {}", .0.display())]
    Statvfs(PathBuf, #[source] nix::Error),
}

/// Production implementation of [`SystemProbes`] reading the configured
/// source paths. Defaults are the standard Linux locations; tests point
/// the paths at temporary files instead.
#[derive(Debug, Clone)]
pub struct HostProbes {
    uptime_path: PathBuf,
    thermal_path: PathBuf,
    meminfo_path: PathBuf,
    disk_mount: PathBuf,
}

impl HostProbes {
    pub fn new(config: &ProbesConfig) -> Self {
        Self {
            uptime_path: config.uptime_path.clone(),
            thermal_path: config.thermal_path.clone(),
            meminfo_path: config.meminfo_path.clone(),
            disk_mount: config.disk_mount.clone(),
        }
    }

    fn read(path: &Path) -> Result<String, ProbeError> {
        fs::read_to_string(path).map_err(|e| ProbeError::Unreadable(path.to_path_buf(), e))
    }
}

impl SystemProbes for HostProbes {
    fn uptime(&self) -> Result<String, ProbeError> {
        let raw = Self::read(&self.uptime_path)?;
        let seconds = parse_uptime_seconds(&raw)
            .map_err(|reason| ProbeError::Malformed(self.uptime_path.clone(), reason))?;
        Ok(format_uptime(seconds))
    }

    fn cpu_temperature(&self) -> Result<String, ProbeError> {
        let raw = Self::read(&self.thermal_path)?;
        let millidegrees = parse_millidegrees(&raw)
            .map_err(|reason| ProbeError::Malformed(self.thermal_path.clone(), reason))?;
        Ok(format_temperature(millidegrees))
    }

    fn disk_usage(&self) -> Result<String, ProbeError> {
        let stats = nix::sys::statvfs::statvfs(self.disk_mount.as_path())
            .map_err(|e| ProbeError::Statvfs(self.disk_mount.clone(), e))?;

        let total = stats.blocks() * stats.block_size();
        let free = stats.blocks_free() * stats.block_size();
        Ok(format_disk(total, free))
    }

    fn memory_usage(&self) -> Result<String, ProbeError> {
        let raw = Self::read(&self.meminfo_path)?;
        let (total_kib, available_kib) = parse_meminfo_kib(&raw);
        Ok(format_memory(total_kib, available_kib))
    }
}

/// Extracts the elapsed-seconds counter: the first whitespace-delimited
/// field of the uptime file, a floating-point number of seconds.
fn parse_uptime_seconds(raw: &str) -> Result<f64, String> {
    let field = raw
        .split_whitespace()
        .next()
        .ok_or_else(|| "empty uptime file".to_string())?;
    field
        .parse::<f64>()
        .map_err(|e| format!("bad seconds value {field:?}: {e}"))
}

/// Formats elapsed seconds as days/hours/minutes, truncating. Seconds are
/// dropped, never rounded up: 90061 s is exactly "1d 1h 1m".
fn format_uptime(seconds: f64) -> String {
    let total = seconds as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    format!("⏱️ Uptime: {days}d {hours}h {minutes}m")
}

/// Parses the thermal zone reading: a single integer in millidegrees
/// Celsius, possibly negative, surrounded by whitespace.
fn parse_millidegrees(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .map_err(|e| format!("bad millidegree value {trimmed:?}: {e}"))
}

fn format_temperature(millidegrees: i64) -> String {
    format!("🌡️ CPU temperature: {:.1}°C", millidegrees as f64 / 1000.0)
}

/// Formats disk usage from byte counts. Used space is computed in bytes
/// first, then every figure is truncated to whole GiB.
fn format_disk(total_bytes: u64, free_bytes: u64) -> String {
    let gib = |bytes: u64| bytes / 1024 / 1024 / 1024;
    let used_bytes = total_bytes.saturating_sub(free_bytes);
    format!(
        "💾 Disk:\nUsed: {} GB\nFree: {} GB\nTotal: {} GB",
        gib(used_bytes),
        gib(free_bytes),
        gib(total_bytes)
    )
}

/// Scans `Key: value kB` lines for `MemTotal` and `MemAvailable`, both in
/// KiB. Missing or malformed entries are treated as zero; the memory probe
/// only hard-fails when the file itself is unreadable.
fn parse_meminfo_kib(raw: &str) -> (u64, u64) {
    let mut total = 0;
    let mut available = 0;
    for line in raw.lines() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else { continue };
        let Some(value) = fields.next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        match key.trim_end_matches(':') {
            "MemTotal" => total = value,
            "MemAvailable" => available = value,
            _ => {}
        }
    }
    (total, available)
}

fn format_memory(total_kib: u64, available_kib: u64) -> String {
    let total = total_kib / 1024;
    let free = available_kib / 1024;
    let used = total.saturating_sub(free);
    format!("🧠 RAM:\nUsed: {used} MB\nFree: {free} MB\nTotal: {total} MB")
}
