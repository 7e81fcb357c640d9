//! hostwatch - single-operator remote control for a Linux host
//!
//! This library provides the building blocks for the bot: the Telegram
//! transport, the command dispatcher with its reboot confirmation
//! handshake, the host metric probes, and the privileged reboot launcher.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod power;
pub mod probes;
pub mod task_manager;
pub mod telegram;

// Re-export core types for convenience
pub use crate::core::*;
