//! Core domain types and service traits for hostwatch
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern component interactions: the inbound chat message record, the
//! closed command set, and the seams behind which the transport, the host
//! probes, and the privileged reboot launcher sit.

use crate::probes::ProbeError;
use async_trait::async_trait;

/// The closed set of commands the bot understands, plus a fallback for
/// syntactically valid command tokens it does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Ping,
    Uptime,
    Temp,
    Disk,
    Ram,
    Reboot,
    Confirm,
    Help,
    /// A command token outside the supported set (e.g. `/foobar`).
    Unknown,
}

impl Command {
    /// Every supported command token, in the order `/help` lists them.
    pub const TOKENS: [&'static str; 9] = [
        "start", "ping", "uptime", "temp", "disk", "ram", "reboot", "confirm", "help",
    ];

    /// Maps an extracted command token to a [`Command`].
    ///
    /// Matching is exact: Telegram command tokens are conventionally
    /// lowercase, and anything else falls through to [`Command::Unknown`].
    pub fn parse(token: &str) -> Self {
        match token {
            "start" => Command::Start,
            "ping" => Command::Ping,
            "uptime" => Command::Uptime,
            "temp" => Command::Temp,
            "disk" => Command::Disk,
            "ram" => Command::Ram,
            "reboot" => Command::Reboot,
            "confirm" => Command::Confirm,
            "help" => Command::Help,
            _ => Command::Unknown,
        }
    }
}

/// The sender of an inbound message. Telegram channel posts carry no sender
/// record at all, which is why the field is optional on [`ChatMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Numeric Telegram user id, the identity the authorization gate checks.
    pub id: i64,
    /// First name or username, used only for audit logging.
    pub display_name: String,
}

/// An inbound chat message as the dispatcher sees it.
///
/// The transport adapter has already done the wire-level work: it extracted
/// the command token (text after the leading `/` up to the first space, any
/// `@botname` suffix stripped) if and only if Telegram marked the text as a
/// command. The dispatcher never re-parses raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Chat the message arrived in; replies are addressed back to it.
    pub chat_id: i64,
    pub sender: Option<Sender>,
    pub text: String,
    /// `Some` iff the text is a command; holds the extracted token.
    pub command_token: Option<String>,
}

impl ChatMessage {
    /// The parsed command, or `None` for plain (non-command) text.
    pub fn command(&self) -> Option<Command> {
        self.command_token.as_deref().map(Command::parse)
    }

    pub fn sender_id(&self) -> Option<i64> {
        self.sender.as_ref().map(|sender| sender.id)
    }
}

/// Delivery seam for outbound replies. Implemented by the Telegram client
/// in production and by recording sinks in tests.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Delivers `text` to `chat_id`. Failures are the caller's to log;
    /// there is no retry.
    async fn send_reply(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
}

/// The four host probes, each returning a fully formatted reply string.
///
/// Probes are local file reads with no cancellation or timeout semantics,
/// so the trait stays synchronous.
pub trait SystemProbes: Send + Sync {
    fn uptime(&self) -> Result<String, ProbeError>;
    fn cpu_temperature(&self) -> Result<String, ProbeError>;
    fn disk_usage(&self) -> Result<String, ProbeError>;
    fn memory_usage(&self) -> Result<String, ProbeError>;
}

/// Launcher for the one privileged action the bot supports.
#[async_trait]
pub trait RebootExecutor: Send + Sync {
    /// Launches the reboot subprocess without awaiting its completion.
    /// `Ok` means the process was spawned. The host is expected to go
    /// down before any exit status exists.
    async fn launch_reboot(&self) -> anyhow::Result<()>;
}
