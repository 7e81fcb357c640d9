//! Command dispatcher
//!
//! The single consumer of inbound messages. Each message runs through four
//! steps in order: the reboot-handshake update, the authorization gate,
//! command resolution, and reply delivery. Processing is strictly
//! sequential, one message to completion before the next, which is what
//! lets `pending_reboot` live here as a plain field with no locking.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::core::{ChatMessage, Command, RebootExecutor, ReplySink, SystemProbes};
use crate::probes::ProbeError;

pub const GREETING_REPLY: &str = "Hello 👋 I'm your bot on this host 🤖";
pub const PONG_REPLY: &str = "pong 🏓";
pub const REBOOT_ARMED_REPLY: &str = "⚠️ Are you sure? Send /confirm to reboot";
pub const REBOOTING_REPLY: &str = "♻️ Rebooting...";
pub const NOTHING_PENDING_REPLY: &str = "There is no pending action";
pub const UNKNOWN_COMMAND_REPLY: &str = "I don't know that command, try /help";
pub const PLAIN_TEXT_REPLY: &str =
    "Very interesting... but I'm not much of a talker, try /help";

pub const UPTIME_ERROR_REPLY: &str = "❌ Could not read the uptime";
pub const TEMP_ERROR_REPLY: &str = "❌ Could not read the CPU temperature";
pub const DISK_ERROR_REPLY: &str = "❌ Could not read the disk usage";
pub const RAM_ERROR_REPLY: &str = "❌ Could not read the RAM usage";

/// Builds the `/help` reply from the full command set, one token per line.
pub fn help_reply() -> String {
    Command::TOKENS
        .iter()
        .map(|token| format!("/{token}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Dispatcher {
    authorized_user: i64,
    pending_reboot: bool,
    probes: Arc<dyn SystemProbes>,
    executor: Arc<dyn RebootExecutor>,
    replies: Arc<dyn ReplySink>,
}

impl Dispatcher {
    pub fn new(
        authorized_user: i64,
        probes: Arc<dyn SystemProbes>,
        executor: Arc<dyn RebootExecutor>,
        replies: Arc<dyn ReplySink>,
    ) -> Self {
        Self {
            authorized_user,
            pending_reboot: false,
            probes,
            executor,
            replies,
        }
    }

    /// Consumes inbound messages until the channel closes or shutdown is
    /// signalled.
    pub async fn run(
        mut self,
        mut updates_rx: mpsc::Receiver<ChatMessage>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!(
            authorized_user = self.authorized_user,
            "Starting command dispatcher"
        );
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Dispatcher received shutdown signal");
                    return Ok(());
                }
                maybe_message = updates_rx.recv() => {
                    match maybe_message {
                        Some(message) => self.handle(message).await,
                        None => {
                            info!("Update channel closed, stopping dispatcher");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Processes one inbound message through the dispatch steps.
    pub async fn handle(&mut self, message: ChatMessage) {
        // Step 1 runs before the authorization gate: any message that is
        // not a /confirm command disarms a pending reboot, whoever sent
        // it. An unauthorized /confirm leaves the flag armed and is then
        // dropped by step 2.
        if self.pending_reboot && message.command() != Some(Command::Confirm) {
            info!("Pending reboot cancelled by a non-confirm message");
            self.pending_reboot = false;
        }

        // Step 2: unauthorized senders get no reply of any kind.
        if !self.is_authorized(&message) {
            return;
        }

        // Step 3: resolve the reply.
        let reply = match message.command() {
            None => PLAIN_TEXT_REPLY.to_string(),
            Some(command) => self.resolve(command).await,
        };

        // Step 4: deliver. A failed send is logged, never retried.
        if let Err(e) = self.replies.send_reply(message.chat_id, &reply).await {
            error!(chat_id = message.chat_id, error = %e, "Failed to deliver reply");
        }
    }

    fn is_authorized(&self, message: &ChatMessage) -> bool {
        match &message.sender {
            Some(sender) if sender.id == self.authorized_user => true,
            Some(sender) => {
                warn!(
                    sender = %sender.display_name,
                    id = sender.id,
                    "Ignoring message from unauthorized sender"
                );
                false
            }
            None => {
                warn!(
                    chat_id = message.chat_id,
                    "Ignoring message without a sender record"
                );
                false
            }
        }
    }

    async fn resolve(&mut self, command: Command) -> String {
        match command {
            Command::Start => GREETING_REPLY.to_string(),
            Command::Ping => PONG_REPLY.to_string(),
            Command::Uptime => reply_or_error("uptime", self.probes.uptime(), UPTIME_ERROR_REPLY),
            Command::Temp => reply_or_error(
                "cpu_temperature",
                self.probes.cpu_temperature(),
                TEMP_ERROR_REPLY,
            ),
            Command::Disk => reply_or_error("disk_usage", self.probes.disk_usage(), DISK_ERROR_REPLY),
            Command::Ram => reply_or_error("memory_usage", self.probes.memory_usage(), RAM_ERROR_REPLY),
            Command::Reboot => {
                self.pending_reboot = true;
                info!("Reboot requested, waiting for /confirm");
                REBOOT_ARMED_REPLY.to_string()
            }
            Command::Confirm => {
                if self.pending_reboot {
                    self.pending_reboot = false;
                    info!("Reboot confirmed");
                    // Awaits the spawn only, never the reboot itself; a
                    // launch failure is logged and the operator still sees
                    // the acknowledgement.
                    if let Err(e) = self.executor.launch_reboot().await {
                        error!(error = %e, "Reboot launch failed");
                    }
                    REBOOTING_REPLY.to_string()
                } else {
                    NOTHING_PENDING_REPLY.to_string()
                }
            }
            Command::Help => help_reply(),
            Command::Unknown => UNKNOWN_COMMAND_REPLY.to_string(),
        }
    }
}

/// Maps a probe result to the reply text, logging the error chain and
/// substituting the fixed per-command failure message.
fn reply_or_error(probe: &str, result: Result<String, ProbeError>, failure_reply: &str) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            error!(probe, error = ?e, "Probe failed");
            failure_reply.to_string()
        }
    }
}
