//! Telegram Bot API client and update poller
//!
//! This module handles the wire side of the bot: long-polling `getUpdates`,
//! converting raw updates into [`ChatMessage`]s for the dispatcher, and
//! sending replies through `sendMessage`. Only the small slice of the Bot
//! API the bot actually touches is modelled.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::core::{ChatMessage, ReplySink, Sender};

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP request to Telegram failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram rejected {method}: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
}

/// Response envelope wrapping every Bot API result.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
}

/// The bot's own account, as reported by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotProfile {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Converts a raw Telegram message into the dispatcher's message type.
pub fn to_chat_message(message: Message) -> ChatMessage {
    let text = message.text.unwrap_or_default();
    let command_token = extract_command_token(&text, &message.entities);
    let sender = message.from.map(|user| {
        let display_name = user
            .username
            .clone()
            .unwrap_or_else(|| user.first_name.clone());
        Sender {
            id: user.id,
            display_name,
        }
    });
    ChatMessage {
        chat_id: message.chat.id,
        sender,
        text,
        command_token,
    }
}

/// A message is a command iff its first entity is a `bot_command` anchored
/// at offset zero. The token is the entity text without the leading slash;
/// a trailing `@botname` used to address a specific bot is stripped.
fn extract_command_token(text: &str, entities: &[MessageEntity]) -> Option<String> {
    let entity = entities.first()?;
    if entity.kind != "bot_command" || entity.offset != 0 {
        return None;
    }
    let raw: String = text
        .chars()
        .skip(1)
        .take(entity.length.saturating_sub(1))
        .collect();
    let token = raw.split('@').next().unwrap_or_default();
    Some(token.to_string())
}

/// Deadline for ordinary API calls and for the connect phase of every
/// call. `getUpdates` sets its own overall deadline, sized to the poll
/// window.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal Telegram Bot API client.
///
/// The API base URL is part of the configuration so tests can point the
/// client at a local mock server instead of `api.telegram.org`.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(
        api_url: &str,
        token: &str,
        poll_timeout: Duration,
    ) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            poll_timeout,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .json(payload)
            .timeout(timeout)
            .send()
            .await?;
        let envelope: ApiResponse<T> = response.json().await?;
        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(TelegramError::Api {
                method,
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    /// Identifies the bot account. Called once at startup to prove the
    /// token works before polling begins.
    pub async fn get_me(&self) -> Result<BotProfile, TelegramError> {
        self.call("getMe", &json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-polls for updates at or past `offset`. Blocks for up to the
    /// configured poll timeout when no updates are waiting.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        // The request deadline must outlast the long poll the server
        // holds open.
        self.call(
            "getUpdates",
            &json!({ "offset": offset, "timeout": self.poll_timeout.as_secs() }),
            self.poll_timeout + Duration::from_secs(10),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &json!({ "chat_id": chat_id, "text": text }),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReplySink for TelegramClient {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await?;
        Ok(())
    }
}

/// Polls Telegram for updates and forwards converted messages to the
/// dispatcher channel.
pub struct TelegramPoller {
    client: TelegramClient,
    updates_tx: mpsc::Sender<ChatMessage>,
}

impl TelegramPoller {
    pub fn new(client: TelegramClient, updates_tx: mpsc::Sender<ChatMessage>) -> Self {
        Self { client, updates_tx }
    }

    /// Runs the long-poll loop until shutdown is signalled.
    ///
    /// Failed polls back off exponentially, 1 second doubling up to 60,
    /// and the backoff resets after the next successful poll.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        const MAX_BACKOFF: Duration = Duration::from_secs(60);

        let mut offset = 0i64;
        let mut backoff = Duration::from_secs(1);

        info!("Starting Telegram update poller");
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Telegram poller received shutdown signal");
                    return Ok(());
                }
                poll = self.client.get_updates(offset) => {
                    match poll {
                        Ok(updates) => {
                            backoff = Duration::from_secs(1);
                            for update in updates {
                                // Acknowledge the update even if it carries
                                // no message; otherwise it is re-delivered
                                // on every poll.
                                offset = offset.max(update.update_id + 1);
                                let Some(message) = update.message else {
                                    debug!(update_id = update.update_id, "Skipping update without a message");
                                    continue;
                                };
                                if self.updates_tx.send(to_chat_message(message)).await.is_err() {
                                    warn!("Dispatcher channel closed, stopping poller");
                                    return Ok(());
                                }
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Polling Telegram for updates failed");
                            tokio::select! {
                                biased;
                                _ = shutdown_rx.changed() => return Ok(()),
                                _ = tokio::time::sleep(backoff) => {}
                            }
                            backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
                        }
                    }
                }
            }
        }
    }
}
