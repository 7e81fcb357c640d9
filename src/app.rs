//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::{ChatMessage, RebootExecutor, ReplySink, SystemProbes},
    dispatcher::Dispatcher,
    power::ProcessReboot,
    probes::HostProbes,
    task_manager::TaskManager,
    telegram::{TelegramClient, TelegramPoller},
};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Capacity of the inbound message queue between poller and dispatcher.
const UPDATE_QUEUE_CAPACITY: usize = 64;

/// A handle to the running application, containing all its task handles.
pub struct App {
    task_manager: TaskManager,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Waits for the shutdown signal and then gracefully shuts down all
    /// tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        shutdown_rx.changed().await.ok();
        info!("Shutdown signal received, waiting for tasks to complete...");

        self.task_manager.shutdown().await;
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the application's components from running them,
/// and provides override hooks so tests can substitute the transport, the
/// probes, or the reboot executor.
pub struct AppBuilder {
    config: Config,
    updates_rx_for_test: Option<mpsc::Receiver<ChatMessage>>,
    reply_sink_override: Option<Arc<dyn ReplySink>>,
    probes_override: Option<Arc<dyn SystemProbes>>,
    executor_override: Option<Arc<dyn RebootExecutor>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            updates_rx_for_test: None,
            reply_sink_override: None,
            probes_override: None,
            executor_override: None,
        }
    }

    /// Injects the inbound message channel directly, bypassing Telegram.
    pub fn updates_rx_for_test(mut self, rx: mpsc::Receiver<ChatMessage>) -> Self {
        self.updates_rx_for_test = Some(rx);
        self
    }

    /// Overrides the reply sink for testing.
    pub fn reply_sink_override(mut self, sink: Arc<dyn ReplySink>) -> Self {
        self.reply_sink_override = Some(sink);
        self
    }

    /// Overrides the host probes for testing.
    pub fn probes_override(mut self, probes: Arc<dyn SystemProbes>) -> Self {
        self.probes_override = Some(probes);
        self
    }

    /// Overrides the reboot executor for testing.
    pub fn executor_override(mut self, executor: Arc<dyn RebootExecutor>) -> Self {
        self.executor_override = Some(executor);
        self
    }

    /// Builds and initializes all application components, returning a
    /// runnable `App`.
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        let authorized_user = config
            .telegram
            .authorized_user
            .ok_or_else(|| anyhow!("telegram.authorized_user is not configured"))?;

        let reply_sink: Arc<dyn ReplySink>;
        let updates_rx: mpsc::Receiver<ChatMessage>;

        match (self.reply_sink_override, self.updates_rx_for_test) {
            // Both seams overridden: no Telegram client is built at all.
            (Some(sink), Some(rx)) => {
                reply_sink = sink;
                updates_rx = rx;
            }
            (sink_override, rx_override) => {
                let client = TelegramClient::new(
                    &config.telegram.api_url,
                    &config.telegram.token,
                    Duration::from_secs(config.telegram.poll_timeout_seconds),
                )?;

                // Startup token check; a failure here aborts startup.
                let profile = client.get_me().await?;
                let bot_name = profile
                    .username
                    .clone()
                    .unwrap_or_else(|| profile.first_name.clone());
                info!(bot = %bot_name, bot_id = profile.id, "Connected to Telegram");

                reply_sink = match sink_override {
                    Some(sink) => sink,
                    None => Arc::new(client.clone()),
                };

                updates_rx = match rx_override {
                    Some(rx) => rx,
                    None => {
                        let (updates_tx, rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
                        let poller = TelegramPoller::new(client, updates_tx);
                        let poller_shutdown_rx = task_manager.get_shutdown_rx();
                        task_manager.spawn("TelegramPoller", async move {
                            if let Err(e) = poller.run(poller_shutdown_rx).await {
                                error!(error = %e, "Telegram poller failed");
                            }
                        });
                        rx
                    }
                };
            }
        }

        let probes: Arc<dyn SystemProbes> = match self.probes_override {
            Some(probes) => probes,
            None => Arc::new(HostProbes::new(&config.probes)),
        };

        let executor: Arc<dyn RebootExecutor> = match self.executor_override {
            Some(executor) => executor,
            None => Arc::new(ProcessReboot::new(config.reboot.command.clone())?),
        };

        let dispatcher = Dispatcher::new(authorized_user, probes, executor, reply_sink);
        let dispatcher_shutdown_rx = task_manager.get_shutdown_rx();
        task_manager.spawn("Dispatcher", async move {
            if let Err(e) = dispatcher.run(updates_rx, dispatcher_shutdown_rx).await {
                error!(error = %e, "Dispatcher failed");
            }
        });

        info!("hostwatch initialized, listening for commands");

        Ok(App { task_manager })
    }
}
