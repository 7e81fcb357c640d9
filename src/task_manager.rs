//! Manages the lifecycle of all spawned tasks in the application.
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Spawns named tasks, hands out the shared shutdown receiver, and joins
/// every task at shutdown so none is silently abandoned.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns a task under `name` and keeps its handle for shutdown.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let handle = tokio::spawn(future);
        self.handles.lock().unwrap().push((name, handle));
    }

    /// Returns a clone of the shutdown receiver for a task to select on.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Waits for every managed task to finish, logging each outcome.
    pub async fn shutdown(self) {
        let handles = self.handles.lock().unwrap().drain(..).collect::<Vec<_>>();
        info!(
            "Shutting down, waiting for {} tasks to complete...",
            handles.len()
        );

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut panicked = 0;
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name = name, "Task shut down gracefully"),
                Err(e) => {
                    error!(task_name = name, error = %e, "Task panicked during shutdown");
                    panicked += 1;
                }
            }
        }

        if panicked == 0 {
            info!("All tasks shut down gracefully");
        } else {
            error!("{panicked} tasks panicked during shutdown");
        }
    }
}
