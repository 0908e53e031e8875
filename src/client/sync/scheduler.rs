//! # Auto-Sync Scheduler
//!
//! Decides when to run the dispatcher for one user, driven by connectivity
//! transitions and the retry controller's schedule. No polling.
//!
//! ## Behavior
//!
//! - Online (or acquired while online) and a retry is permitted: sync now.
//! - A backoff delay is pending: arm one deferred invocation for that delay.
//! - Retry budget exhausted: do nothing until a manual sync succeeds.
//! - Offline: cancel the deferred invocation.
//! - Release (drop the handle): cancel everything. Switching users is a
//!   release followed by a new acquire.
//!
//! At most one deferred invocation is armed per handle; arming replaces it.

use crate::client::offline::retry::RetryController;
use crate::client::sync::dispatcher::SyncDispatcher;
use crate::client::sync::network_monitor::{ConnectivityEvent, ConnectivityObserver};
use crate::client::sync::sync_state::SyncOutcome;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

/// Factory for per-user auto-sync handles
#[derive(Debug, Clone)]
pub struct AutoSyncTrigger {
    dispatcher: SyncDispatcher,
    connectivity: Arc<ConnectivityObserver>,
}

impl AutoSyncTrigger {
    pub fn new(dispatcher: SyncDispatcher, connectivity: Arc<ConnectivityObserver>) -> Self {
        Self {
            dispatcher,
            connectivity,
        }
    }

    /// Start automatic syncing for `user_id` until the handle is released
    pub fn acquire(&self, user_id: impl Into<String>) -> AutoSyncHandle {
        let user_id = user_id.into();
        let armed = Arc::new(AtomicBool::new(false));
        let (commands, receiver) = mpsc::channel(8);

        let worker = Worker {
            user_id: user_id.clone(),
            dispatcher: self.dispatcher.clone(),
            retry: self.dispatcher.retry().clone(),
            connectivity: self.connectivity.clone(),
            armed: armed.clone(),
            timer: None,
        };
        let task = tokio::spawn(worker.run(receiver));

        tracing::debug!(user_id = %user_id, "Auto-sync acquired");
        AutoSyncHandle {
            user_id,
            dispatcher: self.dispatcher.clone(),
            commands,
            armed,
            task,
        }
    }
}

enum Command {
    SyncNow(oneshot::Sender<SyncOutcome>),
}

/// Live auto-sync registration for one user
#[derive(Debug)]
pub struct AutoSyncHandle {
    user_id: String,
    dispatcher: SyncDispatcher,
    commands: mpsc::Sender<Command>,
    armed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl AutoSyncHandle {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether a deferred invocation is currently armed
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Sync immediately, ignoring the retry budget, then re-plan
    pub async fn sync_now(&self) -> SyncOutcome {
        let (reply, outcome) = oneshot::channel();
        if self.commands.send(Command::SyncNow(reply)).await.is_ok() {
            if let Ok(outcome) = outcome.await {
                return outcome;
            }
        }
        // Worker is gone; still honor the manual request
        self.dispatcher.sync(&self.user_id).await
    }

    /// Stop automatic syncing and cancel any armed invocation
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.armed.store(false, Ordering::SeqCst);
        tracing::debug!(user_id = %self.user_id, "Auto-sync released");
    }
}

struct Worker {
    user_id: String,
    dispatcher: SyncDispatcher,
    retry: Arc<RetryController>,
    connectivity: Arc<ConnectivityObserver>,
    armed: Arc<AtomicBool>,
    timer: Option<Pin<Box<Sleep>>>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut events = self.connectivity.subscribe();

        if self.connectivity.current() {
            self.schedule().await;
        }

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(ConnectivityEvent::Online) => self.schedule().await,
                    Some(ConnectivityEvent::Offline) => {
                        if self.timer.is_some() {
                            tracing::info!(user_id = %self.user_id, "Offline, cancelling scheduled sync");
                        }
                        self.disarm();
                    }
                    None => break,
                },
                () = wait_for(&mut self.timer) => {
                    self.disarm();
                    if self.connectivity.current() {
                        self.schedule().await;
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::SyncNow(reply)) => {
                        self.disarm();
                        let outcome = self.dispatcher.sync(&self.user_id).await;
                        let failed = !outcome.success;
                        let _ = reply.send(outcome);
                        if failed && self.connectivity.current() {
                            self.schedule().await;
                        }
                    }
                    None => break,
                },
            }
        }
    }

    /// Sync if permitted, otherwise arm the backoff timer
    async fn schedule(&mut self) {
        loop {
            self.disarm();
            if !self.connectivity.current() {
                return;
            }

            if self.retry.can_retry(&self.user_id).await {
                let outcome = self.dispatcher.sync(&self.user_id).await;
                if outcome.success {
                    return;
                }
                // The failure consumed an attempt; plan the next one
                continue;
            }

            match self.retry.time_until_next_retry(&self.user_id).await {
                Some(delay) => {
                    self.arm(delay);
                    return;
                }
                None => {
                    tracing::info!(
                        user_id = %self.user_id,
                        "Retry budget exhausted, waiting for a manual sync"
                    );
                    return;
                }
            }
        }
    }

    fn arm(&mut self, delay: Duration) {
        tracing::debug!(user_id = %self.user_id, ?delay, "Scheduled deferred sync");
        self.timer = Some(Box::pin(tokio::time::sleep(delay)));
        self.armed.store(true, Ordering::SeqCst);
    }

    fn disarm(&mut self) {
        self.timer = None;
        self.armed.store(false, Ordering::SeqCst);
    }
}

async fn wait_for(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
