//! # Network Monitor
//!
//! Tracks the host's notion of connectivity and broadcasts transitions.
//!
//! ## Features
//!
//! - **Current status**: `current()` reads the last reported state
//! - **Transition events**: one `Online`/`Offline` event per actual change;
//!   repeating the same state emits nothing
//! - **Subscriptions**: async streams via `subscribe()`, or callbacks via
//!   `on_change()` with an explicit unsubscribe handle
//! - **Reachability probe**: optional task that feeds the observer from the
//!   server's health check
//!
//! "Online" means an attempt is worth making, not that it will succeed.

use crate::client::sync::api::SyncApi;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 16;

/// Connectivity transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

impl ConnectivityEvent {
    fn from_online(online: bool) -> Self {
        if online {
            ConnectivityEvent::Online
        } else {
            ConnectivityEvent::Offline
        }
    }
}

/// Connectivity state shared by the trigger and the host
#[derive(Debug)]
pub struct ConnectivityObserver {
    online: Mutex<bool>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityObserver {
    pub fn new(initially_online: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            online: Mutex::new(initially_online),
            events,
        }
    }

    /// Last reported connectivity
    pub fn current(&self) -> bool {
        *self.online.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Report the host's connectivity; returns `true` if this was a transition
    pub fn set_online(&self, online: bool) -> bool {
        let mut state = self.online.lock().unwrap_or_else(|e| e.into_inner());
        if *state == online {
            return false;
        }
        *state = online;

        let event = ConnectivityEvent::from_online(online);
        tracing::info!(?event, "Connectivity changed");
        // No receivers is fine; the state is still updated
        let _ = self.events.send(event);
        true
    }

    /// Stream of future transitions
    pub fn subscribe(&self) -> ConnectivitySubscription {
        ConnectivitySubscription {
            receiver: self.events.subscribe(),
        }
    }

    /// Call `handler` on every future transition until the handle is dropped
    pub fn on_change<F>(&self, mut handler: F) -> ListenerHandle
    where
        F: FnMut(ConnectivityEvent) + Send + 'static,
    {
        let mut subscription = self.subscribe();
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                handler(event);
            }
        });
        ListenerHandle { task }
    }
}

impl Default for ConnectivityObserver {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Receiving end of [`ConnectivityObserver::subscribe`]
#[derive(Debug)]
pub struct ConnectivitySubscription {
    receiver: broadcast::Receiver<ConnectivityEvent>,
}

impl ConnectivitySubscription {
    /// Next transition; `None` once the observer is gone
    pub async fn next(&mut self) -> Option<ConnectivityEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Connectivity subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Registration returned by [`ConnectivityObserver::on_change`]
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stop delivering events
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Poll the server's health check every `interval` and report the result
pub fn spawn_reachability_probe(
    observer: Arc<ConnectivityObserver>,
    api: Arc<dyn SyncApi>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = api.health_check().await;
            observer.set_online(reachable);
        }
    })
}
