// src/server/reload.rs

//! Reload notifications pushed to connected browsers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Wire message sent over the live-reload WebSocket as JSON.
///
/// ```json
/// {"type":"reload"}
/// {"type":"css","path":"/assets/css/main.css"}
/// {"type":"error","task":"templates","message":"..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Full page reload.
    Reload,
    /// Re-fetch stylesheets whose URL path matches `path`.
    Css { path: String },
    /// A task failed; shown in the browser console.
    Error { task: String, message: String },
}

/// Broadcast hub behind every reload notification.
///
/// Constructed once at startup and shared by the dev server (which subscribes
/// one receiver per WebSocket) and the task runner (which publishes).
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    /// Number of connected browser clients.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn notify(&self, message: ReloadMessage) {
        // No receivers just means no browser is connected.
        match self.tx.send(message) {
            Ok(clients) => debug!(clients, "reload notification sent"),
            Err(broadcast::error::SendError(message)) => {
                debug!(?message, "no browser connected; notification dropped")
            }
        }
    }

    pub fn notify_error(&self, task: &str, message: &str) {
        self.notify(ReloadMessage::Error {
            task: task.to_string(),
            message: message.to_string(),
        });
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(64)
    }
}
