// src/reload/mod.rs

//! Live-reload notifications.
//!
//! [`ReloadHub`] fans one message per rebuild batch out to every connected
//! listener; [`server`] exposes it over TCP as newline-delimited JSON:
//!
//! ```text
//! {"command":"hello","server":"assetdag"}
//! {"command":"reload","paths":["static/css/site.css","static/css/site.css.map"]}
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

pub mod server;

pub use server::{ReloadServerHandle, spawn_reload_server};

/// Messages that go to listeners are buffered up to this many; a slower
/// listener skips what it missed.
const CHANNEL_CAPACITY: usize = 64;

pub const SERVER_NAME: &str = "assetdag";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Sent once, right after a listener connects.
    Hello { server: String },
    /// One per rebuild batch.
    Reload { paths: Vec<String> },
}

impl ReloadMessage {
    pub fn hello() -> Self {
        ReloadMessage::Hello {
            server: SERVER_NAME.to_string(),
        }
    }

    /// Encode as a single line (with the trailing `\n`).
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadMessage>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    /// Broadcast one reload message. Returns the number of listeners that
    /// will receive it.
    pub fn notify(&self, paths: Vec<String>) -> usize {
        let count = paths.len();
        match self.tx.send(ReloadMessage::Reload { paths }) {
            Ok(listeners) => {
                debug!(paths = count, listeners, "broadcast reload");
                listeners
            }
            Err(_) => {
                debug!(paths = count, "no reload listeners connected");
                0
            }
        }
    }
}
