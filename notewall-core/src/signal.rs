//! Cross-window display signals.
//!
//! Transient commands for display processes, delivered fire-and-forget over a
//! broadcast channel. Nothing is retained: a display that subscribes after a
//! signal was sent never sees it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const SIGNAL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplaySignal {
    /// Discard accumulated notes and restart from the current live set.
    ResetSlideshow,
    /// Same effect as a reset; sent by older host panels.
    ClearNotes,
}

#[derive(Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<DisplaySignal>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { tx }
    }

    /// Send to every current listener. Returns how many received it.
    pub fn publish(&self, signal: DisplaySignal) -> usize {
        match self.tx.send(signal) {
            Ok(n) => n,
            Err(_) => {
                tracing::debug!(?signal, "Display signal dropped: no listeners");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DisplaySignal> {
        self.tx.subscribe()
    }
}
