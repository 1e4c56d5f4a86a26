//! Notification sinks.
//!
//! A sink is fire-and-forget: nothing it does can fail a transition.

use tokio::sync::mpsc;

use crate::events::Event;

pub trait NotificationSink {
    fn notify(&self, event: &Event);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _event: &Event) {}
}

/// Writes notable events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &Event) {
        if event.is_notable() {
            tracing::info!(target: "skillforge::notify", "{}", event.headline());
        } else {
            tracing::debug!(target: "skillforge::notify", "{}", event.headline());
        }
    }
}

/// Forwards every event over an unbounded channel.
///
/// A dropped receiver is not an error; events are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: &Event) {
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!("notification receiver dropped");
        }
    }
}
