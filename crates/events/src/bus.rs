//! Fan-out of captured progress events to renderers.
//!
//! The capture side is an unbounded mpsc channel so [`KvdemoEventLayer`]
//! never blocks inside `on_event`. A forwarding task republishes every event
//! on a broadcast channel that renderers subscribe to.

use crate::event::KvdemoEvent;
use crate::layer::KvdemoEventLayer;
use tokio::sync::{broadcast, mpsc};

/// A walkthrough emits a few dozen events; this leaves room for slow terminals.
const CAPACITY: usize = 256;

/// Event bus between the tracing layer and the renderers.
///
/// The forwarding task runs until every layer handed out by
/// [`EventBus::layer`] and the bus itself are dropped.
#[derive(Debug)]
pub struct EventBus {
    capture: mpsc::UnboundedSender<KvdemoEvent>,
    fanout: broadcast::Sender<KvdemoEvent>,
}

impl EventBus {
    /// Create a bus and spawn its forwarding task on the current tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let (capture, mut captured) = mpsc::unbounded_channel::<KvdemoEvent>();
        let (fanout, _) = broadcast::channel(CAPACITY);

        let forward = fanout.clone();
        tokio::spawn(async move {
            while let Some(event) = captured.recv().await {
                // Nobody subscribed yet: the event is dropped
                let _ = forward.send(event);
            }
        });

        Self { capture, fanout }
    }

    /// A tracing layer that feeds this bus.
    #[must_use]
    pub fn layer(&self) -> KvdemoEventLayer {
        KvdemoEventLayer::new(self.capture.clone())
    }

    /// Subscribe to events captured after this call.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            inner: self.fanout.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A renderer's view of the bus.
#[derive(Debug)]
pub struct EventReceiver {
    inner: broadcast::Receiver<KvdemoEvent>,
}

impl EventReceiver {
    /// Next event, or `None` once every producer is gone.
    ///
    /// A receiver that falls behind skips the oldest events and logs how many.
    pub async fn recv(&mut self) -> Option<KvdemoEvent> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer fell behind, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
