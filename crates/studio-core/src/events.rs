//! Fire-and-forget domain events.
//!
//! Publishing never blocks and never fails the caller: a full or closed
//! channel is logged and the event dropped.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::storage::ImageRecord;

/// Default channel depth.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum StudioEvent {
    /// A generation completed and was persisted.
    ImageGenerated { record: ImageRecord },
}

#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<StudioEvent>,
}

impl EventPublisher {
    /// A publisher plus the receiving end, for callers that consume events
    /// themselves.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StudioEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// A publisher whose events are drained by a background logging task.
    pub fn spawn(capacity: usize) -> Self {
        let (publisher, rx) = Self::channel(capacity);
        tokio::spawn(log_events(rx));
        publisher
    }

    pub fn publish(&self, event: StudioEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("event channel full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("event listener gone; dropping event");
            }
        }
    }
}

async fn log_events(mut rx: mpsc::Receiver<StudioEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            StudioEvent::ImageGenerated { record } => info!(
                id = %record.id,
                mode = %record.mode,
                generation_time_ms = record.generation_time_ms,
                "image generated"
            ),
        }
    }
}
