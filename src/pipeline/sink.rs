use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use crate::events::WireEvent;

/// The consumer went away; no further events will be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event consumer disconnected")]
pub struct SinkClosed;

/// Hand-off point between a pipeline run and whoever consumes its events
///
/// `send` resolves once the event has been accepted, which is what gives the runner its
/// back-pressure.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event
    async fn send(&self, event: WireEvent) -> Result<(), SinkClosed>;

    /// Whether the consumer has already gone away
    fn is_closed(&self) -> bool;
}

#[async_trait]
impl EventSink for mpsc::Sender<WireEvent> {
    async fn send(&self, event: WireEvent) -> Result<(), SinkClosed> {
        mpsc::Sender::send(self, event).await.map_err(|_| SinkClosed)
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}
