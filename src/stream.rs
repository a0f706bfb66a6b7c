//! Progress streams for generation sessions.
//!
//! A session reports its progress as `SessionEvent`s on a bounded channel.
//! Reporting never blocks and never fails the session: when the consumer is
//! slow or gone, events are dropped.

use std::path::PathBuf;
use std::pin::Pin;

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::trace;

/// Receiving half of a progress channel.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Progress reported by a `GenerationSession`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A phase event is about to be dispatched
    PhaseStarted { event: String },
    /// A phase event completed
    PhaseCompleted { event: String, handlers: usize },
    /// A file was finalized
    FileClosed { path: PathBuf },
    /// The session aborted
    Failed { event: String, message: String },
    /// The session reached its end
    Finished,
}

/// Non-blocking sending half of a progress stream.
#[derive(Debug)]
pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> EventSender<T> {
    /// Wrap the sending half of a channel.
    pub fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }

    /// Queue an event, handing it back when the channel is full or closed.
    pub fn try_send(&self, event: T) -> Result<(), T> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(v) => v,
            mpsc::error::TrySendError::Closed(v) => v,
        })
    }

    /// Send an event, dropping it if it cannot be delivered right away.
    pub fn notify(&self, event: T)
    where
        T: std::fmt::Debug,
    {
        if let Err(dropped) = self.try_send(event) {
            trace!(event = ?dropped, "progress event dropped");
        }
    }

    /// Whether the stream has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots left in the channel.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Configures the channel behind a progress stream.
///
/// # Example
///
/// ```rust
/// use featurekit::{SessionEvent, StreamBuilder};
///
/// let (sender, _stream) = StreamBuilder::<SessionEvent>::new()
///     .buffer_size(16)
///     .build();
///
/// sender.notify(SessionEvent::Finished);
/// ```
pub struct StreamBuilder<T> {
    buffer_size: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Send + 'static> StreamBuilder<T> {
    /// A builder with a 256 event buffer.
    pub fn new() -> Self {
        Self {
            buffer_size: 256,
            _marker: std::marker::PhantomData,
        }
    }

    /// Channel capacity. Zero is raised to one.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Open the channel.
    pub fn build(self) -> (EventSender<T>, EventStream<T>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let sender = EventSender::new(tx);
        let stream: EventStream<T> = Box::pin(ReceiverStream::new(rx));
        (sender, stream)
    }
}

impl<T: Send + 'static> Default for StreamBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a channel with the default buffer.
pub fn create_stream<T: Send + 'static>() -> (EventSender<T>, EventStream<T>) {
    StreamBuilder::<T>::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_notify_delivers_in_order() {
        let (sender, stream) = create_stream::<SessionEvent>();

        sender.notify(SessionEvent::PhaseStarted {
            event: "x.on_start".to_string(),
        });
        sender.notify(SessionEvent::Finished);
        drop(sender);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(
            events,
            vec![
                SessionEvent::PhaseStarted {
                    event: "x.on_start".to_string()
                },
                SessionEvent::Finished,
            ]
        );
    }

    #[tokio::test]
    async fn test_notify_drops_when_full() {
        let (sender, stream) = StreamBuilder::<u32>::new().buffer_size(1).build();

        sender.notify(1);
        sender.notify(2);
        assert!(sender.try_send(3).is_err());
        drop(sender);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events, vec![1]);
    }

    #[test]
    fn test_notify_after_receiver_dropped() {
        let (sender, stream) = create_stream::<u32>();
        drop(stream);
        assert!(sender.is_closed());
        sender.notify(1);
    }

    #[test]
    fn test_sender_clone_shares_channel() {
        let (sender, _stream) = StreamBuilder::<u32>::new().buffer_size(4).build();
        let other = sender.clone();
        sender.notify(1);
        other.notify(2);
        assert_eq!(sender.capacity(), 2);
    }
}
