//! Queue change notifications.
//!
//! Every mutating queue call publishes the current pending count. Any number
//! of subscribers can listen independently; closing the notifier ends every
//! subscription.

use futures_util::future;
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;

/// Buffered notifications per subscriber before the oldest are dropped
const CHANNEL_CAPACITY: usize = 64;

/// Publish side of the queue-changed channel
#[derive(Debug)]
pub struct QueueNotifier {
    sender: RwLock<Option<broadcast::Sender<usize>>>,
}

impl QueueNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender: RwLock::new(Some(sender)),
        }
    }

    /// Publish `pending_count`. Returns how many subscribers received it.
    pub async fn notify(&self, pending_count: usize) -> usize {
        match self.sender.read().await.as_ref() {
            Some(sender) => match sender.send(pending_count) {
                Ok(receivers) => receivers,
                Err(_) => {
                    tracing::trace!("[QUEUE] No subscribers for queue change ({})", pending_count);
                    0
                }
            },
            None => 0,
        }
    }

    /// New independent subscription, `None` once closed
    pub async fn subscribe(&self) -> Option<QueueSubscription> {
        self.sender
            .read()
            .await
            .as_ref()
            .map(|sender| QueueSubscription {
                receiver: sender.subscribe(),
            })
    }

    /// Drop the sender so every subscription ends
    pub async fn close(&self) {
        self.sender.write().await.take();
    }

    pub async fn is_closed(&self) -> bool {
        self.sender.read().await.is_none()
    }
}

impl Default for QueueNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive side of the queue-changed channel
#[derive(Debug)]
pub struct QueueSubscription {
    receiver: broadcast::Receiver<usize>,
}

impl QueueSubscription {
    /// Next pending count, or `None` once the queue is disposed.
    ///
    /// A subscriber that falls behind skips straight to the newest values.
    pub async fn recv(&mut self) -> Option<usize> {
        loop {
            match self.receiver.recv().await {
                Ok(count) => return Some(count),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("[QUEUE] Subscriber lagged, skipped {} notifications", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Consume everything buffered without waiting and return the newest count
    pub fn try_latest(&mut self) -> Option<usize> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(count) => latest = Some(count),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return latest,
            }
        }
    }

    /// Adapt into a `Stream` of pending counts
    pub fn into_stream(self) -> impl Stream<Item = usize> + Send + Unpin {
        BroadcastStream::new(self.receiver).filter_map(|item| future::ready(item.ok()))
    }
}
