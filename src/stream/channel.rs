//! Capacity-one channel plumbing between emitters and stream consumers.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-consumer queue depth. One unread element suspends the emitter until
/// the consumer takes it.
pub(crate) const CHANNEL_CAPACITY: usize = 1;

/// Outcome of pushing one value at a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    /// The channel accepted the value.
    Delivered,
    /// The channel is closed: its guard fired or the consumer dropped its
    /// stream. The value was discarded.
    Closed,
}

/// Write side of one subscriber channel.
#[derive(Clone)]
pub(crate) struct ChannelWriter<T> {
    id: Uuid,
    tx: mpsc::Sender<T>,
    closed: CancellationToken,
}

impl<T: Send> ChannelWriter<T> {
    /// Open a channel under the given close guard. Returns the write side,
    /// the raw receiver, and the channel's own close token (a child of the
    /// guard) for the read side.
    pub(crate) fn open(guard: &CancellationToken) -> (Self, mpsc::Receiver<T>, CancellationToken) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let closed = guard.child_token();
        let writer = Self {
            id: Uuid::new_v4(),
            tx,
            closed: closed.clone(),
        };
        (writer, rx, closed)
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the channel can still accept values.
    pub(crate) fn is_open(&self) -> bool {
        !self.closed.is_cancelled() && !self.tx.is_closed()
    }

    /// Push one value, suspending while the previous element is unread.
    ///
    /// Resolves to [`WriteOutcome::Closed`] without blocking further when
    /// the close guard fires mid-send or the consumer is gone.
    pub(crate) async fn forward(&self, value: T) -> WriteOutcome {
        if self.closed.is_cancelled() {
            return WriteOutcome::Closed;
        }
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => WriteOutcome::Closed,
            sent = self.tx.send(value) => match sent {
                Ok(()) => WriteOutcome::Delivered,
                Err(_) => WriteOutcome::Closed,
            },
        }
    }
}
