//! Consumer-facing asynchronous streams.
//!
//! Both stream flavors are lazy and backpressured: each holds a one-element
//! buffer, and an emitter suspends until the buffered element is consumed.
//! Iteration ends normally (`None`) when the subscription is closed
//! bus-side; dropping a stream is the consumer-side equivalent and is
//! observed by the bus on its next emission.

pub(crate) mod channel;
pub(crate) mod registry;

use std::fmt;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::{Event, EventRecord};

/// Per-name subscription yielding shared payloads of one event type.
///
/// Created by [`EventBus::subscribe`](crate::EventBus::subscribe).
/// Implements [`futures::Stream`]; [`EventStream::recv`] is the inherent
/// equivalent for plain `while let` loops.
pub struct EventStream<T: Event> {
    rx: mpsc::Receiver<Arc<T>>,
    closed: CancellationToken,
}

impl<T: Event> EventStream<T> {
    pub(crate) fn new(rx: mpsc::Receiver<Arc<T>>, closed: CancellationToken) -> Self {
        Self { rx, closed }
    }

    /// Receive the next payload; `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Whether the subscription was closed bus-side.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl<T: Event> Stream for EventStream<T> {
    type Item = Arc<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed.is_cancelled() {
            // close discards the buffered element as well
            this.rx.close();
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl<T: Event> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("event", &T::event_name())
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Bus-wide subscription (a tap) yielding one [`EventRecord`] per emission,
/// regardless of event type.
///
/// Created by [`EventBus::subscribe_all`](crate::EventBus::subscribe_all).
pub struct BusStream {
    rx: mpsc::Receiver<EventRecord>,
    closed: CancellationToken,
}

impl BusStream {
    pub(crate) fn new(rx: mpsc::Receiver<EventRecord>, closed: CancellationToken) -> Self {
        Self { rx, closed }
    }

    /// Receive the next record; `None` once the tap is closed.
    pub async fn recv(&mut self) -> Option<EventRecord> {
        poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Whether the tap was closed bus-side.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl Stream for BusStream {
    type Item = EventRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed.is_cancelled() {
            this.rx.close();
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl fmt::Debug for BusStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusStream")
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}
