//! The bus itself: registration surface plus the single emission path.
//!
//! An [`EventBus`] owns three registries. Listeners are synchronous callbacks
//! fired inline during [`emit`](EventBus::emit). Per-name streams and
//! bus-wide streams are backpressured channels drained by async consumers.
//! One emission walks all three in a fixed order.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::error::Result;
use crate::event::{Event, EventRecord};
use crate::listener::registry::ListenerRegistry;
use crate::listener::Listener;
use crate::stream::channel::WriteOutcome;
use crate::stream::registry::{GlobalTaps, StreamRegistry};
use crate::stream::{BusStream, EventStream};

/// A typed, in-process publish/subscribe bus.
///
/// Producers call [`emit`](EventBus::emit); consumers attach through three
/// surfaces that share the one emission path:
///
/// * [`on`](EventBus::on) / [`once`](EventBus::once) register synchronous
///   [`Listener`]s, invoked inline in registration order.
/// * [`subscribe`](EventBus::subscribe) opens a backpressured stream of one
///   event type's payloads.
/// * [`subscribe_all`](EventBus::subscribe_all) opens a backpressured stream
///   of [`EventRecord`]s covering every event type.
///
/// The bus is cheap to clone; clones share all registries.
///
/// # Example
///
/// ```
/// use typebus::{Event, EventBus, Listener};
///
/// #[derive(Debug)]
/// struct Deployed {
///     version: u32,
/// }
///
/// impl Event for Deployed {
///     fn event_name() -> &'static str {
///         "deployed"
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> typebus::Result<()> {
/// let bus = EventBus::new();
///
/// let announce = Listener::new(|e: &Deployed| println!("deployed v{}", e.version));
/// bus.on(&announce);
///
/// let mut stream = bus.subscribe::<Deployed>();
/// bus.emit(Deployed { version: 3 }).await?;
///
/// assert_eq!(stream.recv().await.unwrap().version, 3);
/// bus.close_all();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    listeners: ListenerRegistry,
    streams: StreamRegistry,
    taps: GlobalTaps,
    emitted: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: ListenerRegistry::new(),
                streams: StreamRegistry::new(),
                taps: GlobalTaps::new(),
                emitted: AtomicU64::new(0),
            }),
        }
    }

    /// Register a listener for every future emission of `T`.
    ///
    /// Registrations are not deduplicated: adding the same listener twice
    /// fires it twice per emission, in registration order.
    pub fn on<T: Event>(&self, listener: &Listener<T>) -> &Self {
        self.inner.listeners.insert(listener, false);
        self
    }

    /// Register a listener for the next emission of `T` only.
    ///
    /// The registration is consumed by its first invocation, even one that
    /// returns an error.
    pub fn once<T: Event>(&self, listener: &Listener<T>) -> &Self {
        self.inner.listeners.insert(listener, true);
        self
    }

    /// Remove every registration of this listener for `T`.
    ///
    /// Clones of a [`Listener`] share its identity, so any clone removes
    /// them all. Removal does not reach into an emission already snapshotted
    /// (see [`emit`](EventBus::emit)).
    pub fn off<T: Event>(&self, listener: &Listener<T>) -> &Self {
        let removed = self
            .inner
            .listeners
            .remove_matching(TypeId::of::<T>(), listener.id());
        trace!(event = T::event_name(), removed, "listener removed");
        self
    }

    /// Remove every listener registered for `T`. Streams are untouched.
    pub fn off_all<T: Event>(&self) -> &Self {
        let removed = self.inner.listeners.remove_event(TypeId::of::<T>());
        trace!(event = T::event_name(), removed, "listeners removed");
        self
    }

    /// Remove every listener for every event type. Streams are untouched.
    pub fn clear_listeners(&self) -> &Self {
        let removed = self.inner.listeners.clear();
        debug!(removed, "listener registry cleared");
        self
    }

    /// Open a stream of `T` payloads.
    ///
    /// Each call opens an independent channel; past emissions are not
    /// replayed. The channel holds one unread payload, so an emitter suspends
    /// until this consumer catches up. The stream ends when
    /// [`close`](EventBus::close) or [`close_all`](EventBus::close_all) is
    /// called, or when it is dropped.
    pub fn subscribe<T: Event>(&self) -> EventStream<T> {
        self.inner.streams.open::<T>()
    }

    /// Open a stream of [`EventRecord`]s, one per emission of any type.
    ///
    /// Same channel semantics as [`subscribe`](EventBus::subscribe); the
    /// stream ends on [`close_all`](EventBus::close_all) or drop.
    pub fn subscribe_all(&self) -> BusStream {
        self.inner.taps.open()
    }

    /// Emit an event, resolving once the full fan-out has been attempted.
    ///
    /// Delivery walks three steps in order, each exhaustive before the next:
    ///
    /// 1. Listeners for `T`, in registration order, from a snapshot taken at
    ///    call time. Listeners added during this emission wait for the next
    ///    one; listeners removed during it still fire if snapshotted.
    /// 2. Bus-wide streams, in subscription order, awaiting each channel's
    ///    acceptance.
    /// 3. Streams for `T`, in subscription order, likewise.
    ///
    /// A listener error aborts the remaining fan-out and surfaces as
    /// [`Error::ListenerFailed`](crate::Error::ListenerFailed). Deliveries
    /// already made are not rolled back. A stream consumer that never reads
    /// suspends this call indefinitely; close the event type or drop the
    /// stream to release it.
    pub async fn emit<T: Event>(&self, event: T) -> Result<()> {
        self.emit_arc(Arc::new(event)).await
    }

    /// Emit an already shared payload without copying it.
    ///
    /// Every stream consumer receives a clone of this [`Arc`]. Semantics are
    /// otherwise identical to [`emit`](EventBus::emit).
    pub async fn emit_arc<T: Event>(&self, event: Arc<T>) -> Result<()> {
        let type_id = TypeId::of::<T>();
        trace!(event = T::event_name(), "emit");

        let entries = self.inner.listeners.snapshot(type_id);
        for entry in &entries {
            if entry.is_once() {
                if !entry.claim() {
                    continue;
                }
                let outcome = entry.invoke(event.as_ref());
                self.inner
                    .listeners
                    .remove_matching(type_id, entry.listener_id());
                outcome?;
            } else {
                entry.invoke(event.as_ref())?;
            }
        }

        let taps = self.inner.taps.snapshot();
        if !taps.is_empty() {
            let record = EventRecord::new(Arc::clone(&event));
            let mut dead = Vec::new();
            for tap in &taps {
                if tap.forward(record.clone()).await == WriteOutcome::Closed {
                    dead.push(tap.id());
                }
            }
            self.inner.taps.sweep(&dead);
        }

        let writers = self.inner.streams.snapshot::<T>();
        let mut dead = Vec::new();
        for writer in &writers {
            if writer.forward(Arc::clone(&event)).await == WriteOutcome::Closed {
                dead.push(writer.id());
            }
        }
        self.inner.streams.sweep::<T>(&dead);

        self.inner.emitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Tear down everything registered for `T`: listeners are dropped and
    /// per-name streams end. Other event types and bus-wide streams are
    /// untouched.
    ///
    /// Returns the number of registrations removed. Closing a type with no
    /// registrations is a no-op returning zero.
    pub fn close<T: Event>(&self) -> usize {
        let listeners = self.inner.listeners.remove_event(TypeId::of::<T>());
        let streams = self.inner.streams.close::<T>();
        debug!(event = T::event_name(), listeners, streams, "event closed");
        listeners + streams
    }

    /// Tear down the whole bus: every listener, every per-name stream, every
    /// bus-wide stream. The bus returns to its initial empty state and can
    /// be reused.
    ///
    /// Returns the number of registrations removed. Idempotent.
    pub fn close_all(&self) -> usize {
        let listeners = self.inner.listeners.clear();
        let streams = self.inner.streams.close_all();
        let taps = self.inner.taps.close();
        info!(listeners, streams, taps, "bus closed");
        listeners + streams + taps
    }

    /// Number of listeners currently registered for `T`.
    pub fn listener_count<T: Event>(&self) -> usize {
        self.inner.listeners.count(TypeId::of::<T>())
    }

    /// Number of open streams for `T`.
    pub fn stream_count<T: Event>(&self) -> usize {
        self.inner.streams.count::<T>()
    }

    /// Number of open bus-wide streams.
    pub fn tap_count(&self) -> usize {
        self.inner.taps.count()
    }

    /// A point-in-time snapshot of bus registrations and traffic.
    pub fn stats(&self) -> BusStats {
        BusStats {
            events_emitted: self.inner.emitted.load(Ordering::Relaxed),
            listeners: self.inner.listeners.total(),
            streams: self.inner.streams.total(),
            taps: self.inner.taps.count(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.listeners.total())
            .field("streams", &self.inner.streams.total())
            .field("taps", &self.inner.taps.count())
            .finish()
    }
}

/// Point-in-time counters reported by [`EventBus::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusStats {
    /// Emissions that completed their full fan-out.
    pub events_emitted: u64,
    /// Listener registrations across every event type.
    pub listeners: usize,
    /// Open per-name streams across every event type.
    pub streams: usize,
    /// Open bus-wide streams.
    pub taps: usize,
}

impl fmt::Display for BusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} emitted, {} listeners, {} streams, {} taps",
            self.events_emitted, self.listeners, self.streams, self.taps
        )
    }
}
