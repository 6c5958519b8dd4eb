//! Channel bookkeeping for per-name and bus-wide subscriptions.
//!
//! Per-name channels live in a `TypeId`-keyed map; each key owns a close
//! guard (a cancellation token) and an ordered writer list. The guard is
//! what lets a bus-wide close reach typed channels without knowing their
//! payload type: cancelling it closes every child channel at once.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::event::{Event, EventRecord};
use crate::stream::channel::ChannelWriter;
use crate::stream::{BusStream, EventStream};

/// Type-independent view of one event type's channel list.
trait ChannelGroup: Send + Sync {
    fn open_count(&self) -> usize;
    /// Cancel the guard and drop every writer. Returns how many open
    /// channels were closed.
    fn close(&mut self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedGroup<T: Event> {
    guard: CancellationToken,
    writers: Vec<ChannelWriter<Arc<T>>>,
}

impl<T: Event> TypedGroup<T> {
    fn new() -> Self {
        Self {
            guard: CancellationToken::new(),
            writers: Vec::new(),
        }
    }
}

impl<T: Event> ChannelGroup for TypedGroup<T> {
    fn open_count(&self) -> usize {
        self.writers.iter().filter(|writer| writer.is_open()).count()
    }

    fn close(&mut self) -> usize {
        let closed = self.open_count();
        self.guard.cancel();
        self.writers.clear();
        closed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-name channel lists keyed by event type.
pub(crate) struct StreamRegistry {
    groups: DashMap<TypeId, Box<dyn ChannelGroup>>,
}

impl StreamRegistry {
    pub(crate) fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Open a channel for `T` and append its write side, pruning writers
    /// whose consumers are already gone.
    pub(crate) fn open<T: Event>(&self) -> EventStream<T> {
        let mut slot = self
            .groups
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(TypedGroup::<T>::new()) as Box<dyn ChannelGroup>);
        let group = slot
            .as_any_mut()
            .downcast_mut::<TypedGroup<T>>()
            .expect("channel group type matches its TypeId key");
        group.writers.retain(|writer| writer.is_open());

        let (writer, rx, closed) = ChannelWriter::open(&group.guard);
        trace!(event = T::event_name(), channel = %writer.id(), "stream opened");
        group.writers.push(writer);
        EventStream::new(rx, closed)
    }

    /// Clone the writers for `T`, in subscription order.
    pub(crate) fn snapshot<T: Event>(&self) -> Vec<ChannelWriter<Arc<T>>> {
        self.groups
            .get(&TypeId::of::<T>())
            .and_then(|group| {
                group
                    .as_any()
                    .downcast_ref::<TypedGroup<T>>()
                    .map(|group| group.writers.clone())
            })
            .unwrap_or_default()
    }

    /// Drop writers whose channels were found closed during an emission.
    /// Returns how many were actually removed; a concurrent sweep or close
    /// may have pruned some of the ids first.
    pub(crate) fn sweep<T: Event>(&self, dead: &[Uuid]) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let type_id = TypeId::of::<T>();
        let mut pruned = 0;
        if let Some(mut slot) = self.groups.get_mut(&type_id) {
            if let Some(group) = slot.as_any_mut().downcast_mut::<TypedGroup<T>>() {
                let before = group.writers.len();
                group.writers.retain(|writer| !dead.contains(&writer.id()));
                pruned = before - group.writers.len();
                if pruned > 0 {
                    debug!(event = T::event_name(), pruned, "closed streams pruned");
                }
            }
        }
        self.groups.remove_if(&type_id, |_, group| group.open_count() == 0);
        pruned
    }

    /// Close every channel for `T`; the whole key leaves the registry.
    pub(crate) fn close<T: Event>(&self) -> usize {
        match self.groups.remove(&TypeId::of::<T>()) {
            Some((_, mut group)) => {
                let closed = group.close();
                debug!(event = T::event_name(), closed, "per-name streams closed");
                closed
            }
            None => 0,
        }
    }

    /// Close every channel for every name.
    pub(crate) fn close_all(&self) -> usize {
        let mut closed = 0;
        self.groups.retain(|_, group| {
            closed += group.close();
            false
        });
        closed
    }

    pub(crate) fn count<T: Event>(&self) -> usize {
        self.groups
            .get(&TypeId::of::<T>())
            .map(|group| group.open_count())
            .unwrap_or(0)
    }

    pub(crate) fn total(&self) -> usize {
        self.groups.iter().map(|group| group.open_count()).sum()
    }
}

impl fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("events", &self.groups.len())
            .field("open", &self.total())
            .finish()
    }
}

struct TapListInner {
    guard: CancellationToken,
    writers: Vec<ChannelWriter<EventRecord>>,
}

/// Ordered bus-wide channel list.
pub(crate) struct GlobalTaps {
    inner: RwLock<TapListInner>,
}

impl GlobalTaps {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(TapListInner {
                guard: CancellationToken::new(),
                writers: Vec::new(),
            }),
        }
    }

    /// Open a bus-wide channel and append its write side.
    pub(crate) fn open(&self) -> BusStream {
        let mut inner = self.inner.write();
        inner.writers.retain(|writer| writer.is_open());

        let (writer, rx, closed) = ChannelWriter::open(&inner.guard);
        debug!(channel = %writer.id(), "bus-wide stream opened");
        inner.writers.push(writer);
        BusStream::new(rx, closed)
    }

    /// Clone the current writers, in subscription order.
    pub(crate) fn snapshot(&self) -> Vec<ChannelWriter<EventRecord>> {
        self.inner.read().writers.clone()
    }

    /// Drop writers whose channels were found closed during an emission.
    /// Returns how many were actually removed.
    pub(crate) fn sweep(&self, dead: &[Uuid]) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let mut inner = self.inner.write();
        let before = inner.writers.len();
        inner.writers.retain(|writer| !dead.contains(&writer.id()));
        let pruned = before - inner.writers.len();
        if pruned > 0 {
            debug!(pruned, "closed bus-wide streams pruned");
        }
        pruned
    }

    /// Close every bus-wide channel. A fresh guard is installed so new
    /// subscriptions start from a clean slate.
    pub(crate) fn close(&self) -> usize {
        let mut inner = self.inner.write();
        let closed = inner.writers.iter().filter(|writer| writer.is_open()).count();
        inner.guard.cancel();
        inner.writers.clear();
        inner.guard = CancellationToken::new();
        closed
    }

    pub(crate) fn count(&self) -> usize {
        self.inner
            .read()
            .writers
            .iter()
            .filter(|writer| writer.is_open())
            .count()
    }
}

impl fmt::Debug for GlobalTaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalTaps").field("open", &self.count()).finish()
    }
}
