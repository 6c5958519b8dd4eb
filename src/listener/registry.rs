//! Registration-ordered listener storage keyed by event type.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::listener::Listener;

type ErasedInvoke = Arc<dyn Fn(&dyn Any) -> Result<()> + Send + Sync>;

/// One registered listener entry.
///
/// The typed callback is erased at registration time: the stored closure
/// downcasts the payload back to `T` and re-attaches the event name to any
/// error the callback returns. Entries are cloned into per-emission
/// snapshots; the `claimed` flag is shared across clones so a `once` entry
/// fires at most once even when emissions race.
#[derive(Clone)]
pub(crate) struct ListenerEntry {
    listener_id: Uuid,
    once: bool,
    claimed: Arc<AtomicBool>,
    handler: ErasedInvoke,
}

impl ListenerEntry {
    pub(crate) fn listener_id(&self) -> Uuid {
        self.listener_id
    }

    pub(crate) fn is_once(&self) -> bool {
        self.once
    }

    /// Claim a `once` entry for invocation. Returns `false` when another
    /// emission already claimed it.
    pub(crate) fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn invoke(&self, payload: &dyn Any) -> Result<()> {
        (self.handler)(payload)
    }
}

impl fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("listener_id", &self.listener_id)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

/// Listener entries per event type, held in registration order.
pub(crate) struct ListenerRegistry {
    entries: DashMap<TypeId, Vec<ListenerEntry>>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Append an entry for `T`. Duplicate identities become independent
    /// entries.
    pub(crate) fn insert<T: Event>(&self, listener: &Listener<T>, once: bool) {
        let callback = listener.clone();
        let handler: ErasedInvoke = Arc::new(move |payload: &dyn Any| {
            let event = payload
                .downcast_ref::<T>()
                .ok_or(Error::PayloadMismatch {
                    event: T::event_name(),
                })?;
            callback.call(event).map_err(|source| Error::ListenerFailed {
                event: T::event_name(),
                source,
            })
        });
        let entry = ListenerEntry {
            listener_id: listener.id(),
            once,
            claimed: Arc::new(AtomicBool::new(false)),
            handler,
        };
        self.entries.entry(TypeId::of::<T>()).or_default().push(entry);
        trace!(
            event = T::event_name(),
            listener = %listener.id(),
            label = listener.name(),
            once,
            "listener registered"
        );
    }

    /// Remove every entry for the key whose identity matches. Returns how
    /// many entries were removed.
    pub(crate) fn remove_matching(&self, type_id: TypeId, listener_id: Uuid) -> usize {
        let mut removed = 0;
        if let Some(mut entries) = self.entries.get_mut(&type_id) {
            let before = entries.len();
            entries.retain(|entry| entry.listener_id != listener_id);
            removed = before - entries.len();
        }
        if removed > 0 {
            self.entries.remove_if(&type_id, |_, entries| entries.is_empty());
        }
        removed
    }

    /// Drop the whole entry list for the key.
    pub(crate) fn remove_event(&self, type_id: TypeId) -> usize {
        self.entries
            .remove(&type_id)
            .map(|(_, entries)| entries.len())
            .unwrap_or(0)
    }

    /// Clear every entry for every key.
    pub(crate) fn clear(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entries| {
            removed += entries.len();
            false
        });
        removed
    }

    /// Clone the current entries for the key, in registration order.
    pub(crate) fn snapshot(&self, type_id: TypeId) -> Vec<ListenerEntry> {
        self.entries
            .get(&type_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, type_id: TypeId) -> usize {
        self.entries
            .get(&type_id)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    pub(crate) fn total(&self) -> usize {
        self.entries.iter().map(|entries| entries.len()).sum()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("events", &self.entries.len())
            .field("entries", &self.total())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug)]
    struct Tick(u32);

    impl Event for Tick {
        fn event_name() -> &'static str {
            "tick"
        }
    }

    fn recording_listener(seen: &Arc<Mutex<Vec<u32>>>, tag: u32) -> Listener<Tick> {
        let seen = Arc::clone(seen);
        Listener::new(move |_: &Tick| seen.lock().unwrap().push(tag))
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..4 {
            registry.insert(&recording_listener(&seen, tag), false);
        }

        let snapshot = registry.snapshot(TypeId::of::<Tick>());
        assert_eq!(snapshot.len(), 4);
        for entry in &snapshot {
            entry.invoke(&Tick(0)).unwrap();
        }
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn remove_matching_drops_every_clone_entry() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let twice = recording_listener(&seen, 1);
        let keeper = recording_listener(&seen, 2);

        registry.insert(&twice, false);
        registry.insert(&twice.clone(), false);
        registry.insert(&keeper, false);
        assert_eq!(registry.count(TypeId::of::<Tick>()), 3);

        let removed = registry.remove_matching(TypeId::of::<Tick>(), twice.id());
        assert_eq!(removed, 2);
        assert_eq!(registry.count(TypeId::of::<Tick>()), 1);

        let removed = registry.remove_matching(TypeId::of::<Tick>(), twice.id());
        assert_eq!(removed, 0);
    }

    #[test]
    fn empty_event_keys_are_dropped() {
        let registry = ListenerRegistry::new();
        let listener = Listener::new(|_: &Tick| {});
        registry.insert(&listener, false);

        registry.remove_matching(TypeId::of::<Tick>(), listener.id());
        assert_eq!(registry.total(), 0);
        assert!(registry.entries.is_empty());
    }

    #[test]
    fn clear_reports_the_removed_count() {
        let registry = ListenerRegistry::new();
        registry.insert(&Listener::new(|_: &Tick| {}), false);
        registry.insert(&Listener::new(|_: &Tick| {}), true);

        assert_eq!(registry.clear(), 2);
        assert_eq!(registry.total(), 0);
    }

    #[test]
    fn once_entries_claim_exactly_once() {
        let registry = ListenerRegistry::new();
        registry.insert(&Listener::new(|_: &Tick| {}), true);

        let snapshot = registry.snapshot(TypeId::of::<Tick>());
        let entry = &snapshot[0];
        assert!(entry.is_once());
        assert!(entry.claim());
        assert!(!entry.claim());

        // the live entry shares the claim flag with the snapshot
        let live = registry.snapshot(TypeId::of::<Tick>());
        assert!(!live[0].claim());
    }

    #[test]
    fn invoke_rejects_mismatched_payloads() {
        let registry = ListenerRegistry::new();
        registry.insert(&Listener::new(|_: &Tick| {}), false);

        let snapshot = registry.snapshot(TypeId::of::<Tick>());
        let err = snapshot[0].invoke(&"not a tick").unwrap_err();
        assert!(matches!(err, Error::PayloadMismatch { event: "tick" }));
    }

    #[test]
    fn listener_errors_carry_the_event_name() {
        let registry = ListenerRegistry::new();
        let failing = Listener::fallible(|_: &Tick| Err("boom".into()));
        registry.insert(&failing, false);

        let snapshot = registry.snapshot(TypeId::of::<Tick>());
        let err = snapshot[0].invoke(&Tick(1)).unwrap_err();
        assert_eq!(err.event(), "tick");
        assert!(err.is_listener_failure());
    }
}
