//! Synchronous listeners.
//!
//! A [`Listener`] wraps a callback invoked inline during emission, in
//! registration order. Listeners are cheap to clone and all clones share
//! one identity; removal matches on that identity, so keep a clone around
//! if you intend to call [`EventBus::off`](crate::EventBus::off) later.

pub(crate) mod registry;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::ListenerError;
use crate::event::Event;

type Callback<T> = dyn Fn(&T) -> Result<(), ListenerError> + Send + Sync;

/// A synchronous callback for events of type `T`.
///
/// Registering the same listener (or a clone of it) twice yields two
/// independent entries: the callback runs once per entry per emission, and
/// `off` removes every entry with the listener's identity.
///
/// # Example
///
/// ```rust
/// use typebus::{Event, Listener};
///
/// #[derive(Debug)]
/// struct Tick(u64);
///
/// impl Event for Tick {
///     fn event_name() -> &'static str {
///         "tick"
///     }
/// }
///
/// let audit = Listener::new(|tick: &Tick| {
///     println!("tick {}", tick.0);
/// })
/// .with_name("audit");
///
/// assert_eq!(audit.name(), Some("audit"));
/// assert_eq!(audit.clone().id(), audit.id());
/// ```
pub struct Listener<T: Event> {
    id: Uuid,
    label: Option<Cow<'static, str>>,
    callback: Arc<Callback<T>>,
}

impl<T: Event> Listener<T> {
    /// Wrap an infallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::fallible(move |event| {
            callback(event);
            Ok(())
        })
    }

    /// Wrap a callback that may fail.
    ///
    /// An error aborts the emission that invoked it and propagates out of
    /// [`EventBus::emit`](crate::EventBus::emit) with the event name
    /// attached.
    pub fn fallible<F>(callback: F) -> Self
    where
        F: Fn(&T) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            label: None,
            callback: Arc::new(callback),
        }
    }

    /// Attach a label shown in logs and `Debug` output.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(name.into());
        self
    }

    /// Identity shared by every clone of this listener.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The label attached via [`Listener::with_name`], if any.
    pub fn name(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn call(&self, event: &T) -> Result<(), ListenerError> {
        (self.callback)(event)
    }
}

impl<T: Event> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            label: self.label.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T: Event> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("event", &T::event_name())
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Tick(u32);

    impl Event for Tick {
        fn event_name() -> &'static str {
            "tick"
        }
    }

    #[test]
    fn clones_share_identity() {
        let listener = Listener::new(|_: &Tick| {});
        let clone = listener.clone();
        assert_eq!(listener.id(), clone.id());

        let other = Listener::new(|_: &Tick| {});
        assert_ne!(listener.id(), other.id());
    }

    #[test]
    fn call_runs_the_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let listener = Listener::new(move |_: &Tick| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        listener.call(&Tick(1)).unwrap();
        listener.call(&Tick(2)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fallible_callback_errors_pass_through() {
        let listener = Listener::fallible(|tick: &Tick| {
            if tick.0 == 0 {
                return Err(ListenerError::from("zero tick"));
            }
            Ok(())
        });

        assert!(listener.call(&Tick(1)).is_ok());
        let err = listener.call(&Tick(0)).unwrap_err();
        assert_eq!(err.to_string(), "zero tick");
    }

    #[test]
    fn labels_surface_in_debug_output() {
        let listener = Listener::new(|_: &Tick| {}).with_name("metrics");
        assert_eq!(listener.name(), Some("metrics"));
        let debug = format!("{listener:?}");
        assert!(debug.contains("metrics"));
        assert!(debug.contains("tick"));
    }
}
