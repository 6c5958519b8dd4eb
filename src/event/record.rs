//! Type-erased records delivered to bus-wide subscribers.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::event::Event;

/// Process-wide record sequence. Strictly increasing, never reset.
static RECORD_SEQ: AtomicU64 = AtomicU64::new(0);

/// One emission as observed by a bus-wide stream.
///
/// A record is built once per emission, so every subscriber sees the same
/// sequence number, timestamp, and shared payload allocation. The payload
/// is type-erased; recover it with [`EventRecord::payload`] or
/// [`EventRecord::into_payload`], both of which check the concrete type.
///
/// ```rust
/// use typebus::{Event, EventBus};
///
/// #[derive(Debug)]
/// struct Ping;
///
/// impl Event for Ping {
///     fn event_name() -> &'static str {
///         "ping"
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> typebus::Result<()> {
/// let bus = EventBus::new();
/// let mut all = bus.subscribe_all();
///
/// bus.emit(Ping).await?;
///
/// let record = all.recv().await.expect("one record");
/// assert_eq!(record.name(), "ping");
/// assert!(record.is::<Ping>());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventRecord {
    seq: u64,
    name: &'static str,
    type_id: TypeId,
    emitted_at: DateTime<Utc>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl EventRecord {
    pub(crate) fn new<T: Event>(payload: Arc<T>) -> Self {
        Self {
            seq: RECORD_SEQ.fetch_add(1, Ordering::Relaxed),
            name: T::event_name(),
            type_id: TypeId::of::<T>(),
            emitted_at: Utc::now(),
            payload,
        }
    }

    /// Name of the event this record was produced from.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Sequence number of this record.
    ///
    /// Strictly increasing across the process, so records collected from
    /// several streams can be merged back into emission order.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// When the emission happened.
    pub fn emitted_at(&self) -> DateTime<Utc> {
        self.emitted_at
    }

    /// Whether this record carries a payload of type `T`.
    pub fn is<T: Event>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrow the payload as `T`.
    ///
    /// Returns `None` when the record was produced by a different event
    /// type.
    pub fn payload<T: Event>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Recover the shared payload, or hand the record back unchanged when
    /// it carries a different event type.
    pub fn into_payload<T: Event>(self) -> Result<Arc<T>, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        let Self {
            seq,
            name,
            type_id,
            emitted_at,
            payload,
        } = self;
        payload.downcast::<T>().map_err(|payload| Self {
            seq,
            name,
            type_id,
            emitted_at,
            payload,
        })
    }
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("seq", &self.seq)
            .field("name", &self.name)
            .field("emitted_at", &self.emitted_at)
            .finish_non_exhaustive()
    }
}
