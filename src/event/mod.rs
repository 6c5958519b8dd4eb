//! The event schema trait and the type-erased emission record.
//!
//! An event type plays two roles at once: its name (via
//! [`Event::event_name`]) identifies the event on the bus, and the type
//! itself is the payload shape. Because routing is keyed by `TypeId`, a
//! consumer can never observe a payload of the wrong shape.

use std::any::TypeId;
use std::fmt::Debug;

mod record;

pub use record::EventRecord;

/// Trait implemented by every type carried on the bus.
///
/// Implementations are plain data types; the set of events an application
/// understands is exactly the set of `Event` impls it links in. Payloads
/// fan out as [`Arc<T>`](std::sync::Arc), so `Clone` is only needed when a
/// consumer wants an owned copy.
///
/// # Example
///
/// ```rust
/// use typebus::Event;
///
/// #[derive(Debug)]
/// struct UserRegistered {
///     user_id: u64,
/// }
///
/// impl Event for UserRegistered {
///     fn event_name() -> &'static str {
///         "user-registered"
///     }
/// }
///
/// assert_eq!(UserRegistered::event_name(), "user-registered");
/// let _ = UserRegistered { user_id: 7 };
/// ```
pub trait Event: Send + Sync + Debug + 'static {
    /// Stable, human-readable name for this event type.
    ///
    /// Shown in logs, errors, and on the records bus-wide subscribers
    /// receive.
    fn event_name() -> &'static str;

    /// Routing key used by the bus registries.
    fn type_id() -> TypeId {
        TypeId::of::<Self>()
    }
}
