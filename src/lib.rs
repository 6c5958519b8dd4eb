//! # typebus
//!
//! A typed, in-process publish/subscribe bus for Tokio applications.
//!
//! ## Features
//!
//! - **Typed events**: every Rust type implementing [`Event`] is its own
//!   routing key; payloads arrive already downcast
//! - **Three consumption surfaces**: inline listeners, per-event async
//!   streams, and bus-wide taps, all fed by one emission path
//! - **Deterministic fan-out**: registration order within each surface,
//!   listeners before streams
//! - **Backpressured**: each stream holds one unread payload; emitters await
//!   acceptance instead of buffering without bound
//! - **Cheap to share**: the bus clones like a handle, registries included
//!
//! ## Quick Example
//!
//! ```rust
//! use typebus::{Event, EventBus, Listener};
//!
//! #[derive(Debug)]
//! struct UserRegistered {
//!     user_id: u64,
//!     email: String,
//! }
//!
//! impl Event for UserRegistered {
//!     fn event_name() -> &'static str {
//!         "user-registered"
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> typebus::Result<()> {
//!     let bus = EventBus::new();
//!
//!     // Synchronous listener, fired inline during emit.
//!     let greet = Listener::new(|e: &UserRegistered| println!("welcome, {}", e.email));
//!     bus.on(&greet);
//!
//!     // Backpressured async consumer.
//!     let mut registrations = bus.subscribe::<UserRegistered>();
//!
//!     bus.emit(UserRegistered {
//!         user_id: 123,
//!         email: "user@example.com".to_string(),
//!     })
//!     .await?;
//!
//!     assert_eq!(registrations.recv().await.unwrap().user_id, 123);
//!
//!     // Tearing the bus down ends every stream.
//!     bus.close_all();
//!     assert!(registrations.recv().await.is_none());
//!     Ok(())
//! }
//! ```

#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    unreachable_pub
)]

/// The event bus and its statistics
pub mod bus;

/// Error types and result aliases
pub mod error;

/// The event trait and bus-wide event records
pub mod event;

/// Synchronous callback listeners
pub mod listener;

/// Backpressured async streams
pub mod stream;

// Re-export commonly used types
pub use bus::{BusStats, EventBus};
pub use error::{Error, ListenerError, Result};
pub use event::{Event, EventRecord};
pub use listener::Listener;
pub use stream::{BusStream, EventStream};

/// Prelude module for convenient imports
///
/// # Example
/// ```rust
/// use typebus::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bus::{BusStats, EventBus};
    pub use crate::error::{Error, ListenerError, Result};
    pub use crate::event::{Event, EventRecord};
    pub use crate::listener::Listener;
    pub use crate::stream::{BusStream, EventStream};
}
