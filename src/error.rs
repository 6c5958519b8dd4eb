//! Error types for bus operations.
//!
//! The bus has exactly one user-visible failure mode: a listener returning
//! an error during emission. Channel-side conditions (a consumer dropping
//! its stream, a channel closed mid-write) are ordinary lifecycle events
//! and never surface as errors.

use thiserror::Error;

/// Convenient result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error a fallible listener may return.
///
/// Listeners keep their own error types and convert with `?` or `.into()`;
/// the bus wraps whatever comes back together with the event name.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`EventBus`](crate::EventBus) operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A listener returned an error while an event was being delivered.
    ///
    /// Emission is fail-fast: the remaining listeners and every channel
    /// write for that emission are skipped, and deliveries that already
    /// happened are not rolled back.
    #[error("listener for event `{event}` failed: {source}")]
    ListenerFailed {
        /// Name of the event whose listener failed.
        event: &'static str,
        /// The error the listener returned.
        #[source]
        source: ListenerError,
    },

    /// A type-erased payload did not match the type it was registered
    /// under.
    ///
    /// Registries key their entries by `TypeId`, so this cannot be reached
    /// through the public API; it guards the internal downcast path instead
    /// of panicking.
    #[error("payload type mismatch for event `{event}`")]
    PayloadMismatch {
        /// Name of the event whose payload failed to downcast.
        event: &'static str,
    },
}

impl Error {
    /// Name of the event involved in this error.
    pub fn event(&self) -> &'static str {
        match self {
            Self::ListenerFailed { event, .. } => event,
            Self::PayloadMismatch { event } => event,
        }
    }

    /// Whether this error came out of a listener callback.
    pub fn is_listener_failure(&self) -> bool {
        matches!(self, Self::ListenerFailed { .. })
    }
}
