use thiserror::Error;

use crate::EventHandle;

/// Errors that can occur when managing the observers of an event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The handle is not attached to the event it was given to.
    ///
    /// Either the handle was issued by a different event, or it has already been detached.
    /// Detaching is not idempotent, so this typically indicates a double detach or handles that
    /// got mixed up between events.
    #[error("observer handle {handle} is not attached to this event")]
    UnknownHandle {
        /// The handle that was not found.
        handle: EventHandle,
    },
}

/// A specialized `Result` type for event operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
