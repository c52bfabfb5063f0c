//! Thread-safe multi-observer events.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{Error, EventHandle, EventId, ObserverRegistry};

type SyncObserver<A, R> = Arc<dyn Fn(&A) -> R + Send + Sync>;

/// An event that broadcasts to any number of observers and can be shared between threads.
///
/// This is the thread-safe counterpart of [`LocalEvent`][crate::LocalEvent], with the same
/// semantics: observers are attached and detached via [`EventHandle`]s, and each broadcast
/// calls every attached observer synchronously on the broadcasting thread, in attachment order.
/// Observers must be `Send + Sync` because any thread may invoke the event.
///
/// Attaching, detaching and broadcasting may happen concurrently from any number of threads.
/// A single lock guards the set of observers. It is held only while the set is modified or
/// copied, never while observers run. Each broadcast delivers to a snapshot of the observers
/// taken when the broadcast starts:
///
/// * An observer attached while a broadcast is in progress is not called by that broadcast.
/// * An observer detached while a broadcast is in progress may still be called by that broadcast
///   if the broadcast had already taken its snapshot. This also means `detach()` returning does
///   not guarantee the observer is no longer running on another thread.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::thread;
///
/// use multicast::Event;
///
/// let event = Arc::new(Event::<u64>::new());
/// let total = Arc::new(AtomicU64::new(0));
///
/// event.attach({
///     let total = Arc::clone(&total);
///     move |value| {
///         total.fetch_add(*value, Ordering::Relaxed);
///     }
/// });
///
/// thread::scope(|s| {
///     for value in 1..=4 {
///         let event = Arc::clone(&event);
///         s.spawn(move || event.invoke(&value));
///     }
/// });
///
/// assert_eq!(total.load(Ordering::Relaxed), 10);
/// ```
pub struct Event<A, R = ()> {
    registry: Mutex<ObserverRegistry<SyncObserver<A, R>>>,
}

impl<A, R> Event<A, R> {
    /// Creates an event with no observers.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(ObserverRegistry::new()),
        }
    }

    /// The identity of this event. Every handle issued by this event carries it.
    #[must_use]
    #[inline]
    pub fn id(&self) -> EventId {
        self.registry.lock().event_id()
    }

    /// Attaches an observer that will be called by every broadcast that starts after this returns.
    ///
    /// Returns a handle that is unique among all handles ever issued in this process.
    ///
    /// # Panics
    ///
    /// Panics if this event has already issued `u64::MAX` handles.
    pub fn attach<F>(&self, observer: F) -> EventHandle
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        let observer: SyncObserver<A, R> = Arc::new(observer);
        self.registry.lock().insert(observer)
    }

    /// Detaches the observer identified by `handle`.
    ///
    /// Broadcasts that start after this returns will not call the observer. Broadcasts already in
    /// progress on other threads may still call it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHandle`] if the handle was issued by a different event or has
    /// already been detached.
    pub fn detach(&self, handle: EventHandle) -> Result<(), Error> {
        let observer = self.registry.lock().remove(handle)?;

        // Dropping the observer may run arbitrary code, so the lock must already be released.
        drop(observer);

        Ok(())
    }

    /// Whether `handle` identifies an observer currently attached to this event.
    ///
    /// With concurrent detaches in play, the answer may be outdated by the time it is used.
    #[must_use]
    pub fn is_attached(&self, handle: EventHandle) -> bool {
        self.registry.lock().contains(handle)
    }

    /// Number of attached observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    /// Whether no observers are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Detaches all observers.
    ///
    /// Every previously issued handle becomes unknown to this event. Handles issued afterwards
    /// are still distinct from all earlier ones.
    pub fn clear(&self) {
        let observers = self.registry.lock().take_all();
        drop(observers);
    }

    fn snapshot(&self) -> Vec<SyncObserver<A, R>> {
        let registry = self.registry.lock();

        trace!(event = %registry.event_id(), observers = registry.len(), "broadcasting");

        registry.snapshot()
    }
}

impl<A> Event<A> {
    /// Delivers `args` to every attached observer, in attachment order, on the calling thread.
    ///
    /// # Panics
    ///
    /// If an observer panics, the panic propagates to the caller and the remaining observers are
    /// not called by this broadcast. The event itself remains usable.
    pub fn invoke(&self, args: &A) {
        for observer in self.snapshot() {
            observer(args);
        }
    }
}

impl<A, E> Event<A, Result<(), E>> {
    /// Delivers `args` to every attached observer, in attachment order, stopping at the first
    /// observer that fails.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing observer. Observers attached after it are not
    /// called by this broadcast.
    pub fn try_invoke(&self, args: &A) -> Result<(), E> {
        for (position, observer) in self.snapshot().into_iter().enumerate() {
            if let Err(error) = observer(args) {
                debug!(event = %self.id(), position, "observer failed, broadcast aborted");
                return Err(error);
            }
        }

        Ok(())
    }
}

impl<A, R> Default for Event<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> fmt::Debug for Event<A, R> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("registry", &self.registry)
            .finish()
    }
}
