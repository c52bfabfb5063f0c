//! Single-threaded multi-observer events.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::{Error, EventHandle, EventId, ObserverRegistry};

type LocalObserver<A, R> = Rc<dyn Fn(&A) -> R>;

/// An event that broadcasts to any number of observers on a single thread.
///
/// Observers are closures that receive the broadcast arguments by shared reference. Attaching
/// an observer returns an [`EventHandle`] that is later used to detach it again, so
/// identical-looking observers can be attached and detached independently.
///
/// Invoking the event calls every attached observer synchronously on the calling thread, in the
/// order the observers were attached.
///
/// The type parameter `A` is the argument type of a broadcast. Use a tuple or a struct to pass
/// several values. The type parameter `R` is the return type of the observers:
///
/// * With `R = ()` (the default), broadcast via [`invoke()`][Self::invoke].
/// * With `R = Result<(), E>`, broadcast via [`try_invoke()`][Self::try_invoke], which stops at
///   the first observer that returns an error.
///
/// For an event that can be shared between threads, see [`Event`][crate::Event].
///
/// # Reentrancy
///
/// Each broadcast delivers to a snapshot of the observers taken when the broadcast starts, and no
/// borrow of the event is held while observers run. Observers may therefore attach, detach or
/// broadcast on the same event:
///
/// * Observers attached during a broadcast are first called by the next broadcast.
/// * Observers detached during a broadcast are still called by that broadcast if they had not been
///   reached yet.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use multicast::LocalEvent;
///
/// let event = LocalEvent::<u32>::new();
/// let total = Rc::new(Cell::new(0_u32));
///
/// let handle = event.attach({
///     let total = Rc::clone(&total);
///     move |value| total.set(total.get() + *value)
/// });
///
/// event.invoke(&5);
/// event.invoke(&10);
/// assert_eq!(total.get(), 15);
///
/// event.detach(handle).unwrap();
/// event.invoke(&100);
/// assert_eq!(total.get(), 15);
/// ```
pub struct LocalEvent<A, R = ()> {
    registry: RefCell<ObserverRegistry<LocalObserver<A, R>>>,
}

impl<A, R> LocalEvent<A, R> {
    /// Creates an event with no observers.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            registry: RefCell::new(ObserverRegistry::new()),
        }
    }

    /// The identity of this event. Every handle issued by this event carries it.
    #[must_use]
    #[inline]
    pub fn id(&self) -> EventId {
        self.registry.borrow().event_id()
    }

    /// Attaches an observer that will be called by every subsequent broadcast.
    ///
    /// Returns a handle that is unique among all handles ever issued in this process.
    ///
    /// # Panics
    ///
    /// Panics if this event has already issued `u64::MAX` handles.
    pub fn attach<F>(&self, observer: F) -> EventHandle
    where
        F: Fn(&A) -> R + 'static,
    {
        let observer: LocalObserver<A, R> = Rc::new(observer);
        self.registry.borrow_mut().insert(observer)
    }

    /// Detaches the observer identified by `handle`.
    ///
    /// The observer is dropped before this returns, unless a broadcast that is currently in
    /// progress still holds it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHandle`] if the handle was issued by a different event or has
    /// already been detached.
    pub fn detach(&self, handle: EventHandle) -> Result<(), Error> {
        let observer = self.registry.borrow_mut().remove(handle)?;

        // Dropping the observer may run arbitrary code, so the borrow must already be released.
        drop(observer);

        Ok(())
    }

    /// Whether `handle` identifies an observer currently attached to this event.
    #[must_use]
    pub fn is_attached(&self, handle: EventHandle) -> bool {
        self.registry.borrow().contains(handle)
    }

    /// Number of attached observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.borrow().len()
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
        let observers = self.registry.borrow_mut().take_all();
        drop(observers);
    }

    fn snapshot(&self) -> Vec<LocalObserver<A, R>> {
        let registry = self.registry.borrow();

        trace!(event = %registry.event_id(), observers = registry.len(), "broadcasting");

        registry.snapshot()
    }
}

impl<A> LocalEvent<A> {
    /// Delivers `args` to every attached observer, in attachment order.
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

impl<A, E> LocalEvent<A, Result<(), E>> {
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

impl<A, R> Default for LocalEvent<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> fmt::Debug for LocalEvent<A, R> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::panic::{self, AssertUnwindSafe};

    use static_assertions::assert_not_impl_any;
    use testing::Recorder;

    use super::*;

    assert_not_impl_any!(LocalEvent<u32>: Send, Sync);

    #[test]
    fn new_event_is_empty() {
        let event = LocalEvent::<u32>::new();

        assert!(event.is_empty());
        assert_eq!(event.len(), 0);

        // Nothing to deliver to, nothing happens.
        event.invoke(&1);
    }

    #[test]
    fn default_creates_distinct_events() {
        let a = LocalEvent::<u32>::default();
        let b = LocalEvent::<u32>::default();

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn attach_returns_distinct_handles() {
        let event = LocalEvent::<u32>::new();

        let handles: HashSet<_> = (0..50).map(|_| event.attach(|_| {})).collect();

        assert_eq!(handles.len(), 50);
        assert_eq!(event.len(), 50);
        assert!(handles.iter().all(|h| h.event_id() == event.id()));
    }

    #[test]
    fn invoke_delivers_to_every_observer_once() {
        let event = LocalEvent::<String>::new();
        let recorders: Vec<Recorder<String>> = (0..5).map(|_| Recorder::new()).collect();

        for recorder in &recorders {
            event.attach(recorder.observer());
        }

        event.invoke(&"hello".to_string());

        for recorder in &recorders {
            assert_eq!(recorder.deliveries(), vec!["hello".to_string()]);
        }
    }

    #[test]
    fn invoke_follows_attachment_order() {
        let event = LocalEvent::<u32>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for label in ['a', 'b', 'c', 'd'] {
            let order = Rc::clone(&order);
            event.attach(move |_| order.borrow_mut().push(label));
        }

        event.invoke(&0);
        event.invoke(&0);

        assert_eq!(*order.borrow(), vec!['a', 'b', 'c', 'd', 'a', 'b', 'c', 'd']);
    }

    #[test]
    fn detach_stops_delivery_to_that_observer_only() {
        let event = LocalEvent::<u32>::new();
        let kept = Recorder::<u32>::new();
        let removed = Recorder::<u32>::new();

        event.attach(kept.observer());
        let handle = event.attach(removed.observer());

        event.detach(handle).unwrap();
        event.invoke(&7);

        assert_eq!(kept.deliveries(), vec![7]);
        assert!(!removed.delivered());
        assert!(!event.is_attached(handle));
    }

    #[test]
    fn detach_twice_is_error() {
        let event = LocalEvent::<u32>::new();
        let handle = event.attach(|_| {});

        event.detach(handle).unwrap();

        assert!(matches!(
            event.detach(handle),
            Err(Error::UnknownHandle { handle: h }) if h == handle
        ));
    }

    #[test]
    fn detach_foreign_handle_is_error() {
        let first = LocalEvent::<u32>::new();
        let second = LocalEvent::<u32>::new();
        let recorder = Recorder::<u32>::new();

        let foreign = first.attach(|_| {});
        second.attach(recorder.observer());

        second.detach(foreign).unwrap_err();

        // The observer with the numerically identical counter is unaffected.
        second.invoke(&1);
        assert_eq!(recorder.count(), 1);
        assert!(first.is_attached(foreign));
    }

    #[test]
    fn identical_observers_are_detached_independently() {
        let event = LocalEvent::<u32>::new();
        let calls = Rc::new(Cell::new(0));

        let observer = {
            let calls = Rc::clone(&calls);
            move |_: &u32| calls.set(calls.get() + 1)
        };

        let first = event.attach(observer.clone());
        let _second = event.attach(observer);

        event.detach(first).unwrap();
        event.invoke(&0);

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn detach_drops_observer() {
        let event = LocalEvent::<u32>::new();
        let token = Rc::new(());

        let handle = event.attach({
            let token = Rc::clone(&token);
            move |_| drop(Rc::clone(&token))
        });
        assert_eq!(Rc::strong_count(&token), 2);

        event.detach(handle).unwrap();
        assert_eq!(Rc::strong_count(&token), 1);
    }

    #[test]
    fn clear_detaches_everything() {
        let event = LocalEvent::<u32>::new();
        let recorder = Recorder::<u32>::new();

        let old = event.attach(recorder.observer());
        event.clear();

        assert!(event.is_empty());
        event.detach(old).unwrap_err();

        let new = event.attach(recorder.observer());
        assert_ne!(old, new);

        event.invoke(&3);
        assert_eq!(recorder.deliveries(), vec![3]);
    }

    #[test]
    fn try_invoke_succeeds_when_all_observers_succeed() {
        let event = LocalEvent::<u32, Result<(), String>>::new();
        let calls = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let calls = Rc::clone(&calls);
            event.attach(move |_| {
                calls.set(calls.get() + 1);
                Ok(())
            });
        }

        event.try_invoke(&1).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn try_invoke_stops_at_first_failure() {
        let event = LocalEvent::<u32, Result<(), String>>::new();
        let reached = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "failing", "also failing", "last"] {
            let reached = Rc::clone(&reached);
            event.attach(move |_| {
                reached.borrow_mut().push(label);

                if label.contains("failing") {
                    Err(label.to_string())
                } else {
                    Ok(())
                }
            });
        }

        assert_eq!(event.try_invoke(&1), Err("failing".to_string()));
        assert_eq!(*reached.borrow(), vec!["first", "failing"]);
    }

    #[test]
    fn panicking_observer_aborts_broadcast_and_event_stays_usable() {
        let event = LocalEvent::<u32>::new();
        let before = Recorder::<u32>::new();
        let after = Recorder::<u32>::new();

        event.attach(before.observer());
        let panicking = event.attach(|_| panic!("observer failure"));
        event.attach(after.observer());

        let result = panic::catch_unwind(AssertUnwindSafe(|| event.invoke(&1)));
        assert!(result.is_err());

        assert_eq!(before.count(), 1);
        assert!(!after.delivered());

        event.detach(panicking).unwrap();
        event.invoke(&2);

        assert_eq!(before.deliveries(), vec![1, 2]);
        assert_eq!(after.deliveries(), vec![2]);
    }

    #[test]
    fn observer_attached_during_broadcast_waits_for_next_broadcast() {
        let event = Rc::new(LocalEvent::<u32>::new());
        let late = Recorder::<u32>::new();

        event.attach({
            let event = Rc::downgrade(&event);
            let late = late.clone();
            let attached = Cell::new(false);

            move |_| {
                if !attached.replace(true) {
                    let event = event.upgrade().expect("event outlives its broadcast");
                    event.attach(late.observer());
                }
            }
        });

        event.invoke(&1);
        assert!(!late.delivered());

        event.invoke(&2);
        assert_eq!(late.deliveries(), vec![2]);
    }

    #[test]
    fn observer_detached_during_broadcast_still_gets_that_broadcast() {
        let event = Rc::new(LocalEvent::<u32>::new());
        let victim_handle = Rc::new(Cell::new(None));
        let victim = Recorder::<u32>::new();

        event.attach({
            let event = Rc::downgrade(&event);
            let victim_handle = Rc::clone(&victim_handle);

            move |_| {
                if let Some(handle) = victim_handle.take() {
                    let event = event.upgrade().expect("event outlives its broadcast");
                    event.detach(handle).unwrap();
                }
            }
        });
        victim_handle.set(Some(event.attach(victim.observer())));

        event.invoke(&1);
        assert_eq!(victim.deliveries(), vec![1]);
        assert_eq!(event.len(), 1);

        event.invoke(&2);
        assert_eq!(victim.deliveries(), vec![1]);
    }

    #[test]
    fn observer_can_detach_itself() {
        let event = Rc::new(LocalEvent::<u32>::new());
        let own_handle = Rc::new(Cell::new(None));
        let calls = Rc::new(Cell::new(0));

        let handle = event.attach({
            let event = Rc::downgrade(&event);
            let own_handle = Rc::clone(&own_handle);
            let calls = Rc::clone(&calls);

            move |_| {
                calls.set(calls.get() + 1);

                if let (Some(event), Some(handle)) = (event.upgrade(), own_handle.take()) {
                    event.detach(handle).unwrap();
                }
            }
        });
        own_handle.set(Some(handle));

        event.invoke(&1);
        event.invoke(&2);

        assert_eq!(calls.get(), 1);
        assert!(event.is_empty());
    }

    #[test]
    fn nested_broadcast_is_allowed() {
        let event = Rc::new(LocalEvent::<u32>::new());
        let recorder = Recorder::<u32>::new();

        event.attach({
            let event = Rc::downgrade(&event);

            move |depth| {
                if *depth == 0 {
                    let event = event.upgrade().expect("event outlives its broadcast");
                    event.invoke(&1);
                }
            }
        });
        event.attach(recorder.observer());

        event.invoke(&0);

        // The nested broadcast completes before the outer one reaches the recorder.
        assert_eq!(recorder.deliveries(), vec![1, 0]);
    }
}
