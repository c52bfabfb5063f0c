use std::fmt::{self, Display};
use std::sync::atomic::{self, AtomicU64};

/// Process-wide source of event identities, shared by all event flavors.
static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque identity of one event instance.
///
/// Every [`LocalEvent`][crate::LocalEvent] and [`Event`][crate::Event] receives a distinct
/// identity when it is created. Identities are never reused within a process, so a handle issued
/// by one event can never be mistaken for a handle issued by another, even after the first event
/// has been dropped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EventId(u64);

impl EventId {
    pub(crate) fn new_unique() -> Self {
        // Only uniqueness matters, there is no data published through this counter.
        // Wrapping around would take centuries of continuous event creation.
        Self(NEXT_EVENT_ID.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

impl Display for EventId {
    #[cfg_attr(test, mutants::skip)] // No API contract for the textual form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

/// Identifies one attachment of an observer to an event.
///
/// Returned by `attach()` and consumed by `detach()`. A handle is a plain value: copying it does
/// not create a new attachment, and detaching does not modify the handle. Whether a handle is
/// still attached can only be observed through the event that issued it.
///
/// Two handles are equal if and only if they were issued by the same event for the same
/// attachment, which makes handles suitable as keys in hash maps and sets.
///
/// # Example
///
/// ```rust
/// use std::collections::HashSet;
///
/// use multicast::LocalEvent;
///
/// let event = LocalEvent::<u32>::new();
///
/// let first = event.attach(|_| {});
/// let second = event.attach(|_| {});
///
/// let handles: HashSet<_> = [first, second].into_iter().collect();
/// assert_eq!(handles.len(), 2);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EventHandle {
    event_id: EventId,

    /// Value of the issuing event's counter before the attachment incremented it.
    sequence: u64,
}

impl EventHandle {
    pub(crate) fn new(event_id: EventId, sequence: u64) -> Self {
        Self { event_id, sequence }
    }

    /// The identity of the event that issued this handle.
    #[must_use]
    #[inline]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Display for EventHandle {
    #[cfg_attr(test, mutants::skip)] // No API contract for the textual form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.event_id, self.sequence)
    }
}
