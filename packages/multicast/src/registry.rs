//! Observer bookkeeping shared by the single-threaded and thread-safe events.
//!
//! The registry knows nothing about interior mutability or how observers are invoked. Each event
//! flavor wraps it in its own cell or lock and decides what an observer looks like (`Rc` or `Arc`
//! of a closure).

use std::collections::BTreeMap;
use std::fmt;
use std::mem;

use tracing::{debug, trace};

use crate::{Error, EventHandle, EventId, Result};

/// Maps attachments to observers, in attachment order.
///
/// Keys are the counter values handed out by `insert()`. The counter only ever grows, so the
/// ordered map iterates in attachment order without any extra bookkeeping, and removal of one
/// entry never reorders the others.
pub(crate) struct ObserverRegistry<O> {
    event_id: EventId,

    /// Counter value for the next attachment. Never reset, not even by `take_all()`.
    next_sequence: u64,

    observers: BTreeMap<u64, O>,
}

impl<O> ObserverRegistry<O> {
    pub(crate) fn new() -> Self {
        Self {
            event_id: EventId::new_unique(),
            next_sequence: 0,
            observers: BTreeMap::new(),
        }
    }

    pub(crate) fn event_id(&self) -> EventId {
        self.event_id
    }

    /// # Panics
    ///
    /// Panics if the event has issued `u64::MAX` handles already.
    pub(crate) fn insert(&mut self, observer: O) -> EventHandle {
        let sequence = self.next_sequence;

        self.next_sequence = sequence
            .checked_add(1)
            .expect("event attachment counter overflow - handles can no longer be unique");

        let handle = EventHandle::new(self.event_id, sequence);
        self.observers.insert(sequence, observer);

        trace!(
            event = %self.event_id,
            %handle,
            observers = self.observers.len(),
            "attached observer"
        );

        handle
    }

    /// Removes the observer for `handle`, returning it to the caller.
    ///
    /// The caller decides when the observer is dropped, which matters if dropping it runs user
    /// code that touches the event again.
    pub(crate) fn remove(&mut self, handle: EventHandle) -> Result<O> {
        let removed = if handle.event_id() == self.event_id {
            self.observers.remove(&handle.sequence())
        } else {
            None
        };

        let Some(observer) = removed else {
            debug!(event = %self.event_id, %handle, "detach of unknown observer handle");
            return Err(Error::UnknownHandle { handle });
        };

        trace!(
            event = %self.event_id,
            %handle,
            observers = self.observers.len(),
            "detached observer"
        );

        Ok(observer)
    }

    pub(crate) fn contains(&self, handle: EventHandle) -> bool {
        handle.event_id() == self.event_id && self.observers.contains_key(&handle.sequence())
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Removes all observers, returning them to the caller in attachment order.
    pub(crate) fn take_all(&mut self) -> Vec<O> {
        let observers = mem::take(&mut self.observers);

        trace!(event = %self.event_id, cleared = observers.len(), "detached all observers");

        observers.into_values().collect()
    }
}

impl<O: Clone> ObserverRegistry<O> {
    /// Copies out the current observers in attachment order.
    ///
    /// Broadcasts deliver to a snapshot so that observers can attach and detach while the
    /// broadcast is in progress, without holding any borrow or lock while user code runs.
    pub(crate) fn snapshot(&self) -> Vec<O> {
        self.observers.values().cloned().collect()
    }
}

impl<O> fmt::Debug for ObserverRegistry<O> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("event_id", &self.event_id)
            .field("next_sequence", &self.next_sequence)
            .field("observers", &self.observers.len())
            .finish()
    }
}
