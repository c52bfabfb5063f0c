use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// An observer that remembers what it was called with.
///
/// Clones share the same journal, so a test can hand one clone to an event (via
/// [`observer()`][Self::observer]) and inspect the deliveries through another.
///
/// # Example
///
/// ```rust
/// use testing::Recorder;
///
/// let recorder = Recorder::<u32>::new();
/// let observer = recorder.observer();
///
/// observer(&5);
///
/// assert!(recorder.delivered());
/// assert_eq!(recorder.last(), Some(5));
/// ```
pub struct Recorder<A> {
    deliveries: Arc<Mutex<Vec<A>>>,
}

impl<A> Recorder<A>
where
    A: Clone + Send + 'static,
{
    /// Creates a recorder that has not seen any deliveries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns an observer closure that records a copy of every delivery into this recorder.
    #[must_use]
    pub fn observer(&self) -> impl Fn(&A) + Send + Sync + 'static {
        let deliveries = Arc::clone(&self.deliveries);

        move |args: &A| deliveries.lock().push(args.clone())
    }

    /// Whether at least one delivery has been recorded since creation or the last reset.
    #[must_use]
    pub fn delivered(&self) -> bool {
        !self.deliveries.lock().is_empty()
    }

    /// Number of deliveries recorded since creation or the last reset.
    #[must_use]
    pub fn count(&self) -> usize {
        self.deliveries.lock().len()
    }

    /// The arguments of the most recent delivery, if any.
    #[must_use]
    pub fn last(&self) -> Option<A> {
        self.deliveries.lock().last().cloned()
    }

    /// All recorded deliveries, oldest first.
    #[must_use]
    pub fn deliveries(&self) -> Vec<A> {
        self.deliveries.lock().clone()
    }

    /// Forgets all recorded deliveries.
    pub fn reset(&self) {
        self.deliveries.lock().clear();
    }
}

impl<A> Default for Recorder<A>
where
    A: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Recorder<A> {
    fn clone(&self) -> Self {
        Self {
            deliveries: Arc::clone(&self.deliveries),
        }
    }
}

impl<A> fmt::Debug for Recorder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("count", &self.deliveries.lock().len())
            .finish()
    }
}
