#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Synchronous events that broadcast to any number of observers.
//!
//! An event keeps a set of observers. Invoking the event calls every observer with the same
//! arguments, synchronously on the calling thread, in the order the observers were attached.
//!
//! Attaching an observer returns an [`EventHandle`]. The handle, not the observer itself, is what
//! identifies the attachment when detaching, so two identical observers can be attached and
//! detached independently. Detaching a handle that is not attached (already detached, or issued
//! by a different event) is an error.
//!
//! Both single-threaded and thread-safe variants are available:
//!
//! - [`LocalEvent<A>`] - observers are plain closures, the event cannot leave its thread.
//! - [`Event<A>`] - observers are `Send + Sync` closures, the event can be shared between threads.
//!
//! # Arguments
//!
//! Each event carries one argument type `A`, delivered to every observer as `&A`. Tuples or
//! structs take the place of multiple positional or named arguments.
//!
//! # Failing observers
//!
//! A broadcast stops at the first failing observer and reports that failure to the caller.
//! Observers attached after the failing one are not called by that broadcast.
//!
//! - Observers that return `Result<(), E>` are broadcast to via `try_invoke()`, which returns the
//!   first error.
//! - A panicking observer unwinds out of `invoke()` or `try_invoke()`.
//!
//! In both cases the event remains usable afterwards.
//!
//! # Example
//!
//! ```rust
//! use multicast::LocalEvent;
//!
//! struct Progress {
//!     job: &'static str,
//!     percent: u8,
//! }
//!
//! let event = LocalEvent::<Progress>::new();
//!
//! let console = event.attach(|p| println!("{} is {}% done", p.job, p.percent));
//! let _audit = event.attach(|p| assert!(p.percent <= 100));
//!
//! event.invoke(&Progress { job: "print", percent: 40 });
//!
//! // Stop printing to the console. The audit observer keeps receiving updates.
//! event.detach(console).unwrap();
//! event.invoke(&Progress { job: "print", percent: 80 });
//!
//! // A handle can only be detached once.
//! assert!(event.detach(console).is_err());
//! ```
//!
//! # Logging
//!
//! Attach, detach and broadcast operations emit `tracing` events at `trace` level. Failed
//! detaches and aborted fallible broadcasts are reported at `debug` level. The crate never
//! installs a subscriber.

mod error;
mod handle;
mod local;
mod registry;
mod sync;

pub use error::*;
pub use handle::*;
pub use local::*;
pub(crate) use registry::*;
pub use sync::*;
