//! Event layer: runs engine reads on arrival and writes on departure.
//!
//! # Known limitation
//!
//! When an entity leaves process A and arrives at process B within a few
//! milliseconds, B can read before A's write commits and pick up stale
//! values. [`SyncListener`] waits a fixed delay (100 ms by default) before
//! reading on arrival, which narrows the window but does not close it.

mod error;
mod event;
mod listener;

pub use error::{ListenerError, ListenerResult};
pub use event::{ReadEvent, ReadInterceptor};
pub use listener::{ArrivalOutcome, SyncListener, DEFAULT_ARRIVAL_DELAY};
