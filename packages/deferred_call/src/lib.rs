//! One-shot deferred calls for a single-threaded event loop.
//!
//! This package lets you say "call this handler on that object, with these arguments, the first
//! time this emitter fires that event" without keeping track of anything afterwards:
//!
//! * [`make_closure()`] binds a target, a handler and up to six argument values into a
//!   [`Closure`] that can be invoked exactly once. [`make_slot_closure()`] does the same with
//!   the handler looked up by name, and [`make_callback_closure()`] wraps a plain callback.
//! * [`connect()`] arms a self-managing binding that invokes the closure on the first emission
//!   of the event and then disposes of itself on the event loop. If the emitter is destroyed
//!   first, the closure is dropped without being invoked.
//! * [`DelayScheduler`] runs a handler on a receiver after a fixed delay, or after a random
//!   delay of about a minute.
//!
//! Everything here is single-threaded and must be used on the thread that drives the
//! [`EventLoop`][event_loop::EventLoop].
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use deferred_call::{connect, make_closure};
//! use event_loop::{Emitter, EventLoop};
//!
//! #[derive(Default)]
//! struct StatusLog {
//!     entries: RefCell<Vec<String>>,
//! }
//!
//! impl StatusLog {
//!     fn record(&self, code: i32, status: &'static str) {
//!         self.entries.borrow_mut().push(format!("{code} {status}"));
//!     }
//! }
//!
//! let event_loop = EventLoop::new();
//! let request = Emitter::with_name(&event_loop, "request");
//! let log = Rc::new(StatusLog::default());
//!
//! connect(
//!     &request,
//!     "finished",
//!     make_closure(&log, StatusLog::record, (200, "ok")),
//! );
//!
//! request.emit("finished");
//!
//! // The binding disposes of itself once the loop gets to run.
//! event_loop.run_until_idle();
//!
//! assert_eq!(*log.entries.borrow(), vec!["200 ok"]);
//! ```

mod arguments;
mod binding;
mod closure;
mod delay;
mod error;

pub use arguments::*;
pub use binding::connect;
pub use closure::*;
pub use delay::*;
pub use error::*;
