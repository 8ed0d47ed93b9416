//! A single-threaded cooperative event loop with the object-model pieces needed to build
//! self-managing, one-shot notification adapters on top of it:
//!
//! * [`Emitter`] - an object that emits named events and announces its own destruction.
//! * [`WeakEmitter`] - a non-owning reference to an emitter.
//! * [`WeakEventLoop`] - a non-owning reference to an event loop.
//! * [`EventLoop::delete_later()`] - deferred deletion, safe to request from inside a handler
//!   that belongs to the object being deleted.
//! * [`EventLoop::single_shot()`] - a single-shot timer.
//!
//! Everything here is `!Send` and `!Sync`. All handlers run on the thread that drives the loop.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use event_loop::{Emitter, EventLoop, ManualClock};
//!
//! let clock = ManualClock::new();
//! let event_loop = EventLoop::builder().manual_clock(clock.clone()).build();
//!
//! let emitter = Rc::new(Emitter::with_name(&event_loop, "download"));
//! let finished = Rc::new(Cell::new(false));
//!
//! emitter.subscribe("finished", {
//!     let finished = Rc::clone(&finished);
//!     move || finished.set(true)
//! });
//!
//! event_loop.single_shot(Duration::from_secs(2), {
//!     let emitter = Rc::clone(&emitter);
//!     move || {
//!         emitter.emit("finished");
//!     }
//! });
//!
//! // The manual clock jumps straight to the timer deadline instead of sleeping.
//! event_loop.run();
//! assert!(finished.get());
//! ```

mod builder;
mod emitter;
mod event_loop;
mod pal;
mod timers;

pub use builder::*;
pub use emitter::*;
pub use event_loop::*;
pub(crate) use event_loop::Task;
pub use pal::ManualClock;
pub(crate) use timers::*;
