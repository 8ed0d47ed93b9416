//! The loop itself: posted tasks, timers and the deferred-deletion queue.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::pal::{Clock, ClockFacade};
use crate::{EventLoopBuilder, TimerQueue};

/// A unit of work queued on the loop.
pub(crate) type Task = Box<dyn FnOnce()>;

struct LoopInner {
    clock: RefCell<ClockFacade>,
    posted: RefCell<VecDeque<Task>>,
    timers: RefCell<TimerQueue>,

    // Objects handed over via `delete_later()`, dropped at the end of the current iteration.
    deletions: RefCell<Vec<Box<dyn Any>>>,

    iteration: Cell<u64>,
}

/// A single-threaded cooperative event loop.
///
/// Everything queued on the loop runs on the thread that drives it, one iteration at a time:
///
/// 1. Timers whose deadline has passed expire, earliest first.
/// 2. Tasks queued with [`post()`][Self::post] run in the order they were posted.
/// 3. Objects handed to [`delete_later()`][Self::delete_later] are dropped.
///
/// Work queued while an iteration is in progress runs in a later iteration, never in the one
/// that queued it. This makes it safe for a handler to queue its own disposal.
///
/// `EventLoop` is a cheap handle - clones refer to the same loop.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use event_loop::EventLoop;
///
/// let event_loop = EventLoop::new();
/// let ran = Rc::new(Cell::new(false));
///
/// event_loop.post({
///     let ran = Rc::clone(&ran);
///     move || ran.set(true)
/// });
///
/// // Posting never runs anything synchronously.
/// assert!(!ran.get());
///
/// event_loop.run_until_idle();
/// assert!(ran.get());
/// ```
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    /// Creates an event loop driven by the system clock.
    ///
    /// Use [`EventLoop::builder()`] for custom configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring the event loop.
    #[must_use]
    pub fn builder() -> EventLoopBuilder {
        EventLoopBuilder::new()
    }

    pub(crate) fn with_clock(clock: ClockFacade) -> Self {
        Self {
            inner: Rc::new(LoopInner {
                clock: RefCell::new(clock),
                posted: RefCell::new(VecDeque::new()),
                timers: RefCell::new(TimerQueue::new()),
                deletions: RefCell::new(Vec::new()),
                iteration: Cell::new(0),
            }),
        }
    }

    /// The current time according to the loop's clock.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.inner.clock.borrow_mut().now()
    }

    /// Queues `task` to run on the next loop iteration.
    pub fn post(&self, task: impl FnOnce() + 'static) {
        self.inner.posted.borrow_mut().push_back(Box::new(task));
    }

    /// Runs `task` once, in the first iteration that starts after `delay` has elapsed.
    ///
    /// A zero delay still defers the task to the next iteration. A delay too large to be
    /// represented as a deadline is shortened to the furthest deadline that can be.
    pub fn single_shot(&self, delay: Duration, task: impl FnOnce() + 'static) {
        let deadline = saturating_deadline(self.now(), delay);

        self.inner
            .timers
            .borrow_mut()
            .push(deadline, Box::new(task));

        trace!(?delay, "single-shot timer scheduled");
    }

    /// Returns a non-owning handle to this loop.
    ///
    /// Objects that the loop may end up owning, such as those handed to
    /// [`delete_later()`][Self::delete_later], hold one of these to avoid a reference cycle.
    #[must_use]
    pub fn downgrade(&self) -> WeakEventLoop {
        WeakEventLoop {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Takes ownership of `object` and drops it at the end of the current loop iteration.
    ///
    /// Call this from inside a handler to dispose of the object the handler belongs to. The
    /// object stays alive until every handler of the current iteration has returned. If no
    /// iteration is in progress, the object is dropped at the end of the next one.
    pub fn delete_later<T: 'static>(&self, object: T) {
        self.inner.deletions.borrow_mut().push(Box::new(object));
    }

    /// Runs one loop iteration, returning how many timers and posted tasks were executed.
    ///
    /// Panics raised by a task propagate to the caller. Tasks from the same iteration that had
    /// not yet started are dropped without running.
    pub fn run_once(&self) -> usize {
        let iteration = self.inner.iteration.get().wrapping_add(1);
        self.inner.iteration.set(iteration);

        let now = self.now();
        let expired = self.inner.timers.borrow_mut().pop_due(now);
        let posted = mem::take(&mut *self.inner.posted.borrow_mut());

        let mut executed: usize = 0;

        for task in expired.into_iter().chain(posted) {
            task();
            executed = executed.wrapping_add(1);
        }

        let deleted = self.drain_deletions();

        trace!(iteration, executed, deleted, "event loop iteration completed");

        executed
    }

    /// Runs loop iterations until nothing is ready to run.
    ///
    /// Timers that are not yet due stay pending. A task that keeps re-posting itself will keep
    /// this method running forever.
    pub fn run_until_idle(&self) {
        while self.has_ready_work() {
            self.run_once();
        }
    }

    /// Runs loop iterations until no work of any kind is pending, waiting for future timers.
    ///
    /// With the system clock this blocks the thread until each timer deadline. With a
    /// [`ManualClock`][crate::ManualClock] the clock jumps straight to the next deadline.
    pub fn run(&self) {
        loop {
            if self.has_ready_work() {
                self.run_once();
                continue;
            }

            let Some(deadline) = self.next_deadline() else {
                break;
            };

            self.inner.clock.borrow_mut().sleep_until(deadline);
        }
    }

    /// The earliest deadline of any pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner.timers.borrow().next_deadline()
    }

    /// Number of timers that have not yet expired.
    #[must_use]
    pub fn pending_timer_count(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Number of posted tasks waiting for the next iteration.
    #[must_use]
    pub fn pending_task_count(&self) -> usize {
        self.inner.posted.borrow().len()
    }

    /// Number of objects waiting to be dropped by the deferred-deletion queue.
    #[must_use]
    pub fn pending_deletion_count(&self) -> usize {
        self.inner.deletions.borrow().len()
    }

    /// Number of iterations this loop has started.
    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.inner.iteration.get()
    }

    fn has_ready_work(&self) -> bool {
        let now = self.now();

        !self.inner.posted.borrow().is_empty()
            || !self.inner.deletions.borrow().is_empty()
            || self.inner.timers.borrow().has_due(now)
    }

    fn drain_deletions(&self) -> usize {
        let mut deleted: usize = 0;

        // Dropping an object may queue further deletions (e.g. a destroyed emitter notifying
        // its observers), so we keep going until the queue stays empty.
        loop {
            let batch = mem::take(&mut *self.inner.deletions.borrow_mut());

            if batch.is_empty() {
                break;
            }

            deleted = deleted.wrapping_add(batch.len());
            drop(batch);
        }

        deleted
    }
}

/// A non-owning handle to an [`EventLoop`].
#[derive(Clone)]
pub struct WeakEventLoop {
    inner: Weak<LoopInner>,
}

impl WeakEventLoop {
    /// Returns the loop if it still exists.
    #[must_use]
    pub fn upgrade(&self) -> Option<EventLoop> {
        self.inner.upgrade().map(|inner| EventLoop { inner })
    }
}

impl fmt::Debug for WeakEventLoop {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEventLoop")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

/// `now + delay`, or the latest representable instant short of it.
fn saturating_deadline(now: Instant, mut delay: Duration) -> Instant {
    // Instant has no maximum value, so we back off until the sum fits. A zero delay always does.
    loop {
        if let Some(deadline) = now.checked_add(delay) {
            return deadline;
        }

        delay /= 2;
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("iteration", &self.inner.iteration.get())
            .field("clock", &self.inner.clock)
            .field("pending_tasks", &self.inner.posted.borrow().len())
            .field("timers", &self.inner.timers)
            .field("pending_deletions", &self.inner.deletions.borrow().len())
            .finish()
    }
}
