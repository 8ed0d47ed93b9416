use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::pal::Clock;

/// A virtual clock that only moves forward when told to.
///
/// Clones share the same time, so a test can keep one clone and hand another to
/// [`EventLoopBuilder::manual_clock()`][crate::EventLoopBuilder::manual_clock], then move time
/// forward with [`advance()`][Self::advance] between loop iterations.
///
/// When the event loop would otherwise sleep until the next timer deadline, a manual clock
/// jumps straight to that deadline instead.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use event_loop::{EventLoop, ManualClock};
///
/// let clock = ManualClock::new();
/// let event_loop = EventLoop::builder().manual_clock(clock.clone()).build();
///
/// let start = event_loop.now();
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(event_loop.now().duration_since(start), Duration::from_secs(5));
/// ```
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    /// Creates a manual clock that starts at the current wall-clock time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    /// The current virtual time.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.now.get()
    }

    /// Moves the virtual time forward by `duration`.
    ///
    /// # Panics
    ///
    /// Panics if the new time cannot be represented by [`Instant`].
    pub fn advance(&self, duration: Duration) {
        let next = self
            .now
            .get()
            .checked_add(duration)
            .expect("manual clock advanced beyond the range of Instant");

        self.now.set(next);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Instant {
        self.now.get()
    }

    fn sleep_until(&mut self, deadline: Instant) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}
