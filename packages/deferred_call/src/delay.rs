use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use std::time::Duration;

use event_loop::EventLoop;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// The range [`DelayScheduler::after_about_a_minute()`] draws its delay from.
pub const ABOUT_A_MINUTE: Range<Duration> = Duration::from_secs(60)..Duration::from_secs(120);

// Whole milliseconds, the resolution of the jittered delay.
const ABOUT_A_MINUTE_MILLIS: Range<u64> = 60_000..120_000;

/// Runs handlers on a receiver after a delay, using single-shot timers on an event loop.
///
/// The scheduled handler holds only a weak reference to its receiver. If the receiver has been
/// dropped by the time the timer expires, the handler is not run. There is no way to cancel a
/// scheduled handler.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// use deferred_call::DelayScheduler;
/// use event_loop::{EventLoop, ManualClock};
///
/// struct Poller {
///     polls: Cell<u32>,
/// }
///
/// let event_loop = EventLoop::builder()
///     .manual_clock(ManualClock::new())
///     .build();
/// let scheduler = DelayScheduler::new(&event_loop);
/// let poller = Rc::new(Poller {
///     polls: Cell::new(0),
/// });
///
/// scheduler.after(&poller, |p| p.polls.set(p.polls.get() + 1), Duration::from_secs(5));
/// scheduler.after_about_a_minute(&poller, |p| p.polls.set(p.polls.get() + 1));
///
/// event_loop.run();
/// assert_eq!(poller.polls.get(), 2);
/// ```
pub struct DelayScheduler {
    event_loop: EventLoop,
    rng: RefCell<SmallRng>,
}

impl DelayScheduler {
    /// Creates a scheduler for `event_loop`, seeding its jitter from the operating system.
    #[must_use]
    pub fn new(event_loop: &EventLoop) -> Self {
        Self::with_rng(event_loop, SmallRng::from_os_rng())
    }

    /// Creates a scheduler whose jitter sequence is fully determined by `seed`.
    #[must_use]
    pub fn with_seed(event_loop: &EventLoop, seed: u64) -> Self {
        Self::with_rng(event_loop, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(event_loop: &EventLoop, rng: SmallRng) -> Self {
        Self {
            event_loop: event_loop.clone(),
            rng: RefCell::new(rng),
        }
    }

    /// Runs `handler` on `receiver` once `delay` has elapsed.
    ///
    /// A zero delay still defers the handler to the next loop iteration; it is never run
    /// synchronously.
    ///
    /// A delay beyond the range of [`Instant`][std::time::Instant] is shortened to the furthest
    /// deadline the loop can represent, which in practice means never.
    pub fn after<R>(&self, receiver: &Rc<R>, handler: impl FnOnce(&R) + 'static, delay: Duration)
    where
        R: 'static,
    {
        let receiver = Rc::downgrade(receiver);

        self.event_loop.single_shot(delay, move || {
            let Some(receiver) = receiver.upgrade() else {
                debug!(
                    receiver = type_name::<R>(),
                    "receiver dropped before delayed handler"
                );
                return;
            };

            handler(&receiver);
        });

        trace!(receiver = type_name::<R>(), ?delay, "delayed handler scheduled");
    }

    /// Runs `handler` on `receiver` after a random delay of at least one and less than two
    /// minutes, see [`ABOUT_A_MINUTE`].
    ///
    /// Use this to spread out periodic work of many receivers so that they do not all wake up
    /// at once.
    pub fn after_about_a_minute<R>(&self, receiver: &Rc<R>, handler: impl FnOnce(&R) + 'static)
    where
        R: 'static,
    {
        self.after(receiver, handler, self.about_a_minute());
    }

    /// Draws a delay uniformly from [`ABOUT_A_MINUTE`], in whole milliseconds.
    #[must_use]
    pub fn about_a_minute(&self) -> Duration {
        Duration::from_millis(self.rng.borrow_mut().random_range(ABOUT_A_MINUTE_MILLIS))
    }
}

impl fmt::Debug for DelayScheduler {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayScheduler")
            .field("event_loop", &self.event_loop)
            .finish_non_exhaustive()
    }
}
